//! Test rig around the simulated board.
//!
//! Builds the full node (peripherals, control loop, recording sink) on a
//! fresh [`SimBoard`] and offers time control with and without the
//! superloop servicing the watchdog. A watchdog reset reboots the node on
//! the same board, the way the chip restarts its firmware.

use std::sync::{Arc, Mutex};

use tempredict::adapters::sim::SimBoard;
use tempredict::app::control::{ControlLoop, Peripherals};
use tempredict::app::events::{AppEvent, Trigger};
use tempredict::app::ports::{EventSink, PinId};
use tempredict::config::SystemConfig;

// ── Recording sink ────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<AppEvent>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<AppEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, wanted: &AppEvent) -> usize {
        self.events.lock().unwrap().iter().filter(|e| *e == wanted).count()
    }

    pub fn predictions(&self, wanted: Trigger) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, AppEvent::Prediction { trigger, .. } if *trigger == wanted))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ── Boot ──────────────────────────────────────────────────────

pub type Node = ControlLoop<'static, SimBoard, SimBoard, SimBoard, RecordingSink>;

/// Outcome of a setup that may fail.
pub struct Attempt {
    pub board: &'static SimBoard,
    pub peripherals: &'static Peripherals<'static, SimBoard>,
    pub result: tempredict::Result<Node>,
    pub sink: RecordingSink,
}

/// One firmware boot on `board`: peripherals, setup, then the watchdog.
fn boot(
    board: &'static SimBoard,
    config: &SystemConfig,
    sink: RecordingSink,
) -> (&'static Peripherals<'static, SimBoard>, tempredict::Result<Node>) {
    let peripherals: &'static Peripherals<'static, SimBoard> =
        Box::leak(Box::new(Peripherals::new(board, config).unwrap()));
    let result = ControlLoop::setup(peripherals, board, board, sink, config).and_then(|control| {
        control.arm()?;
        Ok(control)
    });
    (peripherals, result)
}

pub fn attempt(config: &SystemConfig) -> Attempt {
    let board: &'static SimBoard = Box::leak(Box::new(SimBoard::new()));
    board.set_duty(config.temp_sensor_channel, 0.15);
    let sink = RecordingSink::default();
    let (peripherals, result) = boot(board, config, sink.clone());
    Attempt {
        board,
        peripherals,
        result,
        sink,
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub struct Rig {
    pub board: &'static SimBoard,
    pub peripherals: &'static Peripherals<'static, SimBoard>,
    pub control: Node,
    /// Shared by every boot, so events accumulate across resets.
    pub sink: RecordingSink,
    pub config: SystemConfig,
    generation: u32,
    boots: u32,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_config(SystemConfig::default())
    }

    pub fn with_config(config: SystemConfig) -> Self {
        let a = attempt(&config);
        Self {
            board: a.board,
            peripherals: a.peripherals,
            control: a.result.unwrap(),
            sink: a.sink,
            config,
            generation: 0,
            boots: 1,
        }
    }

    pub fn button(&self) -> PinId {
        self.peripherals.button.pin()
    }

    /// Firmware boots so far, the first one included.
    pub fn boots(&self) -> u32 {
        self.boots
    }

    /// Advance with the superloop running (serviced every millisecond).
    pub fn advance(&mut self, ms: u64) {
        for _ in 0..ms {
            self.tick();
            self.control.service();
        }
    }

    /// Advance with the superloop stalled.
    pub fn starve(&mut self, ms: u64) {
        for _ in 0..ms {
            self.tick();
        }
    }

    pub fn press(&self) {
        self.board.press(self.button(), self.control.vectors());
    }

    pub fn release(&self) {
        self.board.release(self.button(), self.control.vectors());
    }

    pub fn port_unmasked(&self) -> bool {
        self.board.is_port_enabled(self.button().port())
    }

    fn tick(&mut self) {
        self.board.advance(1, self.control.vectors());
        if self.board.resets() != self.generation {
            self.reboot();
        }
    }

    fn reboot(&mut self) {
        self.generation = self.board.resets();
        self.boots += 1;
        let (peripherals, result) = boot(self.board, &self.config, self.sink.clone());
        self.peripherals = peripherals;
        self.control = result.unwrap();
    }
}
