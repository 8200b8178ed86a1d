//! In-memory board with a virtual millisecond clock.
//!
//! Implements [`Hal`], [`WatchdogHal`] and [`AnalogPort`] without any real
//! hardware, so the dispatch framework can be exercised on the host:
//!
//! - [`set_input`](SimBoard::set_input) changes an input level and delivers
//!   a pin-change interrupt if the pin is armed (pin mask **and** port
//!   enable). Edges that happen while masked are lost.
//! - [`advance`](SimBoard::advance) moves the clock one tick at a time,
//!   delivering a tick interrupt for every enabled counter and then checking
//!   the watchdog.
//! - A watchdog expiry in system-reset mode performs a power-on reset: the
//!   simulated registers (directions, levels, masks, watchdog) and the
//!   counter ownership ledger are cleared. Driver objects built before the
//!   reset belong to the dead firmware image; whoever owns the node watches
//!   [`resets`](SimBoard::resets) and boots a fresh one, as the chip would.
//!
//! Register state sits behind a critical section; it is never held while a
//! handler runs, since handlers call back into the board.

use core::cell::RefCell;
use std::time::Duration;

use critical_section::Mutex;
use log::{info, warn};

use crate::app::ports::{
    AnalogPort, Circuit, Direction, Hal, IoPort, IrqSource, PinId, Vector, WatchdogHal,
};
use crate::drivers::timer::{CircuitRegistry, TICK_MS};
use crate::drivers::watchdog::{ResetMode, Timeout};
use crate::interrupts::InterruptTable;

const ANALOG_CHANNELS: usize = 8;

#[derive(Debug, Clone, Copy)]
struct WatchdogState {
    timeout_ms: u64,
    mode: ResetMode,
    last_feed_ms: u64,
}

#[derive(Debug)]
struct Registers {
    now_ms: u64,
    directions: [Option<Direction>; PinId::COUNT],
    levels: [bool; PinId::COUNT],
    pin_mask: u32,
    port_mask: u8,
    timer_mask: u8,
    watchdog: Option<WatchdogState>,
    resets: u32,
    last_reset_ms: Option<u64>,
    watchdog_interrupts: u32,
    analog: [f64; ANALOG_CHANNELS],
}

impl Registers {
    const fn new() -> Self {
        Self {
            now_ms: 0,
            directions: [None; PinId::COUNT],
            levels: [false; PinId::COUNT],
            pin_mask: 0,
            port_mask: 0,
            timer_mask: 0,
            watchdog: None,
            resets: 0,
            last_reset_ms: None,
            watchdog_interrupts: 0,
            analog: [0.0; ANALOG_CHANNELS],
        }
    }

    fn pin_change_armed(&self, pin: PinId) -> bool {
        self.pin_mask & (1 << pin.index()) != 0 && self.port_mask & pin.port().mask() != 0
    }

    /// Everything a real reset clears. Time, counters and analog inputs
    /// (the outside world) survive.
    fn power_on_reset(&mut self) {
        self.directions = [None; PinId::COUNT];
        self.levels = [false; PinId::COUNT];
        self.pin_mask = 0;
        self.port_mask = 0;
        self.timer_mask = 0;
        self.watchdog = None;
        self.resets += 1;
        self.last_reset_ms = Some(self.now_ms);
    }

    /// Returns true when the expiry reset the system.
    fn check_watchdog(&mut self) -> bool {
        let Some(wdt) = self.watchdog.as_mut() else {
            return false;
        };
        if self.now_ms - wdt.last_feed_ms < wdt.timeout_ms {
            return false;
        }
        match wdt.mode {
            ResetMode::SystemReset => {
                warn!("sim: watchdog expired at {} ms, system reset", self.now_ms);
                self.power_on_reset();
                true
            }
            ResetMode::InterruptOnly => {
                wdt.last_feed_ms = self.now_ms;
                self.watchdog_interrupts += 1;
                false
            }
        }
    }
}

pub struct SimBoard {
    circuits: CircuitRegistry,
    regs: Mutex<RefCell<Registers>>,
}

impl Default for SimBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBoard {
    pub const fn new() -> Self {
        Self {
            circuits: CircuitRegistry::new(),
            regs: Mutex::new(RefCell::new(Registers::new())),
        }
    }

    fn with_regs<R>(&self, f: impl FnOnce(&mut Registers) -> R) -> R {
        critical_section::with(|cs| f(&mut self.regs.borrow_ref_mut(cs)))
    }

    // ── Stimulus ──────────────────────────────────────────────

    /// Drive an input pin from outside. Delivers [`Vector::PinChange`]
    /// when the level actually changes and the pin is armed.
    pub fn set_input(&self, pin: PinId, high: bool, vectors: &InterruptTable<'_>) {
        let fire = self.with_regs(|r| {
            let i = pin.index();
            if r.levels[i] == high || !r.directions[i].is_some_and(Direction::is_input) {
                return false;
            }
            r.levels[i] = high;
            r.pin_change_armed(pin)
        });
        if fire {
            vectors.dispatch(Vector::PinChange(pin));
        }
    }

    /// Active-low button press (pulls the pin to ground).
    pub fn press(&self, pin: PinId, vectors: &InterruptTable<'_>) {
        self.set_input(pin, false, vectors);
    }

    pub fn release(&self, pin: PinId, vectors: &InterruptTable<'_>) {
        self.set_input(pin, true, vectors);
    }

    pub fn set_duty(&self, channel: u8, duty: f64) {
        self.with_regs(|r| {
            if let Some(slot) = r.analog.get_mut(channel as usize) {
                *slot = duty.clamp(0.0, 1.0);
            }
        });
    }

    /// Advance the clock by `ms`, one tick at a time.
    pub fn advance(&self, ms: u64, vectors: &InterruptTable<'_>) {
        for _ in 0..ms {
            self.step(vectors);
        }
    }

    fn step(&self, vectors: &InterruptTable<'_>) {
        let timers = self.with_regs(|r| {
            r.now_ms += u64::from(TICK_MS);
            r.timer_mask
        });
        for circuit in Circuit::ALL {
            if timers & circuit.mask() != 0 {
                vectors.dispatch(Vector::TimerTick(circuit));
            }
        }
        if self.with_regs(Registers::check_watchdog) {
            self.circuits.release_all();
        }
    }

    // ── Inspection ────────────────────────────────────────────

    pub fn now_ms(&self) -> u64 {
        self.with_regs(|r| r.now_ms)
    }

    pub fn level(&self, pin: PinId) -> bool {
        self.with_regs(|r| r.levels[pin.index()])
    }

    pub fn direction(&self, pin: PinId) -> Option<Direction> {
        self.with_regs(|r| r.directions[pin.index()])
    }

    /// Whether a level change on `pin` would interrupt right now.
    pub fn is_pin_change_armed(&self, pin: PinId) -> bool {
        self.with_regs(|r| r.pin_change_armed(pin))
    }

    pub fn is_port_enabled(&self, port: IoPort) -> bool {
        self.with_regs(|r| r.port_mask & port.mask() != 0)
    }

    pub fn is_timer_enabled(&self, circuit: Circuit) -> bool {
        self.with_regs(|r| r.timer_mask & circuit.mask() != 0)
    }

    pub fn watchdog_mode(&self) -> Option<ResetMode> {
        self.with_regs(|r| r.watchdog.map(|w| w.mode))
    }

    /// Number of watchdog-forced system resets so far. Doubles as the boot
    /// generation: a change means the running firmware is gone.
    pub fn resets(&self) -> u32 {
        self.with_regs(|r| r.resets)
    }

    pub fn last_reset_ms(&self) -> Option<u64> {
        self.with_regs(|r| r.last_reset_ms)
    }

    /// Expiries handled in interrupt-only mode.
    pub fn watchdog_interrupts(&self) -> u32 {
        self.with_regs(|r| r.watchdog_interrupts)
    }
}

impl Hal for SimBoard {
    fn configure(&self, pin: PinId, direction: Direction) {
        self.with_regs(|r| {
            let i = pin.index();
            r.directions[i] = Some(direction);
            r.levels[i] = matches!(direction, Direction::InputPullup);
        });
    }

    fn read(&self, pin: PinId) -> bool {
        self.level(pin)
    }

    fn write(&self, pin: PinId, high: bool) {
        self.with_regs(|r| {
            if r.directions[pin.index()] == Some(Direction::Output) {
                r.levels[pin.index()] = high;
            }
        });
    }

    fn enable_interrupt(&self, source: IrqSource) {
        self.with_regs(|r| match source {
            IrqSource::Pin(pin) => r.pin_mask |= 1 << pin.index(),
            IrqSource::Port(port) => r.port_mask |= port.mask(),
            IrqSource::Timer(circuit) => r.timer_mask |= circuit.mask(),
        });
    }

    fn disable_interrupt(&self, source: IrqSource) {
        self.with_regs(|r| match source {
            IrqSource::Pin(pin) => r.pin_mask &= !(1 << pin.index()),
            IrqSource::Port(port) => r.port_mask &= !port.mask(),
            IrqSource::Timer(circuit) => r.timer_mask &= !circuit.mask(),
        });
    }

    fn circuits(&self) -> &CircuitRegistry {
        &self.circuits
    }
}

impl WatchdogHal for SimBoard {
    fn is_running(&self) -> bool {
        self.with_regs(|r| r.watchdog.is_some())
    }

    fn start(&self, timeout: Timeout) {
        self.with_regs(|r| {
            r.watchdog = Some(WatchdogState {
                timeout_ms: u64::from(timeout.as_ms()),
                mode: ResetMode::InterruptOnly,
                last_feed_ms: r.now_ms,
            });
        });
    }

    fn enable_system_reset(&self) {
        self.with_regs(|r| {
            if let Some(wdt) = r.watchdog.as_mut() {
                wdt.mode = ResetMode::SystemReset;
            }
        });
    }

    fn feed(&self) {
        self.with_regs(|r| {
            let now = r.now_ms;
            if let Some(wdt) = r.watchdog.as_mut() {
                wdt.last_feed_ms = now;
            }
        });
    }
}

impl AnalogPort for SimBoard {
    fn duty_cycle(&self, channel: u8) -> f64 {
        self.with_regs(|r| r.analog.get(channel as usize).copied().unwrap_or(0.0))
    }
}

// ── Real-time driver for the host simulator ───────────────────

/// Scripted stimulus for [`run_realtime`]: a bouncing button press every
/// `press_every_ms`, held for `hold_ms`, and a slowly drifting sensor.
#[derive(Debug, Clone)]
pub struct SimScript {
    pub button: PinId,
    pub press_every_ms: u64,
    pub hold_ms: u64,
    /// Edges per contact bounce burst; odd so the burst ends on the new level.
    pub bounce_edges: u64,
    pub analog_channel: u8,
    pub base_duty: f64,
    pub drift_duty: f64,
}

impl SimScript {
    pub fn new(button: PinId, analog_channel: u8) -> Self {
        Self {
            button,
            press_every_ms: 10_000,
            hold_ms: 800,
            bounce_edges: 5,
            analog_channel,
            base_duty: 0.15,
            drift_duty: 0.03,
        }
    }

    /// Button level the script wants at `now_ms`, if it changes then.
    fn button_level(&self, now_ms: u64) -> Option<bool> {
        let phase = now_ms % self.press_every_ms;
        if phase < self.bounce_edges {
            // 0: low, 1: high, 2: low ... ends low (pressed).
            return Some(phase % 2 == 1);
        }
        let released = phase.checked_sub(self.hold_ms)?;
        if released < self.bounce_edges {
            return Some(released % 2 == 0);
        }
        None
    }

    fn duty(&self, now_ms: u64) -> f64 {
        let angle = (now_ms as f64 / 120_000.0) * core::f64::consts::TAU;
        self.base_duty + self.drift_duty * angle.sin()
    }
}

/// Drive `board` in wall-clock time until the next watchdog reset: one tick
/// per millisecond plus the scripted stimulus. Runs on its own thread,
/// standing in for the hardware and its interrupt controller.
pub fn run_realtime(board: &SimBoard, vectors: &InterruptTable<'_>, script: &SimScript) {
    info!(
        "sim: board running, button press every {} ms on pin {}",
        script.press_every_ms,
        script.button.number()
    );
    let boot = board.resets();
    loop {
        std::thread::sleep(Duration::from_millis(u64::from(TICK_MS)));
        board.advance(1, vectors);
        if board.resets() != boot {
            return;
        }
        let now = board.now_ms();
        if let Some(level) = script.button_level(now) {
            board.set_input(script.button, level, vectors);
        }
        if now % 1_000 == 0 {
            board.set_duty(script.analog_channel, script.duty(now));
        }
    }
}
