//! Fuzz target: button stimulus against the full control loop
//!
//! Interprets the input as a stream of (level, delay) pairs applied to the
//! button of a freshly set-up node and verifies:
//! - No panics or RefCell double borrows in any handler interleaving
//! - Every dispatched press produces exactly one button prediction
//! - The serviced watchdog never resets the board
//!
//! cargo fuzz run fuzz_pin_events

#![no_main]

use std::sync::{Arc, Mutex};

use libfuzzer_sys::fuzz_target;
use tempredict::adapters::sim::SimBoard;
use tempredict::app::control::{ControlLoop, Peripherals};
use tempredict::app::events::{AppEvent, Trigger};
use tempredict::app::ports::EventSink;
use tempredict::config::SystemConfig;

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<AppEvent>>>);

impl EventSink for Recorder {
    fn emit(&mut self, event: &AppEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

fuzz_target!(|data: &[u8]| {
    let config = SystemConfig::default();
    let board: &'static SimBoard = Box::leak(Box::new(SimBoard::new()));
    let peripherals: &'static Peripherals<'static, SimBoard> =
        Box::leak(Box::new(Peripherals::new(board, &config).unwrap()));
    let recorder = Recorder::default();
    let control =
        ControlLoop::setup(peripherals, board, board, recorder.clone(), &config).unwrap();
    control.arm().unwrap();
    let button = peripherals.button.pin();

    for pair in data.chunks_exact(2) {
        board.set_input(button, pair[0] & 1 == 1, control.vectors());
        for _ in 0..u64::from(pair[1]) * 4 {
            board.advance(1, control.vectors());
            control.service();
        }
    }

    let events = recorder.0.lock().unwrap();
    let pressed = events.iter().filter(|e| **e == AppEvent::ButtonPressed).count();
    let predicted = events
        .iter()
        .filter(|e| matches!(e, AppEvent::Prediction { trigger: Trigger::Button, .. }))
        .count();
    assert_eq!(pressed, predicted);
    assert_eq!(board.resets(), 0);
});
