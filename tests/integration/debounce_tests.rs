//! Button debounce through the full control loop.

use tempredict::app::debounce::DebounceState;
use tempredict::app::events::{AppEvent, Trigger};

use crate::mock_hw::Rig;

#[test]
fn press_masks_port_for_one_debounce_period() {
    let mut rig = Rig::new();
    assert!(rig.port_unmasked());

    rig.press();
    assert!(!rig.port_unmasked(), "masked at 0 ms");
    assert_eq!(rig.control.debounce_state(), DebounceState::Settling);

    rig.advance(299);
    assert!(!rig.port_unmasked());
    rig.advance(1);
    assert!(rig.port_unmasked(), "unmasked at 300 ms");
    assert_eq!(rig.control.debounce_state(), DebounceState::Idle);
    assert!(!rig.board.is_timer_enabled(rig.config.debounce_circuit));
}

#[test]
fn bounce_at_150ms_dispatches_nothing() {
    let mut rig = Rig::new();
    rig.press();
    rig.advance(150);
    rig.release();
    rig.press();
    rig.advance(150);

    assert_eq!(rig.sink.count(&AppEvent::ButtonPressed), 1);
    assert_eq!(rig.sink.count(&AppEvent::ButtonReleased), 0);
    assert_eq!(rig.sink.predictions(Trigger::Button), 1);
}

#[test]
fn press_predicts_and_release_only_reports() {
    let mut rig = Rig::new();
    rig.press();
    rig.advance(1_000);
    rig.release();
    rig.advance(1_000);

    assert_eq!(rig.sink.count(&AppEvent::ButtonPressed), 1);
    assert_eq!(rig.sink.count(&AppEvent::ButtonReleased), 1);
    assert_eq!(rig.sink.predictions(Trigger::Button), 1);
    assert_eq!(rig.control.predictions(), 1);
}

#[test]
fn prediction_uses_sensor_voltage() {
    let rig = Rig::new();
    rig.press();

    let prediction = rig
        .sink
        .events()
        .into_iter()
        .find_map(|e| match e {
            AppEvent::Prediction {
                trigger: Trigger::Button,
                voltage,
                celsius,
            } => Some((voltage, celsius)),
            _ => None,
        })
        .unwrap();
    // 0.15 duty of 5 V on a model fitted to 100 °C/V - 50 °C.
    assert!((prediction.0 - 0.75).abs() < 1e-9);
    assert!((prediction.1 - 25.0).abs() < 0.5);
}

#[test]
fn separated_presses_each_dispatch_once() {
    let mut rig = Rig::new();
    for _ in 0..5 {
        rig.press();
        rig.advance(400);
        rig.release();
        rig.advance(400);
    }
    assert_eq!(rig.sink.count(&AppEvent::ButtonPressed), 5);
    assert_eq!(rig.sink.count(&AppEvent::ButtonReleased), 5);
}
