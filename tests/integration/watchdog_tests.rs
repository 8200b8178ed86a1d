//! Watchdog supervision of the superloop.

use tempredict::app::debounce::DebounceState;
use tempredict::app::events::{AppEvent, Trigger};
use tempredict::app::ports::{Direction, WatchdogHal};
use tempredict::drivers::watchdog::ResetMode;

use crate::mock_hw::Rig;

#[test]
fn setup_arms_system_reset() {
    let rig = Rig::new();
    assert!(rig.board.is_running());
    assert_eq!(rig.board.watchdog_mode(), Some(ResetMode::SystemReset));
}

#[test]
fn serviced_loop_never_resets() {
    let mut rig = Rig::new();
    rig.press();
    rig.advance(130_000);
    assert_eq!(rig.board.resets(), 0);
    assert_eq!(rig.boots(), 1);
}

#[test]
fn stalled_loop_resets_once_and_reboots() {
    let mut rig = Rig::new();
    rig.advance(5_000);

    rig.starve(1_023);
    assert_eq!(rig.board.resets(), 0);
    rig.starve(1);
    assert_eq!(rig.board.resets(), 1);
    assert_eq!(rig.board.last_reset_ms(), Some(6_024));
    assert_eq!(rig.boots(), 2);

    // The rebooted node services its loop again.
    rig.advance(10_000);
    assert_eq!(rig.board.resets(), 1);
}

#[test]
fn reset_reboots_from_power_on_defaults() {
    let mut rig = Rig::new();
    rig.advance(1_000);
    rig.starve(900);
    rig.press();
    assert_eq!(rig.control.debounce_state(), DebounceState::Settling);
    let stale = rig.peripherals;

    rig.starve(124);
    assert_eq!(rig.board.resets(), 1);
    assert_eq!(rig.board.last_reset_ms(), Some(2_024));
    assert!(!std::ptr::eq(stale, rig.peripherals), "fresh drivers after reboot");

    // Drivers and registers agree, both back at their boot state.
    let p = rig.peripherals;
    assert_eq!(rig.control.debounce_state(), DebounceState::Idle);
    assert!(!p.debounce_timer.is_running());
    assert!(!rig.board.is_timer_enabled(rig.config.debounce_circuit));
    assert!(p.prediction_timer.is_running());
    assert_eq!(p.prediction_timer.elapsed_ms(), 0);
    assert!(rig.board.is_timer_enabled(rig.config.prediction_circuit));
    assert!(p.button.is_interrupt_enabled());
    assert!(rig.port_unmasked());
    assert!(rig.board.is_pin_change_armed(rig.button()));
    assert_eq!(rig.board.direction(rig.button()), Some(Direction::InputPullup));
    assert!(!rig.board.level(p.error_led.pin()));
    assert_eq!(rig.board.watchdog_mode(), Some(ResetMode::SystemReset));

    // Setup ran a second time and the period counts from the reboot.
    let fit = AppEvent::ModelFit(vec![-50, -40, -30, -20, -10, 0, 10, 20, 30, 40, 50]);
    assert_eq!(rig.sink.count(&fit), 2);
    rig.advance(59_999);
    assert_eq!(rig.sink.predictions(Trigger::Periodic), 0);
    rig.advance(1);
    assert_eq!(rig.sink.predictions(Trigger::Periodic), 1, "fires at 62 024 ms");
}
