//! Setup sequence and its failure modes.

use tempredict::app::control::Peripherals;
use tempredict::app::events::AppEvent;
use tempredict::app::ports::WatchdogHal;
use tempredict::config::SystemConfig;
use tempredict::error::{Error, TimerError};

use crate::mock_hw::{attempt, Rig};

#[test]
fn reports_model_fit_then_started() {
    let rig = Rig::new();
    let events = rig.sink.events();
    assert_eq!(
        events.first(),
        Some(&AppEvent::ModelFit(vec![-50, -40, -30, -20, -10, 0, 10, 20, 30, 40, 50]))
    );
    assert_eq!(
        events.last(),
        Some(&AppEvent::Started {
            prediction_period_ms: 60_000,
            watchdog_timeout_ms: 1_024,
        })
    );
    assert_eq!(events.len(), 2);
}

#[test]
fn training_failure_lights_error_led_and_aborts() {
    let mut config = SystemConfig::default();
    config.training.iterations = 0;
    let a = attempt(&config);

    assert!(matches!(a.result, Err(Error::Training)));
    assert!(a.board.level(a.peripherals.error_led.pin()));
    assert_eq!(a.sink.events(), vec![AppEvent::TrainingFailed]);
    assert!(!a.board.is_running(), "watchdog stays unarmed");
    assert!(!a.board.is_pin_change_armed(a.peripherals.button.pin()));
}

#[test]
fn mismatched_training_set_fails_training() {
    let mut config = SystemConfig::default();
    config.training.outputs.pop();
    let a = attempt(&config);
    assert!(matches!(a.result, Err(Error::Training)));
}

#[test]
fn error_led_stays_off_after_successful_setup() {
    let rig = Rig::new();
    assert!(!rig.board.level(rig.peripherals.error_led.pin()));
}

#[test]
fn second_node_on_same_board_is_rejected() {
    let rig = Rig::new();
    assert!(matches!(
        Peripherals::new(rig.board, &rig.config),
        Err(Error::Timer(TimerError::CircuitInUse(_)))
    ));
}

#[test]
fn json_overrides_reach_the_timers() {
    let config = SystemConfig::from_json(r#"{ "prediction_period_ms": 5000 }"#).unwrap();
    let mut rig = Rig::with_config(config);
    assert_eq!(rig.peripherals.prediction_timer.period_ms(), 5_000);
    rig.advance(10_000);
    assert_eq!(rig.control.predictions(), 2);
}
