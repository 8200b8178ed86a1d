//! Periodic prediction timer.

use tempredict::app::events::{AppEvent, Trigger};

use crate::mock_hw::Rig;

#[test]
fn fires_every_sixty_seconds() {
    let mut rig = Rig::new();
    for n in 1..=4 {
        rig.advance(59_999);
        assert_eq!(rig.sink.predictions(Trigger::Periodic), n - 1);
        rig.advance(1);
        assert_eq!(rig.sink.predictions(Trigger::Periodic), n, "fires at {} ms", n * 60_000);
    }
}

#[test]
fn never_fires_when_stopped_at_30s() {
    let mut rig = Rig::new();
    rig.advance(30_000);
    rig.peripherals.prediction_timer.stop();
    rig.advance(210_000);
    assert_eq!(rig.sink.predictions(Trigger::Periodic), 0);
}

#[test]
fn button_press_restarts_the_period() {
    let mut rig = Rig::new();
    rig.advance(40_000);
    rig.press();

    rig.advance(59_999);
    assert_eq!(rig.sink.predictions(Trigger::Periodic), 0, "nothing at 60 000 ms");
    rig.advance(1);
    assert_eq!(rig.sink.predictions(Trigger::Periodic), 1);
    assert_eq!(rig.sink.predictions(Trigger::Button), 1);
}

#[test]
fn release_does_not_restart_the_period() {
    let mut rig = Rig::new();
    rig.advance(10_000);
    rig.press();
    rig.advance(500);
    rig.release();

    rig.advance(59_499);
    assert_eq!(rig.sink.predictions(Trigger::Periodic), 0);
    rig.advance(1);
    assert_eq!(rig.sink.predictions(Trigger::Periodic), 1, "one period after the press");
}

#[test]
fn button_and_periodic_handlers_share_a_tick() {
    let mut rig = Rig::new();
    rig.advance(10_000);
    rig.press(); // period restarts, next elapse at 70 000 ms
    rig.advance(59_700);
    rig.release(); // debounce settles at 70 000 ms
    rig.advance(300);
    assert_eq!(rig.board.now_ms(), 70_000);
    assert!(rig.port_unmasked(), "debounce settled on the elapse tick");
    assert_eq!(rig.sink.predictions(Trigger::Periodic), 1);
    rig.press();

    assert_eq!(rig.sink.predictions(Trigger::Periodic), 1);
    assert_eq!(rig.sink.predictions(Trigger::Button), 2);
    assert_eq!(rig.control.predictions(), 3);

    let events = rig.sink.events();
    match &events[events.len() - 3..] {
        [
            AppEvent::Prediction {
                trigger: Trigger::Periodic,
                voltage: periodic_v,
                celsius: periodic_c,
            },
            AppEvent::ButtonPressed,
            AppEvent::Prediction {
                trigger: Trigger::Button,
                voltage: button_v,
                celsius: button_c,
            },
        ] => {
            assert_eq!(periodic_v, button_v);
            assert_eq!(periodic_c, button_c);
        }
        other => panic!("unexpected tail: {other:?}"),
    }

    // The press restarted the period at 70 000 ms.
    rig.advance(59_999);
    assert_eq!(rig.sink.predictions(Trigger::Periodic), 1);
    rig.advance(1);
    assert_eq!(rig.sink.predictions(Trigger::Periodic), 2);
}
