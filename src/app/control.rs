//! Setup and the watchdog-servicing superloop.
//!
//! [`Peripherals`] owns the board devices; [`ControlLoop::setup`] trains
//! the model, wires every handler, arms the interrupts and returns the
//! loop. Once the board adapter has installed [`ControlLoop::vectors`],
//! [`ControlLoop::arm`] starts the watchdog in system-reset mode. From then
//! on all work happens in interrupt handlers:
//!
//! ```text
//! button pin change ──▶ Debouncer ──Press──▶ restart periodic timer
//!                          │                 + predict (Button)
//!                          └────Release────▶ ButtonReleased
//! debounce timer ─────▶ Debouncer (unmask port)
//! prediction timer ───▶ predict (Periodic)
//! ```
//!
//! The loop body only services the watchdog. A handler that stalls starves
//! it and the board resets.

use std::sync::{Arc, OnceLock};

use log::{error, info};

use crate::app::debounce::{DebounceState, Debouncer};
use crate::app::events::{AppEvent, Edge, Trigger};
use crate::app::ports::{AnalogPort, Direction, EventSink, Hal, Vector, WatchdogHal};
use crate::app::prediction::PredictionTask;
use crate::config::SystemConfig;
use crate::drivers::gpio::Gpio;
use crate::drivers::timer::Timer;
use crate::drivers::watchdog::{Timeout, Watchdog};
use crate::error::{Error, Result};
use crate::interrupts::InterruptTable;
use crate::ml::LinReg;
use crate::sensors::temperature::TemperatureSensor;

/// Every device the node uses, built once at boot.
pub struct Peripherals<'a, H: Hal> {
    pub error_led: Gpio<'a, H>,
    pub button: Gpio<'a, H>,
    pub debounce_timer: Timer<'a, H>,
    pub prediction_timer: Timer<'a, H>,
}

impl<'a, H: Hal> Peripherals<'a, H> {
    pub fn new(hal: &'a H, config: &SystemConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            error_led: Gpio::new(hal, config.error_led_pin, Direction::Output)?,
            button: Gpio::new(hal, config.button_pin, Direction::InputPullup)?,
            debounce_timer: Timer::new(hal, config.debounce_circuit, config.debounce_period_ms)?,
            prediction_timer: Timer::new(
                hal,
                config.prediction_circuit,
                config.prediction_period_ms,
            )?,
        })
    }
}

pub struct ControlLoop<'a, H: Hal, W: WatchdogHal, A: AnalogPort, S: EventSink> {
    peripherals: &'a Peripherals<'a, H>,
    debouncer: Arc<Debouncer<'a, H>>,
    prediction: Arc<PredictionTask<'a, A, S>>,
    vectors: InterruptTable<'a>,
    watchdog_hal: &'a W,
    watchdog_timeout: Timeout,
    watchdog: OnceLock<Watchdog<'a, W>>,
}

impl<'a, H, W, A, S> ControlLoop<'a, H, W, A, S>
where
    H: Hal,
    W: WatchdogHal,
    A: AnalogPort,
    S: EventSink + 'a,
{
    /// Bring the node up, short of the watchdog. Nothing here arms it, so a
    /// failure here or in vector installation leaves the board halted
    /// rather than reset-looping.
    pub fn setup(
        peripherals: &'a Peripherals<'a, H>,
        watchdog_hal: &'a W,
        adc: &'a A,
        mut sink: S,
        config: &SystemConfig,
    ) -> Result<Self> {
        // 1. Model
        let training = &config.training;
        let mut model = LinReg::new(
            training.initial_weight,
            training.initial_bias,
            training.inputs.clone(),
            training.outputs.clone(),
            training.learning_rate,
        );
        if !model.train(training.iterations) {
            peripherals.error_led.set()?;
            sink.emit(&AppEvent::TrainingFailed);
            error!("control: model training failed, setup aborted");
            return Err(Error::Training);
        }
        let fit = model.inputs().iter().map(|&x| model.predict(x).round() as i32).collect();
        sink.emit(&AppEvent::ModelFit(fit));
        info!(
            "control: model trained (weight {:.3}, bias {:.3})",
            model.weight(),
            model.bias()
        );

        let sensor = TemperatureSensor::new(config.temp_sensor_channel, config.vcc);
        let prediction = Arc::new(PredictionTask::new(adc, sensor, model, sink));

        // 2. Handlers
        let task = Arc::clone(&prediction);
        let periodic = &peripherals.prediction_timer;
        let debouncer = Arc::new(Debouncer::new(
            &peripherals.button,
            &peripherals.debounce_timer,
            move |edge| match edge {
                Edge::Press => {
                    task.notify(&AppEvent::ButtonPressed);
                    periodic.start();
                    task.trigger(Trigger::Button);
                }
                Edge::Release => task.notify(&AppEvent::ButtonReleased),
            },
        ));
        debouncer.attach()?;

        let task = Arc::clone(&prediction);
        peripherals.prediction_timer.add_callback(move || {
            task.trigger(Trigger::Periodic);
        })?;

        // 3. Vectors
        let mut vectors = InterruptTable::new();
        vectors.attach(Vector::PinChange(peripherals.button.pin()), &peripherals.button)?;
        vectors.attach(
            Vector::TimerTick(peripherals.debounce_timer.circuit()),
            &peripherals.debounce_timer,
        )?;
        vectors.attach(
            Vector::TimerTick(peripherals.prediction_timer.circuit()),
            &peripherals.prediction_timer,
        )?;

        // 4. Arm
        peripherals.button.enable_interrupt()?;
        peripherals.prediction_timer.start();
        info!("control: setup complete");

        Ok(Self {
            peripherals,
            debouncer,
            prediction,
            vectors,
            watchdog_hal,
            watchdog_timeout: config.watchdog_timeout,
            watchdog: OnceLock::new(),
        })
    }

    /// Start the watchdog and commit it to system reset. Call once the
    /// vectors are live; the superloop must be serviced from here on.
    pub fn arm(&self) -> Result<()> {
        let watchdog = Watchdog::init(self.watchdog_hal, self.watchdog_timeout)?;
        watchdog.enable_system_reset();
        let watchdog = self.watchdog.get_or_init(|| watchdog);

        self.prediction.notify(&AppEvent::Started {
            prediction_period_ms: self.peripherals.prediction_timer.period_ms(),
            watchdog_timeout_ms: watchdog.timeout().as_ms(),
        });
        info!("control: watchdog armed");
        Ok(())
    }

    pub fn is_armed(&self) -> bool {
        self.watchdog.get().is_some()
    }

    /// Interrupt routing for the board adapter.
    pub fn vectors(&self) -> &InterruptTable<'a> {
        &self.vectors
    }

    pub fn peripherals(&self) -> &'a Peripherals<'a, H> {
        self.peripherals
    }

    pub fn debounce_state(&self) -> DebounceState {
        self.debouncer.state()
    }

    pub fn predictions(&self) -> u32 {
        self.prediction.predictions()
    }

    /// One superloop iteration.
    #[inline]
    pub fn service(&self) {
        if let Some(watchdog) = self.watchdog.get() {
            watchdog.reset();
        }
    }

    pub fn run(&self) -> ! {
        loop {
            self.service();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sim::SimBoard;
    use crate::drivers::watchdog::ResetMode;
    use crate::error::{TimerError, WatchdogError};

    struct NullSink;

    impl EventSink for NullSink {
        fn emit(&mut self, _event: &AppEvent) {}
    }

    fn leak<T>(value: T) -> &'static T {
        Box::leak(Box::new(value))
    }

    #[test]
    fn setup_arms_button_timer_and_watchdog() {
        let board = leak(SimBoard::new());
        let config = SystemConfig::default();
        let peripherals = leak(Peripherals::new(board, &config).unwrap());
        let control = ControlLoop::setup(peripherals, board, board, NullSink, &config).unwrap();
        control.arm().unwrap();

        let button = peripherals.button.pin();
        assert!(board.is_pin_change_armed(button));
        assert!(board.is_timer_enabled(config.prediction_circuit));
        assert!(!board.is_timer_enabled(config.debounce_circuit));
        assert!(board.is_running());
        assert_eq!(control.vectors().len(), 3);
        assert_eq!(control.debounce_state(), DebounceState::Idle);
    }

    #[test]
    fn watchdog_stays_off_until_armed() {
        let board = leak(SimBoard::new());
        let config = SystemConfig::default();
        let peripherals = leak(Peripherals::new(board, &config).unwrap());
        let control = ControlLoop::setup(peripherals, board, board, NullSink, &config).unwrap();
        assert!(!board.is_running());
        assert!(!control.is_armed());

        // Vector install failed: nobody services the loop, nothing resets.
        let vectors = InterruptTable::new();
        board.advance(10_000, &vectors);
        assert_eq!(board.resets(), 0);

        control.arm().unwrap();
        assert!(control.is_armed());
        assert_eq!(board.watchdog_mode(), Some(ResetMode::SystemReset));
        assert!(matches!(
            control.arm(),
            Err(Error::Watchdog(WatchdogError::AlreadyInitialized))
        ));
    }

    #[test]
    fn peripherals_claim_their_circuits() {
        let board = leak(SimBoard::new());
        let config = SystemConfig::default();
        let _first = Peripherals::new(board, &config).unwrap();
        assert!(matches!(
            Peripherals::new(board, &config),
            Err(Error::Timer(TimerError::CircuitInUse(_)))
        ));
    }

    #[test]
    fn invalid_config_is_rejected_before_touching_hardware() {
        let board = leak(SimBoard::new());
        let mut config = SystemConfig::default();
        config.prediction_circuit = config.debounce_circuit;
        assert!(matches!(Peripherals::new(board, &config), Err(Error::Config(_))));
        assert!(!board.circuits().is_claimed(config.debounce_circuit));
    }
}
