//! Temperature prediction shared by the button and periodic handlers.
//!
//! Both handlers run in interrupt context and may interleave, so the model
//! and the event sink live behind a critical-section mutex. The sensor
//! read happens outside it.

use core::cell::RefCell;

use critical_section::Mutex;
use log::debug;

use crate::app::events::{AppEvent, Trigger};
use crate::app::ports::{AnalogPort, EventSink};
use crate::ml::LinReg;
use crate::sensors::temperature::TemperatureSensor;

struct Shared<S> {
    model: LinReg,
    sink: S,
    predictions: u32,
}

pub struct PredictionTask<'a, A: AnalogPort, S: EventSink> {
    adc: &'a A,
    sensor: TemperatureSensor,
    shared: Mutex<RefCell<Shared<S>>>,
}

impl<'a, A: AnalogPort, S: EventSink> PredictionTask<'a, A, S> {
    /// `model` must already be trained.
    pub fn new(adc: &'a A, sensor: TemperatureSensor, model: LinReg, sink: S) -> Self {
        Self {
            adc,
            sensor,
            shared: Mutex::new(RefCell::new(Shared {
                model,
                sink,
                predictions: 0,
            })),
        }
    }

    /// Sample the sensor, predict, and report. Returns the temperature.
    pub fn trigger(&self, trigger: Trigger) -> f64 {
        let voltage = self.sensor.input_voltage(self.adc);
        let celsius = critical_section::with(|cs| {
            let mut shared = self.shared.borrow_ref_mut(cs);
            let celsius = shared.model.predict(voltage);
            shared.predictions += 1;
            shared.sink.emit(&AppEvent::Prediction {
                trigger,
                voltage,
                celsius,
            });
            celsius
        });
        debug!("prediction: {:?} {:.3} V -> {:.1} C", trigger, voltage, celsius);
        celsius
    }

    /// Forward a non-prediction event to the sink.
    pub fn notify(&self, event: &AppEvent) {
        critical_section::with(|cs| self.shared.borrow_ref_mut(cs).sink.emit(event));
    }

    /// Predictions made since setup.
    pub fn predictions(&self) -> u32 {
        critical_section::with(|cs| self.shared.borrow_ref(cs).predictions)
    }
}
