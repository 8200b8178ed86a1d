//! Analog temperature sensor.
//!
//! The sensor output is sampled by the ADC as a fraction of full scale.
//! Scaling that fraction by the sensor's supply voltage gives the input
//! voltage the prediction model was trained against.

use crate::app::ports::AnalogPort;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureSensor {
    channel: u8,
    vcc: f64,
}

impl TemperatureSensor {
    pub fn new(channel: u8, vcc: f64) -> Self {
        Self { channel, vcc }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Supply voltage (V).
    pub fn vcc(&self) -> f64 {
        self.vcc
    }

    /// Sensor output in volts, `0.0..=vcc`.
    pub fn input_voltage(&self, adc: &impl AnalogPort) -> f64 {
        adc.duty_cycle(self.channel).clamp(0.0, 1.0) * self.vcc
    }
}
