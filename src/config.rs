//! System configuration parameters
//!
//! Wiring, timing and model-training parameters for the prediction node.
//! Defaults reproduce the reference board; the host simulator accepts a
//! JSON file with overrides (any omitted field keeps its default).

use serde::{Deserialize, Serialize};

use crate::app::ports::{Circuit, PinId};
use crate::drivers::watchdog::Timeout;
use crate::error::ConfigError;
use crate::pins;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Pins ---
    /// Output pin of the error LED
    pub error_led_pin: u8,
    /// Input pin of the prediction button (pull-up, active low)
    pub button_pin: u8,
    /// Analog channel of the temperature sensor
    pub temp_sensor_channel: u8,
    /// Sensor supply voltage (V)
    pub vcc: f64,

    // --- Timers ---
    /// Hardware counter used for debouncing
    pub debounce_circuit: Circuit,
    /// Port mask window after a button edge (ms)
    pub debounce_period_ms: u32,
    /// Hardware counter used for periodic predictions
    pub prediction_circuit: Circuit,
    /// Interval between periodic predictions (ms)
    pub prediction_period_ms: u32,

    // --- Supervision ---
    pub watchdog_timeout: Timeout,

    // --- Model ---
    pub training: TrainingConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            error_led_pin: pins::ERROR_LED_PIN,
            button_pin: pins::PREDICTION_BUTTON_PIN,
            temp_sensor_channel: pins::TEMP_SENSOR_CHANNEL,
            vcc: pins::TEMP_SENSOR_VCC,

            debounce_circuit: Circuit::Timer1,
            debounce_period_ms: 300,
            prediction_circuit: Circuit::Timer2,
            prediction_period_ms: 60_000, // 1/min

            watchdog_timeout: Timeout::Timeout1024ms,

            training: TrainingConfig::default(),
        }
    }
}

/// Training set and hyper-parameters for the temperature model.
///
/// Inputs are sensor voltages, outputs temperatures in °C.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub inputs: Vec<f64>,
    pub outputs: Vec<f64>,
    pub initial_weight: f64,
    pub initial_bias: f64,
    pub learning_rate: f64,
    pub iterations: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            inputs: (0..=10).map(|i| f64::from(i) / 10.0).collect(),
            outputs: (0..=10).map(|i| f64::from(i * 10 - 50)).collect(),
            initial_weight: 0.0,
            initial_bias: 0.0,
            learning_rate: 0.1,
            iterations: 100,
        }
    }
}

impl SystemConfig {
    /// Parse a (possibly partial) JSON override.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(text).map_err(|_| ConfigError::Parse)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Range and consistency checks. Training-set problems are left to the
    /// model, which reports them as a training failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if PinId::new(self.error_led_pin).is_err() {
            return Err(ConfigError::ValidationFailed("error_led_pin must be 0–19"));
        }
        if PinId::new(self.button_pin).is_err() {
            return Err(ConfigError::ValidationFailed("button_pin must be 0–19"));
        }
        if self.error_led_pin == self.button_pin {
            return Err(ConfigError::ValidationFailed(
                "error_led_pin and button_pin must differ",
            ));
        }
        if pins::esp32_adc1_channel(self.temp_sensor_channel).is_none() {
            return Err(ConfigError::ValidationFailed(
                "temp_sensor_channel has no ADC channel",
            ));
        }
        if !(self.vcc > 0.0 && self.vcc.is_finite()) {
            return Err(ConfigError::ValidationFailed("vcc must be positive"));
        }
        if self.debounce_circuit == self.prediction_circuit {
            return Err(ConfigError::ValidationFailed(
                "debounce_circuit and prediction_circuit must differ",
            ));
        }
        if self.debounce_period_ms == 0 || self.prediction_period_ms == 0 {
            return Err(ConfigError::ValidationFailed("timer periods must be non-zero"));
        }
        if self.debounce_period_ms >= self.prediction_period_ms {
            return Err(ConfigError::ValidationFailed(
                "debounce_period_ms must be < prediction_period_ms",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let c = SystemConfig::default();
        assert_eq!(c.validate(), Ok(()));
        assert_eq!(c.error_led_pin, 9);
        assert_eq!(c.button_pin, 13);
        assert_eq!(c.debounce_period_ms, 300);
        assert_eq!(c.prediction_period_ms, 60_000);
        assert_eq!(c.watchdog_timeout.as_ms(), 1024);
    }

    #[test]
    fn default_training_set_is_the_ramp() {
        let t = TrainingConfig::default();
        assert_eq!(t.inputs.len(), 11);
        assert_eq!(t.outputs.first(), Some(&-50.0));
        assert_eq!(t.outputs.last(), Some(&50.0));
        assert!((t.inputs[3] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn serde_roundtrip() {
        let c = SystemConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2 = SystemConfig::from_json(&json).unwrap();
        assert_eq!(c, c2);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c = SystemConfig::from_json(r#"{ "prediction_period_ms": 5000 }"#).unwrap();
        assert_eq!(c.prediction_period_ms, 5000);
        assert_eq!(c.debounce_period_ms, 300);
        assert_eq!(c.training, TrainingConfig::default());
    }

    #[test]
    fn malformed_json_rejected() {
        assert_eq!(SystemConfig::from_json("{ nope"), Err(ConfigError::Parse));
    }

    #[test]
    fn shared_resources_rejected() {
        let mut c = SystemConfig::default();
        c.button_pin = c.error_led_pin;
        assert!(c.validate().is_err());

        let mut c = SystemConfig::default();
        c.prediction_circuit = c.debounce_circuit;
        assert!(c.validate().is_err());
    }

    #[test]
    fn bad_ranges_rejected() {
        let mut c = SystemConfig::default();
        c.button_pin = 20;
        assert!(c.validate().is_err());

        let mut c = SystemConfig::default();
        c.debounce_period_ms = 0;
        assert!(c.validate().is_err());

        let mut c = SystemConfig::default();
        c.debounce_period_ms = c.prediction_period_ms;
        assert!(c.validate().is_err());

        let mut c = SystemConfig::default();
        c.vcc = 0.0;
        assert!(c.validate().is_err());

        let mut c = SystemConfig::default();
        c.temp_sensor_channel = 8;
        assert!(c.validate().is_err());
    }

    #[test]
    fn unmapped_sensor_channel_rejected_from_json() {
        assert_eq!(
            SystemConfig::from_json(r#"{ "temp_sensor_channel": 200 }"#),
            Err(ConfigError::ValidationFailed("temp_sensor_channel has no ADC channel"))
        );
        let c = SystemConfig::from_json(r#"{ "temp_sensor_channel": 7 }"#).unwrap();
        assert_eq!(c.temp_sensor_channel, 7);
    }

    #[test]
    fn training_problems_are_not_config_errors() {
        let mut c = SystemConfig::default();
        c.training.inputs.clear();
        c.training.learning_rate = -1.0;
        assert_eq!(c.validate(), Ok(()));
    }
}
