//! Pin assignments for the prediction node.
//!
//! Single source of truth for the default wiring. Pin numbers are in the
//! board's logical address space (0–19, see [`PinId`]); the ESP32 adapter
//! maps them onto physical GPIOs with [`esp32_gpio`].
//!
//! [`PinId`]: crate::app::ports::PinId

use crate::app::ports::PinId;

// ---------------------------------------------------------------------------
// Digital
// ---------------------------------------------------------------------------

/// Digital output: error LED, lit when model training fails.
pub const ERROR_LED_PIN: u8 = 9;

/// Digital input with pull-up: prediction button, active LOW.
pub const PREDICTION_BUTTON_PIN: u8 = 13;

// ---------------------------------------------------------------------------
// Analog
// ---------------------------------------------------------------------------

/// Analog channel of the temperature sensor.
pub const TEMP_SENSOR_CHANNEL: u8 = 2;

/// Supply voltage of the temperature sensor (V).
pub const TEMP_SENSOR_VCC: f64 = 5.0;

// ---------------------------------------------------------------------------
// ESP32-S3 mapping
// ---------------------------------------------------------------------------

/// Physical GPIO for each logical pin. Ports D (0–7), B (8–13) and C
/// (14–19) stay contiguous so port-wide masking covers neighbouring pads.
const ESP32_GPIO: [i32; PinId::COUNT] = [
    // Port D
    1, 2, 3, 4, 5, 6, 7, 8, //
    // Port B
    9, 10, 11, 12, 13, 14, //
    // Port C
    15, 16, 17, 18, 21, 38,
];

/// ADC1 channel behind each logical analog channel (GPIO 1–8 on the S3).
const ESP32_ADC1_CHANNEL: [u32; 8] = [0, 1, 2, 3, 4, 5, 6, 7];

pub const fn esp32_gpio(pin: PinId) -> i32 {
    ESP32_GPIO[pin.index()]
}

pub const fn esp32_adc1_channel(channel: u8) -> Option<u32> {
    if (channel as usize) < ESP32_ADC1_CHANNEL.len() {
        Some(ESP32_ADC1_CHANNEL[channel as usize])
    } else {
        None
    }
}
