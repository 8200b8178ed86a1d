//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter    | Implements                     | Connects to                  |
//! |------------|--------------------------------|------------------------------|
//! | `esp32`    | Hal, WatchdogHal, AnalogPort   | ESP-IDF GPIO, esp_timer, TWDT, ADC1 |
//! | `sim`      | Hal, WatchdogHal, AnalogPort   | In-memory board, virtual clock |
//! | `log_sink` | EventSink                      | Serial log output            |

#[cfg(target_os = "espidf")]
pub mod esp32;
pub mod log_sink;
pub mod sim;
