//! Sensor drivers. Each one reads through a port trait so the same code
//! runs against the ESP32 ADC and the simulated board.

pub mod temperature;
