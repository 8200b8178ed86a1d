//! Interrupt-driven temperature prediction node.
//!
//! Exposes the dispatch framework (drivers, vector table, control loop)
//! for integration testing against the simulated board. All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod interrupts;
pub mod ml;
pub mod pins;
pub mod sensors;

pub use error::{Error, Result};
