//! Device drivers built on the [`Hal`](crate::app::ports::Hal) port.

pub mod gpio;
pub mod timer;
pub mod watchdog;
