//! Application core: the debounce machine, the prediction task and the
//! control loop that wires them to the drivers.
//!
//! All interaction with hardware happens through the **port traits**
//! defined in [`ports`], keeping this layer testable on the host against
//! the simulated board.

pub mod control;
pub mod debounce;
pub mod events;
pub mod ports;
pub mod prediction;
