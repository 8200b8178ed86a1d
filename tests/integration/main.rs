//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one part of the dispatch
//! framework end to end against the simulated board. All tests run on the
//! host with no real hardware required.

mod debounce_tests;
mod mock_hw;
mod periodic_tests;
mod setup_tests;
mod watchdog_tests;
