//! Fuzz target: `SystemConfig::from_json`
//!
//! Feeds arbitrary bytes to the JSON override parser and verifies:
//! - No panics under arbitrary input
//! - Any accepted config passes `validate()`
//! - Any accepted config can build its peripherals on a fresh board
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use tempredict::adapters::sim::SimBoard;
use tempredict::app::control::Peripherals;
use tempredict::config::SystemConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = SystemConfig::from_json(text) else {
        return;
    };
    assert_eq!(config.validate(), Ok(()));

    let board = SimBoard::new();
    assert!(Peripherals::new(&board, &config).is_ok());
});
