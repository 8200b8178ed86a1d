//! Watchdog supervisor.
//!
//! Wraps the board's single hardware watchdog. Once
//! [`enable_system_reset`](Watchdog::enable_system_reset) has been called,
//! the only thing that prevents a full system reset is calling
//! [`reset`](Watchdog::reset) more often than the configured timeout.
//!
//! The main loop must call `reset()` on every iteration. Nothing here tries
//! to diagnose *why* a stall happened; the forced reset is the recovery.

use log::info;
use serde::{Deserialize, Serialize};

use crate::app::ports::WatchdogHal;
use crate::error::WatchdogError;

/// Supported timeout windows (the hardware prescaler steps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeout {
    Timeout16ms,
    Timeout32ms,
    Timeout64ms,
    Timeout128ms,
    Timeout256ms,
    Timeout512ms,
    Timeout1024ms,
    Timeout2048ms,
    Timeout4096ms,
    Timeout8192ms,
}

impl Timeout {
    pub const ALL: [Self; 10] = [
        Self::Timeout16ms,
        Self::Timeout32ms,
        Self::Timeout64ms,
        Self::Timeout128ms,
        Self::Timeout256ms,
        Self::Timeout512ms,
        Self::Timeout1024ms,
        Self::Timeout2048ms,
        Self::Timeout4096ms,
        Self::Timeout8192ms,
    ];

    pub const fn as_ms(self) -> u32 {
        match self {
            Self::Timeout16ms => 16,
            Self::Timeout32ms => 32,
            Self::Timeout64ms => 64,
            Self::Timeout128ms => 128,
            Self::Timeout256ms => 256,
            Self::Timeout512ms => 512,
            Self::Timeout1024ms => 1024,
            Self::Timeout2048ms => 2048,
            Self::Timeout4096ms => 4096,
            Self::Timeout8192ms => 8192,
        }
    }
}

/// What the hardware does when the timeout expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    /// Raise the watchdog interrupt and keep running.
    InterruptOnly,
    /// Reset the whole system.
    SystemReset,
}

pub struct Watchdog<'a, W: WatchdogHal> {
    hal: &'a W,
    timeout: Timeout,
}

impl<'a, W: WatchdogHal> Watchdog<'a, W> {
    /// Start the watchdog with `timeout` in interrupt-only mode.
    ///
    /// Fails if the hardware watchdog is already running: there is one per
    /// board and it cannot be stopped short of a reset.
    pub fn init(hal: &'a W, timeout: Timeout) -> Result<Self, WatchdogError> {
        critical_section::with(|_| {
            if hal.is_running() {
                return Err(WatchdogError::AlreadyInitialized);
            }
            hal.start(timeout);
            Ok(())
        })?;
        info!("watchdog: started ({} ms timeout, interrupt only)", timeout.as_ms());
        Ok(Self { hal, timeout })
    }

    pub fn timeout(&self) -> Timeout {
        self.timeout
    }

    /// Commit to a full system reset on timeout. Irreversible.
    pub fn enable_system_reset(&self) {
        self.hal.enable_system_reset();
        info!("watchdog: system reset enabled");
    }

    /// Service the watchdog. Must run more often than the timeout.
    #[inline]
    pub fn reset(&self) {
        self.hal.feed();
    }
}
