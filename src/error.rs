//! Unified error types for the tempredict firmware.
//!
//! Every fallible setup step funnels into [`Error`], so `main()` can treat
//! the whole configuration phase uniformly: any error halts initialisation
//! before the watchdog is armed. All variants are `Copy`; nothing here ever
//! crosses an interrupt boundary (handlers return `()`).

use core::fmt;

use crate::app::ports::Circuit;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A GPIO pin was misconfigured or misused.
    Gpio(GpioError),
    /// A software timer could not be constructed or wired.
    Timer(TimerError),
    /// The watchdog supervisor could not be armed.
    Watchdog(WatchdogError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// The prediction model reported a training failure.
    Training,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpio(e) => write!(f, "gpio: {e}"),
            Self::Timer(e) => write!(f, "timer: {e}"),
            Self::Watchdog(e) => write!(f, "watchdog: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Training => write!(f, "model training failed"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// GPIO errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioError {
    /// Pin number outside the board's hardware address space.
    InvalidPin(u8),
    /// `set`/`clear`/`toggle` on a pin not configured as an output.
    NotAnOutput(u8),
    /// A handler is already registered on this pin.
    CallbackAlreadyRegistered(u8),
    /// Interrupts requested before any handler was registered.
    NoCallback(u8),
}

impl fmt::Display for GpioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPin(pin) => write!(f, "pin {pin} is out of range"),
            Self::NotAnOutput(pin) => write!(f, "pin {pin} is not an output"),
            Self::CallbackAlreadyRegistered(pin) => {
                write!(f, "pin {pin} already has an interrupt handler")
            }
            Self::NoCallback(pin) => {
                write!(f, "pin {pin} has no handler; register one before enabling interrupts")
            }
        }
    }
}

impl embedded_hal::digital::Error for GpioError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

impl From<GpioError> for Error {
    fn from(e: GpioError) -> Self {
        Self::Gpio(e)
    }
}

// ---------------------------------------------------------------------------
// Timer errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// Another timer instance already owns this hardware counter.
    CircuitInUse(Circuit),
    /// A period of zero milliseconds can never elapse.
    ZeroPeriod,
    /// A handler is already registered on this timer.
    CallbackAlreadyRegistered(Circuit),
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CircuitInUse(c) => write!(f, "circuit {c:?} is already claimed"),
            Self::ZeroPeriod => write!(f, "period must be at least 1 ms"),
            Self::CallbackAlreadyRegistered(c) => {
                write!(f, "circuit {c:?} already has an elapse handler")
            }
        }
    }
}

impl From<TimerError> for Error {
    fn from(e: TimerError) -> Self {
        Self::Timer(e)
    }
}

// ---------------------------------------------------------------------------
// Watchdog errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogError {
    /// The hardware watchdog is already running; it only stops on reset.
    AlreadyInitialized,
}

impl fmt::Display for WatchdogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInitialized => write!(f, "already initialised"),
        }
    }
}

impl From<WatchdogError> for Error {
    fn from(e: WatchdogError) -> Self {
        Self::Watchdog(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Config text could not be deserialised.
    Parse,
    /// Two handlers were attached to the same interrupt vector.
    VectorInUse,
    /// The interrupt vector table has no free slots.
    VectorTableFull,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::Parse => write!(f, "malformed config"),
            Self::VectorInUse => write!(f, "interrupt vector already attached"),
            Self::VectorTableFull => write!(f, "interrupt vector table full"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
