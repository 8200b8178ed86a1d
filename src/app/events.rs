//! Outbound application events.
//!
//! The control loop emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them: print to the serial console, record them
//! in a test, etc.

/// What caused a prediction to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Debounced button press.
    Button,
    /// The periodic prediction timer elapsed.
    Periodic,
}

/// Direction of a debounced button transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Press,
    Release,
}

/// Structured events emitted by the control loop.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Setup completed; interrupts are live and the watchdog is armed.
    Started {
        prediction_period_ms: u32,
        watchdog_timeout_ms: u32,
    },

    /// Model output for every training input, rounded half away from zero.
    ModelFit(Vec<i32>),

    /// The model failed to train; setup was aborted.
    TrainingFailed,

    ButtonPressed,

    ButtonReleased,

    /// A temperature prediction was made.
    Prediction {
        trigger: Trigger,
        voltage: f64,
        celsius: f64,
    },
}
