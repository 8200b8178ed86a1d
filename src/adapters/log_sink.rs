//! Log-based event sink adapter.
//!
//! Renders every [`AppEvent`] as one console line through the `log`
//! facade, which reaches UART / USB-CDC on the board and stderr on the
//! host simulator.

use log::{error, info};

use crate::app::events::{AppEvent, Trigger};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started {
                prediction_period_ms,
                watchdog_timeout_ms,
            } => {
                info!(
                    "START | prediction every {} ms | watchdog {} ms",
                    prediction_period_ms, watchdog_timeout_ms
                );
            }
            AppEvent::ModelFit(fit) => {
                let line: Vec<String> = fit.iter().map(i32::to_string).collect();
                info!("MODEL | {}", line.join(" "));
            }
            AppEvent::TrainingFailed => {
                error!("MODEL | training failed");
            }
            AppEvent::ButtonPressed => {
                info!("INPUT | button pressed");
            }
            AppEvent::ButtonReleased => {
                info!("INPUT | button released");
            }
            AppEvent::Prediction {
                trigger,
                voltage,
                celsius,
            } => {
                let source = match trigger {
                    Trigger::Button => "button",
                    Trigger::Periodic => "periodic",
                };
                info!(
                    "PREDICT | {} | U={:.3}V | T={:.1}\u{00b0}C",
                    source, voltage, celsius
                );
            }
        }
    }
}
