//! Button debounce state machine.
//!
//! ```text
//!             pin change (port masked, timer started, edge dispatched)
//!   ┌──────┐ ─────────────────────────────────────────────▶ ┌──────────┐
//!   │ Idle │                                                 │ Settling │
//!   └──────┘ ◀───────────────────────────────────────────── └──────────┘
//!             debounce elapsed (timer stopped, port unmasked)
//! ```
//!
//! While settling, every pin-change interrupt on the button's I/O port is
//! masked, so contact bounce cannot reach the handler. The pin-change
//! handler is the only place the debounce timer is started and the timer
//! handler is the only place the port is unmasked.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::trace;

use crate::app::events::Edge;
use crate::app::ports::Hal;
use crate::drivers::gpio::Gpio;
use crate::drivers::timer::Timer;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    /// Port interrupts enabled, debounce timer stopped.
    Idle,
    /// Port interrupts masked, debounce timer running.
    Settling,
}

type EdgeHandler<'a> = Box<dyn Fn(Edge) + Send + Sync + 'a>;

pub struct Debouncer<'a, H: Hal> {
    button: &'a Gpio<'a, H>,
    timer: &'a Timer<'a, H>,
    settling: AtomicBool,
    on_edge: EdgeHandler<'a>,
}

impl<'a, H: Hal> Debouncer<'a, H> {
    /// `on_edge` runs in interrupt context once per debounced transition.
    pub fn new(
        button: &'a Gpio<'a, H>,
        timer: &'a Timer<'a, H>,
        on_edge: impl Fn(Edge) + Send + Sync + 'a,
    ) -> Self {
        Self {
            button,
            timer,
            settling: AtomicBool::new(false),
            on_edge: Box::new(on_edge),
        }
    }

    /// Register the pin-change and elapse handlers. Fails if either
    /// device already has a handler.
    pub fn attach(self: &Arc<Self>) -> Result<(), Error> {
        let this = Arc::clone(self);
        self.button.add_callback(move || this.on_pin_change())?;
        let this = Arc::clone(self);
        self.timer.add_callback(move || this.on_settled())?;
        Ok(())
    }

    pub fn state(&self) -> DebounceState {
        if self.settling.load(Ordering::Acquire) {
            DebounceState::Settling
        } else {
            DebounceState::Idle
        }
    }

    /// Idle → Settling.
    fn on_pin_change(&self) {
        if self.settling.swap(true, Ordering::AcqRel) {
            trace!("debounce: edge while settling ignored");
            return;
        }
        self.button.disable_interrupts_on_io_port();
        self.timer.start();
        let edge = if self.button.read() {
            Edge::Press
        } else {
            Edge::Release
        };
        trace!("debounce: {:?}", edge);
        (self.on_edge)(edge);
    }

    /// Settling → Idle.
    fn on_settled(&self) {
        self.timer.stop();
        self.settling.store(false, Ordering::Release);
        self.button.enable_interrupts_on_io_port();
    }
}
