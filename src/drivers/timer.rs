//! Software timer on top of a hardware counter tick.
//!
//! Each [`Timer`] owns one hardware counter ([`Circuit`]). While running,
//! the counter raises a tick interrupt every [`TICK_MS`]; the timer counts
//! ticks and invokes its callback each time `period_ms` has elapsed, then
//! starts counting again. The callback runs in interrupt context.
//!
//! ## Ordering
//!
//! `start()` zeroes the count and marks the timer running *before*
//! unmasking the tick interrupt; `stop()` masks the tick *before* clearing
//! the running flag. A tick can therefore never observe a half-updated
//! timer, and `start()`/`stop()` are safe to call from the timer's own
//! callback.

use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};
use std::sync::OnceLock;

use log::{debug, trace};

use crate::app::ports::{Circuit, Hal, IrqSource};
use crate::error::TimerError;
use crate::interrupts::{Callback, IrqHandler};

/// Interval between counter tick interrupts.
pub const TICK_MS: u32 = 1;

/// Ownership ledger for a board's hardware counters.
///
/// Lives inside each [`Hal`] implementation because the counters are a
/// property of the physical board, not of any one timer.
#[derive(Debug, Default)]
pub struct CircuitRegistry {
    claimed: AtomicU8,
}

impl CircuitRegistry {
    pub const fn new() -> Self {
        Self {
            claimed: AtomicU8::new(0),
        }
    }

    pub fn claim(&self, circuit: Circuit) -> Result<(), TimerError> {
        let previous = self.claimed.fetch_or(circuit.mask(), Ordering::AcqRel);
        if previous & circuit.mask() != 0 {
            return Err(TimerError::CircuitInUse(circuit));
        }
        Ok(())
    }

    pub fn release(&self, circuit: Circuit) {
        self.claimed.fetch_and(!circuit.mask(), Ordering::AcqRel);
    }

    /// Power-on state: every counter free.
    pub fn release_all(&self) {
        self.claimed.store(0, Ordering::Release);
    }

    pub fn is_claimed(&self, circuit: Circuit) -> bool {
        self.claimed.load(Ordering::Acquire) & circuit.mask() != 0
    }
}

pub struct Timer<'a, H: Hal> {
    hal: &'a H,
    circuit: Circuit,
    period_ms: u32,
    running: AtomicBool,
    elapsed_ms: AtomicU32,
    callback: OnceLock<Callback<'a>>,
}

impl<'a, H: Hal> Timer<'a, H> {
    /// Claim `circuit` for a timer with the given period. Fails if another
    /// timer owns the circuit or the period is zero.
    pub fn new(hal: &'a H, circuit: Circuit, period_ms: u32) -> Result<Self, TimerError> {
        if period_ms == 0 {
            return Err(TimerError::ZeroPeriod);
        }
        hal.circuits().claim(circuit)?;
        hal.disable_interrupt(IrqSource::Timer(circuit));
        debug!("timer: {:?} claimed, period {} ms", circuit, period_ms);
        Ok(Self {
            hal,
            circuit,
            period_ms,
            running: AtomicBool::new(false),
            elapsed_ms: AtomicU32::new(0),
            callback: OnceLock::new(),
        })
    }

    pub fn circuit(&self) -> Circuit {
        self.circuit
    }

    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Milliseconds counted since the last start or elapse.
    pub fn elapsed_ms(&self) -> u32 {
        self.elapsed_ms.load(Ordering::Acquire)
    }

    /// Arm the countdown from zero. Restarts a running timer.
    pub fn start(&self) {
        critical_section::with(|_| {
            self.elapsed_ms.store(0, Ordering::Release);
            self.running.store(true, Ordering::Release);
            self.hal.enable_interrupt(IrqSource::Timer(self.circuit));
        });
        trace!("timer: {:?} started", self.circuit);
    }

    /// Disarm. No-op when already stopped.
    pub fn stop(&self) {
        critical_section::with(|_| {
            self.hal.disable_interrupt(IrqSource::Timer(self.circuit));
            self.running.store(false, Ordering::Release);
            self.elapsed_ms.store(0, Ordering::Release);
        });
        trace!("timer: {:?} stopped", self.circuit);
    }

    /// Register the elapse handler. Only one per timer.
    pub fn add_callback(&self, callback: impl Fn() + Send + Sync + 'a) -> Result<(), TimerError> {
        self.callback
            .set(Box::new(callback))
            .map_err(|_| TimerError::CallbackAlreadyRegistered(self.circuit))
    }

    /// Counter tick handler.
    fn on_tick(&self) {
        if !self.is_running() {
            return;
        }
        let elapsed = self.elapsed_ms.fetch_add(TICK_MS, Ordering::AcqRel) + TICK_MS;
        if elapsed < self.period_ms {
            return;
        }
        // Reset before the callback so a restart from inside it sticks.
        self.elapsed_ms.store(0, Ordering::Release);
        if let Some(callback) = self.callback.get() {
            callback();
        }
    }
}

impl<H: Hal> IrqHandler for Timer<'_, H> {
    fn on_interrupt(&self) {
        self.on_tick();
    }
}

impl<H: Hal> Drop for Timer<'_, H> {
    fn drop(&mut self) {
        self.hal.disable_interrupt(IrqSource::Timer(self.circuit));
        self.hal.circuits().release(self.circuit);
    }
}
