//! Interrupt vector table.
//!
//! Hardware delivers a [`Vector`]; the table routes it to the driver that
//! owns the source. Drivers then run their single registered callback.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │ Pin change  │────▶│                  │────▶│ Gpio callback   │
//! │ Timer tick  │────▶│  InterruptTable  │────▶│ Timer callback  │
//! └─────────────┘     └──────────────────┘     └─────────────────┘
//! ```
//!
//! The table is filled during setup and read-only afterwards, so
//! [`dispatch`](InterruptTable::dispatch) needs no locking and is safe to
//! call from interrupt context.

use heapless::Vec;
use log::trace;

use crate::app::ports::{Circuit, PinId, Vector};
use crate::error::ConfigError;

/// One slot per pin plus one per hardware counter.
const MAX_VECTORS: usize = PinId::COUNT + Circuit::COUNT;

/// Boxed handler stored in a driver's single callback slot.
pub type Callback<'a> = Box<dyn Fn() + Send + Sync + 'a>;

/// Implemented by every driver that owns an interrupt source.
pub trait IrqHandler: Sync {
    /// Runs in interrupt context: must be short and must not block.
    fn on_interrupt(&self);
}

pub struct InterruptTable<'a> {
    entries: Vec<(Vector, &'a dyn IrqHandler), MAX_VECTORS>,
}

impl Default for InterruptTable<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> InterruptTable<'a> {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Route `vector` to `handler`. Each vector has exactly one owner.
    pub fn attach(&mut self, vector: Vector, handler: &'a dyn IrqHandler) -> Result<(), ConfigError> {
        if self.entries.iter().any(|(v, _)| *v == vector) {
            return Err(ConfigError::VectorInUse);
        }
        self.entries
            .push((vector, handler))
            .map_err(|_| ConfigError::VectorTableFull)
    }

    /// Deliver one interrupt. Returns `false` if nothing is attached.
    pub fn dispatch(&self, vector: Vector) -> bool {
        match self.entries.iter().find(|(v, _)| *v == vector) {
            Some((_, handler)) => {
                handler.on_interrupt();
                true
            }
            None => {
                trace!("irq: spurious {:?}", vector);
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
