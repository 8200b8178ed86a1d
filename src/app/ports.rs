//! Port traits: the boundary between the dispatch framework and hardware.
//!
//! ```text
//!   Board adapter ──▶ Hal / WatchdogHal / AnalogPort ──▶ drivers ──▶ ControlLoop
//! ```
//!
//! Drivers ([`Gpio`](crate::drivers::gpio::Gpio),
//! [`Timer`](crate::drivers::timer::Timer),
//! [`Watchdog`](crate::drivers::watchdog::Watchdog)) only ever touch
//! hardware through these traits. One implementation exists per physical
//! target (`adapters::esp32`) plus the in-memory
//! [`SimBoard`](crate::adapters::sim::SimBoard) used by tests and the host
//! simulator.
//!
//! Every method takes `&self`: the same hardware is reached from the main
//! loop and from interrupt handlers, so implementations provide their own
//! interior mutability (registers, atomics or a critical section).

use serde::{Deserialize, Serialize};

use crate::app::events::AppEvent;
use crate::drivers::timer::CircuitRegistry;
use crate::drivers::watchdog::Timeout;
use crate::error::GpioError;

// ───────────────────────────────────────────────────────────────
// Hardware identities
// ───────────────────────────────────────────────────────────────

/// A validated pin number in the board's hardware address space.
///
/// | Pins   | I/O port |
/// |--------|----------|
/// | 0–7    | D        |
/// | 8–13   | B        |
/// | 14–19  | C        |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinId(u8);

impl PinId {
    /// Number of addressable pins.
    pub const COUNT: usize = 20;

    pub const fn new(number: u8) -> Result<Self, GpioError> {
        if (number as usize) < Self::COUNT {
            Ok(Self(number))
        } else {
            Err(GpioError::InvalidPin(number))
        }
    }

    pub const fn number(self) -> u8 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The I/O port this pin's interrupt mask belongs to.
    pub const fn port(self) -> IoPort {
        match self.0 {
            0..=7 => IoPort::D,
            8..=13 => IoPort::B,
            _ => IoPort::C,
        }
    }
}

/// A group of pins sharing one pin-change interrupt enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoPort {
    B,
    C,
    D,
}

impl IoPort {
    pub const COUNT: usize = 3;
    pub const ALL: [Self; Self::COUNT] = [Self::B, Self::C, Self::D];

    pub const fn index(self) -> usize {
        match self {
            Self::B => 0,
            Self::C => 1,
            Self::D => 2,
        }
    }

    /// Bit for this port in a port-mask register.
    pub const fn mask(self) -> u8 {
        1 << self.index()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Output,
    Input,
    InputPullup,
}

impl Direction {
    pub const fn is_input(self) -> bool {
        matches!(self, Self::Input | Self::InputPullup)
    }
}

/// Hardware timer/counter unit. Scarce: at most one [`Timer`] may own each.
///
/// [`Timer`]: crate::drivers::timer::Timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Circuit {
    Timer0,
    Timer1,
    Timer2,
}

impl Circuit {
    pub const COUNT: usize = 3;
    pub const ALL: [Self; Self::COUNT] = [Self::Timer0, Self::Timer1, Self::Timer2];

    pub const fn index(self) -> usize {
        match self {
            Self::Timer0 => 0,
            Self::Timer1 => 1,
            Self::Timer2 => 2,
        }
    }

    pub const fn mask(self) -> u8 {
        1 << self.index()
    }
}

/// Something whose interrupt can be masked or unmasked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqSource {
    /// Pin-change mask for a single pin.
    Pin(PinId),
    /// Pin-change enable for every pin on a port.
    Port(IoPort),
    /// Tick interrupt of a hardware counter.
    Timer(Circuit),
}

/// An interrupt as delivered by the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vector {
    /// The level of a monitored pin changed.
    PinChange(PinId),
    /// A counter completed one tick (see [`TICK_MS`](crate::drivers::timer::TICK_MS)).
    TimerTick(Circuit),
}

// ───────────────────────────────────────────────────────────────
// Hardware access port
// ───────────────────────────────────────────────────────────────

/// Register-level capability set: configure, read, write, and interrupt
/// mask control.
///
/// A pin-change interrupt is delivered only while **both** its pin mask and
/// its port enable are set. A counter delivers
/// [`Vector::TimerTick`] every tick while its source is enabled.
pub trait Hal: Sync {
    /// Set the pin direction (and pull-up for [`Direction::InputPullup`]).
    fn configure(&self, pin: PinId, direction: Direction);

    /// Electrical level of the pin (`true` = high).
    fn read(&self, pin: PinId) -> bool;

    /// Drive an output pin.
    fn write(&self, pin: PinId, high: bool);

    fn enable_interrupt(&self, source: IrqSource);

    fn disable_interrupt(&self, source: IrqSource);

    /// Ownership ledger for this board's hardware counters.
    fn circuits(&self) -> &CircuitRegistry;
}

// ───────────────────────────────────────────────────────────────
// Watchdog port
// ───────────────────────────────────────────────────────────────

/// The board's single hardware watchdog.
///
/// There is deliberately no `stop()` and no way back from system-reset
/// mode: only a hardware reset disarms it.
pub trait WatchdogHal: Sync {
    /// Whether the watchdog has been started since the last reset.
    fn is_running(&self) -> bool;

    /// Start counting in interrupt-only mode with the given timeout.
    fn start(&self, timeout: Timeout);

    /// Commit to a full system reset on timeout.
    fn enable_system_reset(&self);

    /// Restart the timeout window.
    fn feed(&self);
}

// ───────────────────────────────────────────────────────────────
// Analog input port (ADC)
// ───────────────────────────────────────────────────────────────

pub trait AnalogPort: Sync {
    /// Latest conversion on `channel` as a fraction of full scale, `0.0..=1.0`.
    fn duty_cycle(&self, channel: u8) -> f64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (serial console, telemetry)
// ───────────────────────────────────────────────────────────────

/// The control loop reports everything it does through this port.
/// Called from interrupt context, always inside a critical section, so
/// implementations must not block.
pub trait EventSink: Send {
    fn emit(&mut self, event: &AppEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pins_map_to_ports() {
        assert_eq!(PinId::new(0).unwrap().port(), IoPort::D);
        assert_eq!(PinId::new(7).unwrap().port(), IoPort::D);
        assert_eq!(PinId::new(9).unwrap().port(), IoPort::B);
        assert_eq!(PinId::new(13).unwrap().port(), IoPort::B);
        assert_eq!(PinId::new(14).unwrap().port(), IoPort::C);
        assert_eq!(PinId::new(19).unwrap().port(), IoPort::C);
    }

    #[test]
    fn out_of_range_pin_rejected() {
        assert_eq!(PinId::new(20), Err(GpioError::InvalidPin(20)));
        assert_eq!(PinId::new(255), Err(GpioError::InvalidPin(255)));
    }

    #[test]
    fn masks_are_distinct() {
        let ports: u8 = IoPort::ALL.iter().map(|p| p.mask()).sum();
        let circuits: u8 = Circuit::ALL.iter().map(|c| c.mask()).sum();
        assert_eq!(ports, 0b111);
        assert_eq!(circuits, 0b111);
    }
}
