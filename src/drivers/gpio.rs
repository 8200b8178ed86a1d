//! GPIO pin driver with a single-slot pin-change interrupt handler.
//!
//! ## Interrupt masking
//!
//! A pin-change interrupt needs two enables: the pin's own mask and the
//! enable of the I/O port it sits on. [`Gpio::enable_interrupt`] sets both.
//! The port-level calls deliberately affect **every** pin on the port, so a
//! handler can quiesce the whole port during a sensitive window (debounce)
//! without knowing which other pins share it.
//!
//! ## Logical level
//!
//! [`Gpio::read`] reports the asserted state: for [`Direction::InputPullup`]
//! a pin pulled low (button pressed) reads `true`. The `embedded-hal`
//! impls report raw electrical levels instead.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};
use log::debug;

use crate::app::ports::{Direction, Hal, IoPort, IrqSource, PinId};
use crate::error::GpioError;
use crate::interrupts::{Callback, IrqHandler};

pub struct Gpio<'a, H: Hal> {
    hal: &'a H,
    pin: PinId,
    direction: Direction,
    callback: OnceLock<Callback<'a>>,
    irq_enabled: AtomicBool,
}

impl<'a, H: Hal> Gpio<'a, H> {
    /// Bind `pin` with a fixed direction. Fails if the pin is outside the
    /// hardware range.
    pub fn new(hal: &'a H, pin: u8, direction: Direction) -> Result<Self, GpioError> {
        let pin = PinId::new(pin)?;
        hal.configure(pin, direction);
        debug!("gpio: pin {} configured as {:?}", pin.number(), direction);
        Ok(Self {
            hal,
            pin,
            direction,
            callback: OnceLock::new(),
            irq_enabled: AtomicBool::new(false),
        })
    }

    pub fn pin(&self) -> PinId {
        self.pin
    }

    pub fn io_port(&self) -> IoPort {
        self.pin.port()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Logical level; see the module docs for pull-up inversion.
    pub fn read(&self) -> bool {
        let raw = self.hal.read(self.pin);
        match self.direction {
            Direction::InputPullup => !raw,
            Direction::Input | Direction::Output => raw,
        }
    }

    pub fn set(&self) -> Result<(), GpioError> {
        self.drive(true)
    }

    pub fn clear(&self) -> Result<(), GpioError> {
        self.drive(false)
    }

    pub fn toggle(&self) -> Result<(), GpioError> {
        self.drive(!self.hal.read(self.pin))
    }

    fn drive(&self, high: bool) -> Result<(), GpioError> {
        if self.direction != Direction::Output {
            return Err(GpioError::NotAnOutput(self.pin.number()));
        }
        self.hal.write(self.pin, high);
        Ok(())
    }

    /// Register the pin-change handler. Only one handler per pin; a second
    /// registration is rejected and the first stays in place.
    pub fn add_callback(&self, callback: impl Fn() + Send + Sync + 'a) -> Result<(), GpioError> {
        self.callback
            .set(Box::new(callback))
            .map_err(|_| GpioError::CallbackAlreadyRegistered(self.pin.number()))
    }

    pub fn has_callback(&self) -> bool {
        self.callback.get().is_some()
    }

    /// Unmask this pin and enable its port. Requires a registered handler.
    pub fn enable_interrupt(&self) -> Result<(), GpioError> {
        if !self.has_callback() {
            return Err(GpioError::NoCallback(self.pin.number()));
        }
        self.hal.enable_interrupt(IrqSource::Pin(self.pin));
        self.hal.enable_interrupt(IrqSource::Port(self.pin.port()));
        self.irq_enabled.store(true, Ordering::Release);
        debug!("gpio: pin {} interrupt enabled", self.pin.number());
        Ok(())
    }

    /// Mask this pin only; other pins on the port are unaffected.
    pub fn disable_interrupt(&self) {
        self.hal.disable_interrupt(IrqSource::Pin(self.pin));
        self.irq_enabled.store(false, Ordering::Release);
    }

    pub fn is_interrupt_enabled(&self) -> bool {
        self.irq_enabled.load(Ordering::Acquire)
    }

    /// Mask pin-change interrupts for every pin on this pin's port.
    pub fn disable_interrupts_on_io_port(&self) {
        self.hal.disable_interrupt(IrqSource::Port(self.pin.port()));
    }

    /// Re-enable pin-change interrupts for every pin on this pin's port.
    pub fn enable_interrupts_on_io_port(&self) {
        self.hal.enable_interrupt(IrqSource::Port(self.pin.port()));
    }
}

impl<H: Hal> IrqHandler for Gpio<'_, H> {
    fn on_interrupt(&self) {
        if let Some(callback) = self.callback.get() {
            callback();
        }
    }
}

// ── embedded-hal 1.0 ──────────────────────────────────────────

impl<H: Hal> ErrorType for Gpio<'_, H> {
    type Error = GpioError;
}

impl<H: Hal> InputPin for Gpio<'_, H> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.hal.read(self.pin))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.hal.read(self.pin))
    }
}

impl<H: Hal> OutputPin for Gpio<'_, H> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.clear()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set()
    }
}

impl<H: Hal> StatefulOutputPin for Gpio<'_, H> {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.hal.read(self.pin))
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.hal.read(self.pin))
    }
}
