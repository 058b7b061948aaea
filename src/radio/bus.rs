//! # Register access layer
//!
//! Every SX127x register transaction is exactly two bytes with chip select
//! held low for the duration:
//!
//! ```text
//! read:  MOSI [addr & 0x7F, 0x00]   MISO [--, value]
//! write: MOSI [addr | 0x80, value]  MISO [--, --]
//! ```
//!
//! This layer only frames bytes. It never interprets register contents and
//! only reports bus faults.

use crate::radio::hal::{Hal, HalError, Pin};

/// Write flag in the address byte
pub const WRITE_FLAG: u8 = 0x80;

/// Framed register access over a [`Hal`]
#[derive(Debug)]
pub struct RegisterBus<H: Hal> {
    hal: H,
}

impl<H: Hal> RegisterBus<H> {
    pub fn new(hal: H) -> Self {
        Self { hal }
    }

    /// Read one register
    pub fn read_register(&mut self, addr: u8) -> Result<u8, HalError> {
        let value = self.exchange([addr & 0x7F, 0x00])?;
        log::trace!("R 0x{:02X} -> 0x{:02X}", addr & 0x7F, value);
        Ok(value)
    }

    /// Write one register
    pub fn write_register(&mut self, addr: u8, value: u8) -> Result<(), HalError> {
        self.exchange([addr | WRITE_FLAG, value])?;
        log::trace!("W 0x{:02X} <- 0x{:02X}", addr & 0x7F, value);
        Ok(())
    }

    /// Chip select is released even when the transfer fails
    fn exchange(&mut self, frame: [u8; 2]) -> Result<u8, HalError> {
        let mut buf = frame;
        self.hal.gpio_write(Pin::ChipSelect, false)?;
        let transferred = self.hal.transfer(&mut buf);
        let released = self.hal.gpio_write(Pin::ChipSelect, true);
        transferred?;
        released?;
        Ok(buf[1])
    }

    pub fn set_pin(&mut self, pin: Pin, high: bool) -> Result<(), HalError> {
        self.hal.gpio_write(pin, high)
    }

    pub fn delay_ms(&mut self, ms: u32) {
        self.hal.delay_ms(ms);
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    pub fn into_inner(self) -> H {
        self.hal
    }
}
