//! # Hardware Abstraction Layer for SX127x Radios
//!
//! The SX127x is driven over a plain SPI bus with a GPIO-controlled chip select
//! and an active-low reset line. This module defines the small set of
//! primitives the driver needs from a platform: a full-duplex byte exchange,
//! GPIO output control and a blocking millisecond delay.
//!
//! Two implementations ship with the crate:
//!
//! - [`MockHal`]: an in-memory register file used by the test suite and the
//!   CLI `--simulate` mode
//! - `RaspberryPiHal`: rppal-backed SPI/GPIO access (feature `raspberry-pi`)

use thiserror::Error;

/// Errors that can occur during HAL operations
#[derive(Debug, Error)]
pub enum HalError {
    #[error("SPI communication error: {0}")]
    Spi(String),

    #[error("GPIO operation error: {0}")]
    Gpio(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Output lines the driver toggles besides the SPI data lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pin {
    /// NSS, active low for the duration of one register exchange
    ChipSelect,
    /// NRESET, active low
    Reset,
}

/// Hardware Abstraction Layer trait for SX127x radio control
pub trait Hal {
    /// Exchange `buf.len()` bytes full-duplex; received bytes replace `buf`.
    ///
    /// Chip select is driven separately through [`Hal::gpio_write`].
    fn transfer(&mut self, buf: &mut [u8]) -> Result<(), HalError>;

    /// Drive an output pin high (`true`) or low (`false`)
    fn gpio_write(&mut self, pin: Pin, high: bool) -> Result<(), HalError>;

    /// Block the calling thread for `ms` milliseconds
    fn delay_ms(&mut self, ms: u32);
}

impl<H: Hal + ?Sized> Hal for Box<H> {
    fn transfer(&mut self, buf: &mut [u8]) -> Result<(), HalError> {
        (**self).transfer(buf)
    }

    fn gpio_write(&mut self, pin: Pin, high: bool) -> Result<(), HalError> {
        (**self).gpio_write(pin, high)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}

pub mod mock;

// Platform implementations
#[cfg(feature = "raspberry-pi")]
pub mod raspberry_pi;

pub use mock::{BusOp, MockHal, SimulatedPacket};

#[cfg(feature = "raspberry-pi")]
pub use raspberry_pi::{GpioPins, RaspberryPiHal, RpiHalError};
