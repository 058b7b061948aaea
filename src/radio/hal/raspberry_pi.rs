//! # Raspberry Pi HAL Implementation
//!
//! Hardware abstraction layer for SX1272/SX1276 modules wired to a Raspberry Pi
//! 40-pin header, using the rppal crate for SPI and GPIO access.
//!
//! ## Hardware Setup
//!
//! ```text
//! Pi Pin │ BCM GPIO │ SX127x Pin │ Function
//! ───────┼──────────┼────────────┼─────────────
//! 19     │ GPIO 10  │ MOSI       │ SPI data out
//! 21     │ GPIO 9   │ MISO       │ SPI data in
//! 23     │ GPIO 11  │ SCK        │ SPI clock
//! 22     │ GPIO 25  │ NSS        │ Chip select (driven as GPIO)
//! 11     │ GPIO 17  │ NRESET     │ Reset (active low)
//! ```
//!
//! NSS is driven as a plain GPIO so the driver controls the exact framing of
//! each two-byte register exchange. The hardware CE line of the selected bus
//! may be left unconnected.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use sx127x_rs::radio::hal::raspberry_pi::{GpioPins, RaspberryPiHal};
//! use sx127x_rs::radio::Sx127xDriver;
//!
//! let hal = RaspberryPiHal::new(0, 1_000_000, &GpioPins::default())?;
//! let mut radio = Sx127xDriver::new(hal);
//! radio.power_on()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::radio::hal::{Hal, HalError, Pin};
use rppal::gpio::{Gpio, OutputPin};
use rppal::spi::{BitOrder, Bus, Error as SpiError, Mode, SlaveSelect, Spi};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Errors specific to Raspberry Pi HAL construction
#[derive(Error, Debug)]
pub enum RpiHalError {
    /// SPI bus initialization failed
    #[error("SPI initialization failed: {0}")]
    SpiInit(#[from] SpiError),
    /// GPIO initialization failed
    #[error("GPIO initialization failed: {0}")]
    GpioInit(#[from] rppal::gpio::Error),
    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// GPIO pin assignment, BCM numbering
#[derive(Debug, Clone)]
pub struct GpioPins {
    /// NSS (output) - chip select, active low
    pub chip_select: u8,
    /// NRESET (output) - radio reset, active low
    pub reset: u8,
}

impl Default for GpioPins {
    /// Wiring used by the common single-channel gateway boards
    fn default() -> Self {
        Self {
            chip_select: 25, // GPIO 25 (Pin 22)
            reset: 17,       // GPIO 17 (Pin 11)
        }
    }
}

/// Raspberry Pi HAL for SX127x radios
pub struct RaspberryPiHal {
    spi: Spi,
    chip_select: OutputPin,
    reset: OutputPin,
    bus_info: String,
}

impl RaspberryPiHal {
    /// Open SPI bus `spi_bus` (0 or 1) at `clock_hz` and claim the control pins.
    ///
    /// The SX127x accepts SPI mode 0, MSB first, up to 10 MHz.
    pub fn new(spi_bus: u8, clock_hz: u32, gpio_pins: &GpioPins) -> Result<Self, RpiHalError> {
        let bus = match spi_bus {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            _ => {
                return Err(RpiHalError::InvalidConfig(format!(
                    "Invalid SPI bus {spi_bus}, only 0 and 1 are supported"
                )))
            }
        };
        if clock_hz == 0 || clock_hz > 10_000_000 {
            return Err(RpiHalError::InvalidConfig(format!(
                "SPI clock {clock_hz} Hz outside 1..=10 MHz"
            )));
        }

        let spi = Spi::new(bus, SlaveSelect::Ss0, clock_hz, Mode::Mode0)?;
        spi.set_bit_order(BitOrder::MsbFirst)?;

        let gpio = Gpio::new()?;
        let mut chip_select = gpio.get(gpio_pins.chip_select)?.into_output();
        chip_select.set_high();
        let mut reset = gpio.get(gpio_pins.reset)?.into_output();
        reset.set_high();

        let bus_info = format!("SPI{spi_bus} @ {clock_hz} Hz");
        log::info!("Raspberry Pi HAL initialized:");
        log::info!("  SPI: {}", bus_info);
        log::info!("  NSS: GPIO {}", gpio_pins.chip_select);
        log::info!("  RESET: GPIO {}", gpio_pins.reset);

        Ok(Self {
            spi,
            chip_select,
            reset,
            bus_info,
        })
    }

    /// Human readable bus description for diagnostics
    pub fn bus_info(&self) -> &str {
        &self.bus_info
    }
}

impl Hal for RaspberryPiHal {
    fn transfer(&mut self, buf: &mut [u8]) -> Result<(), HalError> {
        let write = buf.to_vec();
        match self.spi.transfer(buf, &write) {
            Ok(_) => {
                log::trace!("SPI {:02X?} -> {:02X?}", write, buf);
                Ok(())
            }
            Err(e) => {
                log::error!("SPI transfer failed: {}", e);
                Err(HalError::Spi(e.to_string()))
            }
        }
    }

    fn gpio_write(&mut self, pin: Pin, high: bool) -> Result<(), HalError> {
        let out = match pin {
            Pin::ChipSelect => &mut self.chip_select,
            Pin::Reset => &mut self.reset,
        };
        if high {
            out.set_high();
        } else {
            out.set_low();
        }
        Ok(())
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}
