//! # SX127x radio driver
//!
//! Register-level driver for the Semtech SX1272 and SX1276 transceivers.
//!
//! ## Modules
//!
//! - [`hal`]: SPI/GPIO abstraction with the `MockHal` simulator and the
//!   Raspberry Pi backend
//! - [`bus`]: two-byte register framing
//! - [`registers`]: addresses, mode values and bit fields
//! - [`variant`]: SX1272/SX1276 bit layouts
//! - [`modulation`]: spreading factor, bandwidth, coding rate, presets
//! - [`driver`]: `Sx127xDriver`, state mirror and mode controller
//! - [`boot`], [`modem`], [`packet`], [`link_quality`]: driver operations
//! - [`radio_driver`]: the `Radio` trait and packet types

pub mod boot;
pub mod bus;
pub mod driver;
pub mod hal;
pub mod link_quality;
pub mod modem;
pub mod modulation;
pub mod packet;
pub mod radio_driver;
pub mod registers;
pub mod variant;

pub use boot::{BootReport, BootStep, BootWarning};
pub use driver::{DriverOptions, PowerSetting, RadioState, Sx127xDriver};
pub use hal::{Hal, HalError, MockHal, Pin, SimulatedPacket};
pub use modulation::{
    Bandwidth, CodingRate, HeaderMode, LoRaPreset, ModemSettings, ModulationFamily,
    SpreadingFactor,
};
pub use radio_driver::{CrcStatus, Radio, RxPacket, TxRequest};
pub use variant::Variant;

use crate::error::Result;

impl<H: Hal> Radio for Sx127xDriver<H> {
    fn name(&self) -> &str {
        self.state.variant.map_or("SX127x", Variant::name)
    }

    fn power_on(&mut self) -> Result<BootReport> {
        Sx127xDriver::power_on(self)
    }

    fn power_off(&mut self) -> Result<()> {
        Sx127xDriver::power_off(self)
    }

    fn configure(&mut self, settings: &ModemSettings) -> Result<()> {
        Sx127xDriver::configure(self, settings)
    }

    fn send(&mut self, request: &TxRequest) -> Result<()> {
        Sx127xDriver::send(self, request)
    }

    fn receive(&mut self, timeout_ms: u32) -> Result<RxPacket> {
        Sx127xDriver::receive(self, timeout_ms)
    }
}
