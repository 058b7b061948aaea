//! # sx127x-rs - A Rust driver for Semtech SX1272/SX1276 LoRa transceivers
//!
//! The sx127x-rs crate drives the SX127x family over its SPI register
//! protocol and turns it into a small, verifiable radio state machine:
//! boot and image calibration, modulation setup, and timed transmit and
//! receive cycles with link-quality reporting.
//!
//! ## Features
//!
//! - SX1272 (version `0x22`) and SX1276 (version `0x12`) with their
//!   different register bit layouts
//! - Every setter reads back and verifies what it wrote
//! - LoRa and FSK packet cycles with bounded, exact timeouts
//! - SNR/RSSI with band-dependent correction
//! - `MockHal` register-file simulator for tests and dry runs
//! - Raspberry Pi backend over `rppal` (feature `raspberry-pi`)
//! - Single-channel gateway loop with a downlink queue
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! sx127x-rs = "0.1.0"
//! ```
//!
//! ```rust
//! use sx127x_rs::radio::{MockHal, ModemSettings, Sx127xDriver, TxRequest};
//!
//! let mut radio = Sx127xDriver::new(MockHal::sx1276());
//! let report = radio.power_on()?;
//! println!("{} up, {} warning(s)", report.variant, report.warnings.len());
//!
//! radio.configure(&ModemSettings::default())?;
//! radio.send(&TxRequest::new(b"hello".to_vec()))?;
//! # Ok::<(), sx127x_rs::RadioError>(())
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod forwarder;
pub mod logging;
pub mod radio;
pub mod util;

pub use crate::config::{ConfigError, RadioConfig};
pub use crate::error::RadioError;
pub use crate::logging::{init_logger, init_logger_with_level, log_info};

pub use forwarder::{ForwarderStats, PacketForwarder, UplinkSink};
pub use radio::{
    BootReport, CrcStatus, ModemSettings, Radio, RadioState, RxPacket, Sx127xDriver, TxRequest,
    Variant,
};
