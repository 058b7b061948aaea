//! # Radio Error Handling
//!
//! This module defines the `RadioError` enum returned by every driver
//! operation. Errors are values: bus faults, verification mismatches,
//! timeouts and CRC failures are distinct variants so callers can decide
//! whether to retry, count towards a retry budget, or give up.

use crate::radio::hal::HalError;
use crate::radio::RxPacket;
use thiserror::Error;

/// Represents the different error types that can occur in the SX127x driver.
#[derive(Debug, Error)]
pub enum RadioError {
    /// The SPI exchange or a GPIO write failed.
    #[error("Transport error: {0}")]
    Transport(#[from] HalError),

    /// `RegVersion` matched neither the SX1272 nor the SX1276.
    #[error("Unsupported chip version: 0x{version:02X}")]
    UnsupportedChip { version: u8 },

    /// A register read back a different value than was written.
    #[error("Verification failed for {setting}: expected 0x{expected:X}, read back 0x{actual:X}")]
    Verification {
        setting: &'static str,
        expected: u32,
        actual: u32,
    },

    /// No completion flag was observed within the bound.
    #[error("Timeout waiting for {operation} after {waited_ms} ms")]
    Timeout {
        operation: &'static str,
        waited_ms: u32,
    },

    /// A packet was received but the hardware flagged its payload CRC.
    #[error("Payload CRC error ({} bytes received)", .0.payload.len())]
    BadCrc(Box<RxPacket>),

    /// The request was rejected before any register access.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// LoRa mode could not be confirmed within the attempt ceiling.
    #[error("Could not enter LoRa mode after {attempts} attempts")]
    ModeSwitch { attempts: u32 },

    /// The operation only exists in LoRa mode.
    #[error("{operation} is not available in FSK mode")]
    NotApplicable { operation: &'static str },

    /// The chip has not completed `power_on`.
    #[error("Radio is not powered on")]
    NotPoweredOn,
}

impl RadioError {
    /// Whether the error indicates a bus fault rather than a chip response
    pub fn is_transport(&self) -> bool {
        matches!(self, RadioError::Transport(_))
    }
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, RadioError>;
