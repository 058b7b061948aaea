//! # Hex helpers
//!
//! Payload encoding for logs, the CLI `send` command and test fixtures.
//!
//! ```rust
//! use sx127x_rs::util::hex::{decode_hex, format_hex_compact};
//!
//! let payload = decode_hex("40 11 22 33 44").unwrap();
//! assert_eq!(format_hex_compact(&payload), "40 11 22 33 44");
//! ```

use thiserror::Error;

/// Errors that can occur while parsing hex input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HexError {
    #[error("Odd number of hex characters: {0}")]
    OddLength(usize),

    #[error("Empty hex string")]
    EmptyString,

    #[error("Hex decoding error: {0}")]
    DecodeError(String),
}

/// Encode bytes to an uppercase hex string
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode_upper(data)
}

/// Decode a hex string; whitespace and an optional `0x` prefix are ignored
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>, HexError> {
    let trimmed = hex_str.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let cleaned: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();

    if cleaned.is_empty() {
        return Err(HexError::EmptyString);
    }
    if cleaned.len() % 2 != 0 {
        return Err(HexError::OddLength(cleaned.len()));
    }
    hex::decode(&cleaned).map_err(|e| HexError::DecodeError(e.to_string()))
}

/// Format data as "40 11 22" for compact log lines
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
