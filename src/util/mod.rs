//! # Utility Modules
//!
//! Hex encoding for payload display and parsing, and rate-limited logging
//! for the packet loop.

pub mod hex;
pub mod logging;

pub use hex::{decode_hex, encode_hex, format_hex_compact, HexError};
pub use logging::{log_payload_hex, LogThrottle, ThrottleStats};
