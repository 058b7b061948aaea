//! # Radio capability trait and packet types
//!
//! [`Radio`] is the contract the packet forwarder (and any other collaborator)
//! programs against. It hides the register protocol behind five operations:
//! power on, power off, configure, send and receive.

use crate::constants::DEFAULT_TX_TIMEOUT_MS;
use crate::error::Result;
use crate::radio::boot::BootReport;
use crate::radio::modulation::ModemSettings;
use serde::{Deserialize, Serialize};

/// Payload CRC outcome as evaluated by the chip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrcStatus {
    /// CRC present and correct
    Ok,
    /// CRC present and wrong
    Bad,
    /// Transmitter sent no CRC; the payload is trusted as received
    Absent,
}

/// A received packet with link-quality metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RxPacket {
    pub payload: Vec<u8>,
    /// Packet RSSI in dBm (LoRa only)
    pub rssi: Option<i16>,
    /// Raw `RegPktSnrValue`, signed quarter-dB (LoRa only)
    pub snr: Option<i8>,
    pub crc_status: CrcStatus,
}

impl RxPacket {
    /// SNR in whole dB, rounded towards zero
    pub fn snr_db(&self) -> Option<i8> {
        self.snr
            .map(|quarter| crate::radio::link_quality::snr_from_register(quarter as u8))
    }
}

/// Payload plus completion bound for one transmission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub payload: Vec<u8>,
    pub timeout_ms: u32,
}

impl TxRequest {
    /// Request with the default 10 s completion bound
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            timeout_ms: DEFAULT_TX_TIMEOUT_MS,
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Operations every radio backend offers to the application layer
pub trait Radio {
    /// Chip name for logs
    fn name(&self) -> &str;

    /// Reset, identify and initialize the chip
    fn power_on(&mut self) -> Result<BootReport>;

    /// Put the chip to sleep
    fn power_off(&mut self) -> Result<()>;

    /// Apply spreading factor, bandwidth, coding rate, channel and power
    fn configure(&mut self, settings: &ModemSettings) -> Result<()>;

    /// Transmit one packet and wait for completion
    fn send(&mut self, request: &TxRequest) -> Result<()>;

    /// Listen for one packet for at most `timeout_ms`
    fn receive(&mut self, timeout_ms: u32) -> Result<RxPacket>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_request_default_timeout() {
        let req = TxRequest::new(vec![1, 2, 3]);
        assert_eq!(req.timeout_ms, 10_000);
        assert_eq!(req.with_timeout(500).timeout_ms, 500);
    }

    #[test]
    fn test_snr_db_from_quarter_db() {
        let packet = RxPacket {
            payload: vec![],
            rssi: Some(-80),
            snr: Some(-20),
            crc_status: CrcStatus::Ok,
        };
        assert_eq!(packet.snr_db(), Some(-5));

        let fsk = RxPacket { snr: None, rssi: None, ..packet };
        assert_eq!(fsk.snr_db(), None);
    }
}
