//! # Link quality
//!
//! Packet SNR and RSSI as reported by the LoRa modem. Both values only exist
//! in LoRa mode.

use crate::constants::OFFSET_RSSI;
use crate::error::{RadioError, Result};
use crate::radio::driver::Sx127xDriver;
use crate::radio::hal::Hal;
use crate::radio::modulation::ModulationFamily;
use crate::radio::registers::{REG_PKT_RSSI_VALUE, REG_PKT_SNR_VALUE};

/// Whole-dB SNR from the two's complement quarter-dB `RegPktSnrValue`
pub fn snr_from_register(raw: u8) -> i8 {
    if raw & 0x80 != 0 {
        -(((!raw).wrapping_add(1) >> 2) as i8)
    } else {
        (raw >> 2) as i8
    }
}

/// Packet RSSI in dBm.
///
/// `correction` is the full offset subtracted from the raw reading
/// (139 plus the band-dependent term).
pub fn packet_rssi(raw_rssi: u8, snr_db: i8, correction: i16) -> i16 {
    let raw = i16::from(raw_rssi);
    let snr = i16::from(snr_db);
    if snr < 0 {
        raw + snr / 4 - correction
    } else {
        raw + snr * 16 / 15 - correction
    }
}

impl<H: Hal> Sx127xDriver<H> {
    fn require_lora(&self, operation: &'static str) -> Result<()> {
        match self.state.modulation_family {
            ModulationFamily::LoRa => Ok(()),
            ModulationFamily::Fsk => Err(RadioError::NotApplicable { operation }),
        }
    }

    /// SNR of the last packet in dB
    pub fn compute_snr(&mut self) -> Result<i8> {
        self.require_lora("SNR")?;
        let raw = self.read_register(REG_PKT_SNR_VALUE)?;
        let snr = snr_from_register(raw);
        log::debug!("SNR 0x{:02X} -> {} dB", raw, snr);
        Ok(snr)
    }

    /// RSSI of the last packet in dBm, corrected for the band of the
    /// current channel
    pub fn compute_rssi(&mut self) -> Result<i16> {
        self.require_lora("RSSI")?;
        let layout = self.layout()?;
        let snr = self.compute_snr()?;
        let raw = self.read_register(REG_PKT_RSSI_VALUE)?;
        let correction = OFFSET_RSSI + layout.rssi_correction(self.state.channel);
        let rssi = packet_rssi(raw, snr, correction);
        log::debug!("RSSI 0x{:02X} -> {} dBm", raw, rssi);
        Ok(rssi)
    }
}
