//! # SX1272 / SX1276 register layouts
//!
//! The two chips share a register map but disagree on where several modem
//! fields live and how the PA is programmed. Each difference is one method
//! on [`RegisterLayout`]; the driver picks the implementation once, after
//! reading `RegVersion`, and never branches on the chip again.
//!
//! | Field                 | SX1272            | SX1276             |
//! |-----------------------|-------------------|--------------------|
//! | Bandwidth             | MC1[7:6], 3 codes | MC1[7:4], 10 codes |
//! | Coding rate           | MC1[5:3]          | MC1[3:1]           |
//! | Implicit header       | MC1 bit 2         | MC1 bit 0          |
//! | LowDataRateOptimize   | MC1 bit 0         | MC3 bit 3          |
//! | AgcAutoOn             | MC2 bit 2         | MC3 bit 2          |
//! | RegPaDac              | 0x5A              | 0x4D               |

use crate::constants::RSSI_CORRECTION_THRESHOLD;
use crate::error::{RadioError, Result};
use crate::radio::modulation::{Bandwidth, CodingRate};
use crate::radio::registers::*;
use serde::{Deserialize, Serialize};

/// Supported silicon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    Sx1272,
    Sx1276,
}

impl Variant {
    /// Map a `RegVersion` value to a supported chip
    pub fn from_version(version: u8) -> Option<Self> {
        match version {
            VERSION_SX1272 => Some(Variant::Sx1272),
            VERSION_SX1276 => Some(Variant::Sx1276),
            _ => None,
        }
    }

    pub fn version(self) -> u8 {
        match self {
            Variant::Sx1272 => VERSION_SX1272,
            Variant::Sx1276 => VERSION_SX1276,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Variant::Sx1272 => "SX1272",
            Variant::Sx1276 => "SX1276",
        }
    }

    pub fn layout(self) -> &'static dyn RegisterLayout {
        match self {
            Variant::Sx1272 => &Sx1272Layout,
            Variant::Sx1276 => &Sx1276Layout,
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A register bit living in a specific register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterBit {
    pub register: u8,
    pub mask: u8,
}

/// Chip-specific bit layout
pub trait RegisterLayout: Send + Sync {
    fn variant(&self) -> Variant;

    /// Address of the high-power PA DAC register
    fn pa_dac_register(&self) -> u8;

    fn supports_bandwidth(&self, bw: Bandwidth) -> bool;

    /// Replace the bandwidth field of `modem_config1`, keeping other bits
    fn encode_bandwidth(&self, modem_config1: u8, bw: Bandwidth) -> u8;

    fn decode_bandwidth(&self, modem_config1: u8) -> Option<Bandwidth>;

    /// Bit offset of the coding rate field in `RegModemConfig1`
    fn coding_rate_shift(&self) -> u8;

    fn encode_coding_rate(&self, modem_config1: u8, cr: CodingRate) -> u8 {
        let shift = self.coding_rate_shift();
        (modem_config1 & !(0x07 << shift)) | (cr.code() << shift)
    }

    /// Raw 3-bit coding rate code, 1 to 4 when valid
    fn decode_coding_rate(&self, modem_config1: u8) -> u8 {
        (modem_config1 >> self.coding_rate_shift()) & 0x07
    }

    /// ImplicitHeaderModeOn bit of `RegModemConfig1`
    fn implicit_header_bit(&self) -> u8;

    fn low_data_rate_optimize(&self) -> RegisterBit;

    fn agc_auto_on(&self) -> RegisterBit;

    /// `RegPaConfig` for `dbm` on the normal PA paths (no PA DAC boost)
    fn pa_config(&self, dbm: i8, pa_boost: bool) -> Result<u8>;

    /// `RegPaConfig` for +20 dBm on PA_BOOST
    fn pa_config_extreme(&self) -> u8;

    /// Band-dependent term added to the RSSI offset
    fn rssi_correction(&self, channel: u32) -> i16;

    /// Whether the RX chain needs image calibration after reset
    fn needs_image_calibration(&self) -> bool;

    /// Power-on value for `addr` in `0x00..=0x41`
    fn default_register(&self, addr: u8) -> u8 {
        DEFAULT_REGISTERS[addr as usize]
    }
}

fn power_out_of_range(dbm: i8, min: i8, path: &str) -> RadioError {
    RadioError::InvalidRequest(format!(
        "output power {dbm} dBm outside {min}..=14 dBm on {path}"
    ))
}

/// Semtech SX1272
#[derive(Debug, Clone, Copy, Default)]
pub struct Sx1272Layout;

impl RegisterLayout for Sx1272Layout {
    fn variant(&self) -> Variant {
        Variant::Sx1272
    }

    fn pa_dac_register(&self) -> u8 {
        REG_PA_DAC_SX1272
    }

    fn supports_bandwidth(&self, bw: Bandwidth) -> bool {
        matches!(bw, Bandwidth::BW125 | Bandwidth::BW250 | Bandwidth::BW500)
    }

    fn encode_bandwidth(&self, modem_config1: u8, bw: Bandwidth) -> u8 {
        // 2-bit field: common code minus 7
        let field = bw.code().saturating_sub(Bandwidth::BW125.code()) & 0x03;
        (modem_config1 & 0x3F) | (field << 6)
    }

    fn decode_bandwidth(&self, modem_config1: u8) -> Option<Bandwidth> {
        Bandwidth::from_code((modem_config1 >> 6) + Bandwidth::BW125.code())
    }

    fn coding_rate_shift(&self) -> u8 {
        3
    }

    fn implicit_header_bit(&self) -> u8 {
        0x04
    }

    fn low_data_rate_optimize(&self) -> RegisterBit {
        RegisterBit {
            register: REG_MODEM_CONFIG1,
            mask: 0x01,
        }
    }

    fn agc_auto_on(&self) -> RegisterBit {
        RegisterBit {
            register: REG_MODEM_CONFIG2,
            mask: 0x04,
        }
    }

    fn pa_config(&self, dbm: i8, pa_boost: bool) -> Result<u8> {
        if pa_boost {
            // Pout = 2 + OutputPower
            if !(2..=14).contains(&dbm) {
                return Err(power_out_of_range(dbm, 2, "PA_BOOST"));
            }
            Ok((dbm - 2) as u8 | PA_SELECT_BOOST)
        } else {
            // Pout = -1 + OutputPower
            if !(-1..=14).contains(&dbm) {
                return Err(power_out_of_range(dbm, -1, "RFO"));
            }
            Ok((dbm + 1) as u8)
        }
    }

    fn pa_config_extreme(&self) -> u8 {
        0x0F | PA_SELECT_BOOST
    }

    fn rssi_correction(&self, channel: u32) -> i16 {
        if channel < RSSI_CORRECTION_THRESHOLD {
            7
        } else {
            18
        }
    }

    fn needs_image_calibration(&self) -> bool {
        false
    }
}

/// Semtech SX1276 (also SX1277/78/79)
#[derive(Debug, Clone, Copy, Default)]
pub struct Sx1276Layout;

impl RegisterLayout for Sx1276Layout {
    fn variant(&self) -> Variant {
        Variant::Sx1276
    }

    fn pa_dac_register(&self) -> u8 {
        REG_PA_DAC_SX1276
    }

    fn supports_bandwidth(&self, _bw: Bandwidth) -> bool {
        true
    }

    fn encode_bandwidth(&self, modem_config1: u8, bw: Bandwidth) -> u8 {
        (modem_config1 & 0x0F) | (bw.code() << 4)
    }

    fn decode_bandwidth(&self, modem_config1: u8) -> Option<Bandwidth> {
        Bandwidth::from_code(modem_config1 >> 4)
    }

    fn coding_rate_shift(&self) -> u8 {
        1
    }

    fn implicit_header_bit(&self) -> u8 {
        0x01
    }

    fn low_data_rate_optimize(&self) -> RegisterBit {
        RegisterBit {
            register: REG_MODEM_CONFIG3,
            mask: 0x08,
        }
    }

    fn agc_auto_on(&self) -> RegisterBit {
        RegisterBit {
            register: REG_MODEM_CONFIG3,
            mask: 0x04,
        }
    }

    fn pa_config(&self, dbm: i8, pa_boost: bool) -> Result<u8> {
        // MaxPower fixed at 7, Pmax = 15 dBm
        if pa_boost {
            // Pout = 17 - (15 - OutputPower)
            if !(2..=14).contains(&dbm) {
                return Err(power_out_of_range(dbm, 2, "PA_BOOST"));
            }
            Ok((dbm - 2) as u8 | PA_SELECT_BOOST | PA_MAX_POWER_SX1276)
        } else {
            // Pout = Pmax - (15 - OutputPower)
            if !(0..=14).contains(&dbm) {
                return Err(power_out_of_range(dbm, 0, "RFO"));
            }
            Ok(dbm as u8 | PA_MAX_POWER_SX1276)
        }
    }

    fn pa_config_extreme(&self) -> u8 {
        0x0F | PA_SELECT_BOOST | PA_MAX_POWER_SX1276
    }

    fn rssi_correction(&self, channel: u32) -> i16 {
        if channel < RSSI_CORRECTION_THRESHOLD {
            25
        } else {
            18
        }
    }

    fn needs_image_calibration(&self) -> bool {
        true
    }

    fn default_register(&self, addr: u8) -> u8 {
        match addr {
            REG_PA_CONFIG => 0x40,
            REG_MODEM_CONFIG1 => 0x82,
            REG_MODEM_CONFIG3 => 0x04,
            _ => DEFAULT_REGISTERS[addr as usize],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_from_version() {
        assert_eq!(Variant::from_version(0x22), Some(Variant::Sx1272));
        assert_eq!(Variant::from_version(0x12), Some(Variant::Sx1276));
        assert_eq!(Variant::from_version(0x00), None);
        assert_eq!(Variant::from_version(0xFF), None);
    }

    #[test]
    fn test_sx1272_bandwidth_field() {
        let layout = Sx1272Layout;
        assert!(!layout.supports_bandwidth(Bandwidth::BW62_5));
        assert_eq!(layout.encode_bandwidth(0x0A, Bandwidth::BW125), 0x0A);
        assert_eq!(layout.encode_bandwidth(0x0A, Bandwidth::BW250), 0x4A);
        assert_eq!(layout.encode_bandwidth(0xCA, Bandwidth::BW500), 0x8A);
        assert_eq!(layout.decode_bandwidth(0x4A), Some(Bandwidth::BW250));
        assert_eq!(layout.decode_bandwidth(0xC0), None);
    }

    #[test]
    fn test_sx1276_bandwidth_field() {
        let layout = Sx1276Layout;
        assert_eq!(layout.encode_bandwidth(0x82, Bandwidth::BW125), 0x72);
        assert_eq!(layout.encode_bandwidth(0x02, Bandwidth::BW500), 0x92);
        assert_eq!(layout.decode_bandwidth(0x82), Some(Bandwidth::BW250));
        assert_eq!(layout.decode_bandwidth(0xA0), None);
    }

    #[test]
    fn test_coding_rate_field() {
        assert_eq!(Sx1272Layout.encode_coding_rate(0xFF, CodingRate::CR4_5), 0xCF);
        assert_eq!(Sx1276Layout.encode_coding_rate(0xFF, CodingRate::CR4_8), 0xF9);
        assert_eq!(Sx1272Layout.decode_coding_rate(0x4A), 1);
        assert_eq!(Sx1276Layout.decode_coding_rate(0x82), 1);
    }

    #[test]
    fn test_pa_config_formulas() {
        assert_eq!(Sx1272Layout.pa_config(14, true).unwrap(), 0x8C);
        assert_eq!(Sx1272Layout.pa_config(14, false).unwrap(), 0x0F);
        assert_eq!(Sx1276Layout.pa_config(14, true).unwrap(), 0xFC);
        assert_eq!(Sx1276Layout.pa_config(14, false).unwrap(), 0x7E);
        assert!(Sx1272Layout.pa_config(1, true).is_err());
        assert_eq!(Sx1272Layout.pa_config_extreme(), 0x8F);
        assert_eq!(Sx1276Layout.pa_config_extreme(), 0xFF);
    }

    #[test]
    fn test_rssi_correction_threshold() {
        use crate::constants::{CH_00_433, CH_04_868, CH_10_868};
        assert_eq!(Sx1276Layout.rssi_correction(CH_00_433), 25);
        assert_eq!(Sx1276Layout.rssi_correction(CH_04_868), 18);
        assert_eq!(Sx1272Layout.rssi_correction(CH_00_433), 7);
        assert_eq!(Sx1272Layout.rssi_correction(CH_10_868), 18);
    }

    #[test]
    fn test_default_register_overrides() {
        assert_eq!(Sx1272Layout.default_register(REG_MODEM_CONFIG1), 0x4A);
        assert_eq!(Sx1276Layout.default_register(REG_MODEM_CONFIG1), 0x82);
        assert_eq!(Sx1276Layout.default_register(REG_PA_CONFIG), 0x40);
        assert_eq!(Sx1276Layout.default_register(REG_MODEM_CONFIG3), 0x04);
        assert_eq!(Sx1276Layout.default_register(REG_SYNC_WORD), 0x12);
    }
}
