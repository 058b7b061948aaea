//! # SX127x LoRa Modulation Parameters
//!
//! Spreading factor, bandwidth and coding rate as understood by both SX127x
//! variants, plus the low-data-rate-optimize rule and the preset table used by
//! single-channel gateways.
//!
//! Bandwidths use the SX1276 4-bit codes as the common representation
//! (`BW125 = 7`, `BW250 = 8`, `BW500 = 9`). The SX1272 only implements the
//! top three and stores them in a 2-bit field; translation happens in
//! [`crate::radio::variant`].

use crate::error::{RadioError, Result};
use serde::{Deserialize, Serialize};

pub use crate::radio::registers::ModulationFamily;

/// Spreading Factor (SF) for LoRa
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpreadingFactor {
    SF6 = 6,
    SF7 = 7,
    SF8 = 8,
    SF9 = 9,
    SF10 = 10,
    SF11 = 11,
    SF12 = 12,
}

impl SpreadingFactor {
    pub const ALL: [SpreadingFactor; 7] = [
        SpreadingFactor::SF6,
        SpreadingFactor::SF7,
        SpreadingFactor::SF8,
        SpreadingFactor::SF9,
        SpreadingFactor::SF10,
        SpreadingFactor::SF11,
        SpreadingFactor::SF12,
    ];

    pub fn value(self) -> u8 {
        self as u8
    }

    /// Decode the `RegModemConfig2[7:4]` field
    pub fn from_value(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|sf| sf.value() == value)
    }

    /// SF6 only works with implicit headers
    pub fn header_mode(self) -> HeaderMode {
        if self == SpreadingFactor::SF6 {
            HeaderMode::Implicit
        } else {
            HeaderMode::Explicit
        }
    }
}

impl TryFrom<u8> for SpreadingFactor {
    type Error = RadioError;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_value(value)
            .ok_or_else(|| RadioError::InvalidRequest(format!("spreading factor {value} outside 6..=12")))
    }
}

/// LoRa signal bandwidth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bandwidth {
    BW7_8 = 0x00,
    BW10_4 = 0x01,
    BW15_6 = 0x02,
    BW20_8 = 0x03,
    BW31_25 = 0x04,
    BW41_7 = 0x05,
    BW62_5 = 0x06,
    BW125 = 0x07,
    BW250 = 0x08,
    BW500 = 0x09,
}

impl Bandwidth {
    pub const ALL: [Bandwidth; 10] = [
        Bandwidth::BW7_8,
        Bandwidth::BW10_4,
        Bandwidth::BW15_6,
        Bandwidth::BW20_8,
        Bandwidth::BW31_25,
        Bandwidth::BW41_7,
        Bandwidth::BW62_5,
        Bandwidth::BW125,
        Bandwidth::BW250,
        Bandwidth::BW500,
    ];

    /// Common 4-bit code
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|bw| bw.code() == code)
    }

    pub fn hz(self) -> u32 {
        match self {
            Bandwidth::BW7_8 => 7_800,
            Bandwidth::BW10_4 => 10_400,
            Bandwidth::BW15_6 => 15_600,
            Bandwidth::BW20_8 => 20_800,
            Bandwidth::BW31_25 => 31_250,
            Bandwidth::BW41_7 => 41_700,
            Bandwidth::BW62_5 => 62_500,
            Bandwidth::BW125 => 125_000,
            Bandwidth::BW250 => 250_000,
            Bandwidth::BW500 => 500_000,
        }
    }

    /// Parse a kHz figure such as `125` or `62.5`
    pub fn from_khz(khz: f32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|bw| (bw.hz() as f32 / 1000.0 - khz).abs() < 0.1)
    }
}

/// Coding Rate (CR) for LoRa
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodingRate {
    CR4_5 = 0x01,
    CR4_6 = 0x02,
    CR4_7 = 0x03,
    CR4_8 = 0x04,
}

impl CodingRate {
    pub const ALL: [CodingRate; 4] = [
        CodingRate::CR4_5,
        CodingRate::CR4_6,
        CodingRate::CR4_7,
        CodingRate::CR4_8,
    ];

    /// 3-bit register code, 1 to 4
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|cr| cr.code() == code)
    }
}

/// LoRa header mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderMode {
    /// Length, coding rate and CRC presence sent in the header
    Explicit,
    /// Both ends agree on the header fields out of band
    Implicit,
}

/// Whether LowDataRateOptimize must be set.
///
/// The bit is mandatory once the symbol time exceeds 16 ms, which on the
/// bandwidths in use happens for SF11/SF12 at 125 kHz and SF12 at 250 kHz.
pub fn requires_low_data_rate_optimize(sf: SpreadingFactor, bw: Bandwidth) -> bool {
    matches!(
        (sf, bw),
        (SpreadingFactor::SF11 | SpreadingFactor::SF12, Bandwidth::BW125)
            | (SpreadingFactor::SF12, Bandwidth::BW250)
    )
}

/// LoRa symbol duration in microseconds, `2^SF / BW`
pub fn symbol_duration_us(sf: SpreadingFactor, bw: Bandwidth) -> u32 {
    ((1u64 << sf.value()) * 1_000_000 / u64::from(bw.hz())) as u32
}

/// Modem parameters applied together by `configure`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModemSettings {
    pub spreading_factor: SpreadingFactor,
    pub bandwidth: Bandwidth,
    pub coding_rate: CodingRate,
    /// 24-bit `RegFrf` word
    pub channel: u32,
    pub power_dbm: i8,
}

impl Default for ModemSettings {
    /// The uplink profile single-channel gateways listen on: SF12/BW125/CR4-5
    /// on 865.2 MHz at 14 dBm
    fn default() -> Self {
        Self {
            spreading_factor: SpreadingFactor::SF12,
            bandwidth: Bandwidth::BW125,
            coding_rate: CodingRate::CR4_5,
            channel: crate::constants::CH_10_868,
            power_dbm: 14,
        }
    }
}

/// Numbered LoRa modem presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoRaPreset {
    Mode1 = 1,
    Mode2 = 2,
    Mode3 = 3,
    Mode4 = 4,
    Mode5 = 5,
    Mode6 = 6,
    Mode7 = 7,
    Mode8 = 8,
    Mode9 = 9,
    Mode10 = 10,
}

impl LoRaPreset {
    pub fn from_index(index: u8) -> Option<Self> {
        use LoRaPreset::*;
        [Mode1, Mode2, Mode3, Mode4, Mode5, Mode6, Mode7, Mode8, Mode9, Mode10]
            .into_iter()
            .find(|p| *p as u8 == index)
    }

    /// `(coding rate, spreading factor, bandwidth)`, longest range first
    pub fn parameters(self) -> (CodingRate, SpreadingFactor, Bandwidth) {
        use Bandwidth::*;
        use SpreadingFactor::*;
        let (sf, bw) = match self {
            LoRaPreset::Mode1 => (SF12, BW125),
            LoRaPreset::Mode2 => (SF12, BW250),
            LoRaPreset::Mode3 => (SF10, BW125),
            LoRaPreset::Mode4 => (SF12, BW500),
            LoRaPreset::Mode5 => (SF10, BW250),
            LoRaPreset::Mode6 => (SF11, BW250),
            LoRaPreset::Mode7 => (SF9, BW250),
            LoRaPreset::Mode8 => (SF9, BW500),
            LoRaPreset::Mode9 => (SF8, BW500),
            LoRaPreset::Mode10 => (SF7, BW500),
        };
        (CodingRate::CR4_5, sf, bw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ldro_rule() {
        assert!(requires_low_data_rate_optimize(SpreadingFactor::SF12, Bandwidth::BW125));
        assert!(requires_low_data_rate_optimize(SpreadingFactor::SF11, Bandwidth::BW125));
        assert!(requires_low_data_rate_optimize(SpreadingFactor::SF12, Bandwidth::BW250));
        assert!(!requires_low_data_rate_optimize(SpreadingFactor::SF11, Bandwidth::BW250));
        assert!(!requires_low_data_rate_optimize(SpreadingFactor::SF10, Bandwidth::BW125));
        assert!(!requires_low_data_rate_optimize(SpreadingFactor::SF12, Bandwidth::BW500));
    }

    #[test]
    fn test_ldro_matches_symbol_time_on_gateway_bandwidths() {
        for bw in [Bandwidth::BW125, Bandwidth::BW250, Bandwidth::BW500] {
            for sf in SpreadingFactor::ALL {
                assert_eq!(
                    requires_low_data_rate_optimize(sf, bw),
                    symbol_duration_us(sf, bw) > 16_000,
                    "{sf:?} {bw:?}"
                );
            }
        }
    }

    #[test]
    fn test_sf6_implies_implicit_header() {
        assert_eq!(SpreadingFactor::SF6.header_mode(), HeaderMode::Implicit);
        for sf in &SpreadingFactor::ALL[1..] {
            assert_eq!(sf.header_mode(), HeaderMode::Explicit);
        }
    }

    #[test]
    fn test_spreading_factor_try_from() {
        assert_eq!(SpreadingFactor::try_from(9).unwrap(), SpreadingFactor::SF9);
        assert!(SpreadingFactor::try_from(5).is_err());
        assert!(SpreadingFactor::try_from(13).is_err());
    }

    #[test]
    fn test_bandwidth_from_khz() {
        assert_eq!(Bandwidth::from_khz(125.0), Some(Bandwidth::BW125));
        assert_eq!(Bandwidth::from_khz(62.5), Some(Bandwidth::BW62_5));
        assert_eq!(Bandwidth::from_khz(7.8), Some(Bandwidth::BW7_8));
        assert_eq!(Bandwidth::from_khz(100.0), None);
    }

    #[test]
    fn test_presets() {
        assert_eq!(
            LoRaPreset::Mode1.parameters(),
            (CodingRate::CR4_5, SpreadingFactor::SF12, Bandwidth::BW125)
        );
        assert_eq!(
            LoRaPreset::from_index(10).map(LoRaPreset::parameters),
            Some((CodingRate::CR4_5, SpreadingFactor::SF7, Bandwidth::BW500))
        );
        assert_eq!(LoRaPreset::from_index(0), None);
        assert_eq!(LoRaPreset::from_index(11), None);
    }
}
