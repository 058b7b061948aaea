//! # SX127x Register Definitions and Constants
//!
//! Register addresses, operating-mode values and bit fields shared by the
//! SX1272 and SX1276. Registers whose layout differs between the two chips
//! (modem configuration bit positions, the PA DAC address) are resolved by
//! [`crate::radio::variant::RegisterLayout`] rather than here.
//!
//! ## Register Map
//!
//! - 0x00-0x0F: FIFO, operating mode, carrier frequency, PA and LNA
//! - 0x10-0x27: LoRa packet engine, IRQ flags, modem configuration
//! - 0x25-0x3F: FSK packet engine (aliases some LoRa addresses), IRQ flags 1/2
//! - 0x42: silicon version

use bitflags::bitflags;

// =============================================================================
// Register Addresses
// =============================================================================

/// FIFO read/write access
pub const REG_FIFO: u8 = 0x00;
/// Operating mode and modulation family (LongRangeMode bit 7)
pub const REG_OP_MODE: u8 = 0x01;
/// RF carrier frequency, most significant byte
pub const REG_FRF_MSB: u8 = 0x06;
/// RF carrier frequency, intermediate byte
pub const REG_FRF_MID: u8 = 0x07;
/// RF carrier frequency, least significant byte
pub const REG_FRF_LSB: u8 = 0x08;
/// PA selection and output power control
pub const REG_PA_CONFIG: u8 = 0x09;
/// PA ramp time and low phase-noise PLL control
pub const REG_PA_RAMP: u8 = 0x0A;
/// Over-current protection
pub const REG_OCP: u8 = 0x0B;
/// LNA gain settings
pub const REG_LNA: u8 = 0x0C;
/// SPI interface address pointer into the FIFO
pub const REG_FIFO_ADDR_PTR: u8 = 0x0D;
/// Write base address in the FIFO for the TX modulator
pub const REG_FIFO_TX_BASE_ADDR: u8 = 0x0E;
/// Read base address in the FIFO for the RX demodulator
pub const REG_FIFO_RX_BASE_ADDR: u8 = 0x0F;
/// Start address of the last packet received
pub const REG_FIFO_RX_CURRENT_ADDR: u8 = 0x10;
/// LoRa IRQ flags (write 1 to clear)
pub const REG_IRQ_FLAGS: u8 = 0x12;
/// Number of payload bytes of the last packet received
pub const REG_RX_NB_BYTES: u8 = 0x13;
/// Estimated SNR of the last packet, two's complement quarter-dB
pub const REG_PKT_SNR_VALUE: u8 = 0x19;
/// RSSI of the last packet
pub const REG_PKT_RSSI_VALUE: u8 = 0x1A;
/// FHSS channel and CRC-on-payload indication (bit 6)
pub const REG_HOP_CHANNEL: u8 = 0x1C;
/// Modem configuration 1
pub const REG_MODEM_CONFIG1: u8 = 0x1D;
/// Modem configuration 2 (spreading factor in bits 7-4)
pub const REG_MODEM_CONFIG2: u8 = 0x1E;
/// Receiver timeout value, LSB
pub const REG_SYMB_TIMEOUT_LSB: u8 = 0x1F;
/// LoRa preamble length, MSB
pub const REG_PREAMBLE_MSB_LORA: u8 = 0x20;
/// LoRa preamble length, LSB
pub const REG_PREAMBLE_LSB_LORA: u8 = 0x21;
/// LoRa payload length
pub const REG_PAYLOAD_LENGTH_LORA: u8 = 0x22;
/// LoRa maximum payload length
pub const REG_MAX_PAYLOAD_LENGTH: u8 = 0x23;
/// Address of the last byte written by the LoRa receiver
pub const REG_FIFO_RX_BYTE_ADDR: u8 = 0x25;
/// FSK preamble length, MSB
pub const REG_PREAMBLE_MSB_FSK: u8 = 0x25;
/// FSK preamble length, LSB
pub const REG_PREAMBLE_LSB_FSK: u8 = 0x26;
/// Modem configuration 3 (SX1276 only)
pub const REG_MODEM_CONFIG3: u8 = 0x26;
/// FSK packet mode settings (address filtering in bits 2-1)
pub const REG_PACKET_CONFIG1: u8 = 0x30;
/// LoRa detection optimize
pub const REG_DETECT_OPTIMIZE: u8 = 0x31;
/// FSK payload length
pub const REG_PAYLOAD_LENGTH_FSK: u8 = 0x32;
/// LoRa detection threshold
pub const REG_DETECTION_THRESHOLD: u8 = 0x37;
/// LoRa sync word
pub const REG_SYNC_WORD: u8 = 0x39;
/// Image calibration control
pub const REG_IMAGE_CAL: u8 = 0x3B;
/// FSK IRQ flags 1
pub const REG_IRQ_FLAGS1: u8 = 0x3E;
/// FSK IRQ flags 2
pub const REG_IRQ_FLAGS2: u8 = 0x3F;
/// Silicon revision
pub const REG_VERSION: u8 = 0x42;
/// High-power PA DAC control on the SX1276
pub const REG_PA_DAC_SX1276: u8 = 0x4D;
/// High-power PA DAC control on the SX1272
pub const REG_PA_DAC_SX1272: u8 = 0x5A;

// =============================================================================
// Chip identification
// =============================================================================

/// `RegVersion` value of the SX1272
pub const VERSION_SX1272: u8 = 0x22;
/// `RegVersion` value of the SX1276
pub const VERSION_SX1276: u8 = 0x12;

// =============================================================================
// Operating modes
// =============================================================================

/// Operating mode of the radio, crossed with the modulation family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpMode {
    Sleep,
    Standby,
    Tx,
    Rx,
}

/// Modulation family selected by the LongRangeMode bit of `RegOpMode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ModulationFamily {
    LoRa,
    Fsk,
}

/// LongRangeMode bit of `RegOpMode`
pub const LONG_RANGE_MODE: u8 = 0x80;

pub const FSK_SLEEP_MODE: u8 = 0x00;
pub const FSK_STANDBY_MODE: u8 = 0x01;
pub const FSK_TX_MODE: u8 = 0x03;
pub const FSK_RX_MODE: u8 = 0x05;

pub const LORA_SLEEP_MODE: u8 = 0x80;
pub const LORA_STANDBY_MODE: u8 = 0x81;
pub const LORA_TX_MODE: u8 = 0x83;
pub const LORA_RX_MODE: u8 = 0x85;

impl ModulationFamily {
    /// `RegOpMode` value for `mode` in this family
    pub fn op_mode(self, mode: OpMode) -> u8 {
        match (self, mode) {
            (ModulationFamily::LoRa, OpMode::Sleep) => LORA_SLEEP_MODE,
            (ModulationFamily::LoRa, OpMode::Standby) => LORA_STANDBY_MODE,
            (ModulationFamily::LoRa, OpMode::Tx) => LORA_TX_MODE,
            (ModulationFamily::LoRa, OpMode::Rx) => LORA_RX_MODE,
            (ModulationFamily::Fsk, OpMode::Sleep) => FSK_SLEEP_MODE,
            (ModulationFamily::Fsk, OpMode::Standby) => FSK_STANDBY_MODE,
            (ModulationFamily::Fsk, OpMode::Tx) => FSK_TX_MODE,
            (ModulationFamily::Fsk, OpMode::Rx) => FSK_RX_MODE,
        }
    }

    /// Standby value for this family, used to bracket register writes
    pub fn standby(self) -> u8 {
        self.op_mode(OpMode::Standby)
    }
}

// =============================================================================
// Bit fields
// =============================================================================

bitflags! {
    /// LoRa `RegIrqFlags` bits
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct IrqFlags: u8 {
        const RX_TIMEOUT = 0x80;
        const RX_DONE = 0x40;
        const PAYLOAD_CRC_ERROR = 0x20;
        const VALID_HEADER = 0x10;
        const TX_DONE = 0x08;
        const CAD_DONE = 0x04;
        const FHSS_CHANGE_CHANNEL = 0x02;
        const CAD_DETECTED = 0x01;
    }
}

bitflags! {
    /// FSK `RegIrqFlags2` bits used by the packet engine
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FskIrqFlags2: u8 {
        const FIFO_FULL = 0x80;
        const FIFO_EMPTY = 0x40;
        const FIFO_LEVEL = 0x20;
        const FIFO_OVERRUN = 0x10;
        const PACKET_SENT = 0x08;
        const PAYLOAD_READY = 0x04;
        const CRC_OK = 0x02;
        const LOW_BAT = 0x01;
    }
}

/// CrcOnPayload bit of `RegHopChannel`
pub const HOP_CHANNEL_CRC_ON_PAYLOAD: u8 = 0x40;

/// `RegImageCal` bits kept when launching a calibration
pub const IMAGE_CAL_MASK: u8 = 0xBF;
/// `RegImageCal` calibration trigger
pub const IMAGE_CAL_START: u8 = 0x40;
/// `RegImageCal` calibration in progress
pub const IMAGE_CAL_RUNNING: u8 = 0x20;

/// AddressFiltering field of `RegPacketConfig1` (bits 2-1)
pub const PACKET_CONFIG1_ADDRESS_FILTERING: u8 = 0x06;
/// CrcOn bit of `RegPacketConfig1`
pub const PACKET_CONFIG1_CRC_ON: u8 = 0x10;

/// `RegPaRamp` value used while receiving (50 us ramp)
pub const PA_RAMP_RX: u8 = 0x08;
/// `RegSymbTimeoutLsb` for SF10 to SF12
pub const SYMB_TIMEOUT_SLOW: u8 = 0x05;
/// `RegSymbTimeoutLsb` for SF6 to SF9
pub const SYMB_TIMEOUT_FAST: u8 = 0x08;

/// OcpOn bit of `RegOcp`
pub const OCP_ON: u8 = 0x20;
/// Highest OcpTrim code the driver accepts (240 mA)
pub const OCP_TRIM_MAX: u8 = 0x1B;

/// PaSelect bit of `RegPaConfig` (PA_BOOST pin)
pub const PA_SELECT_BOOST: u8 = 0x80;
/// MaxPower field fixed at 7 on the SX1276
pub const PA_MAX_POWER_SX1276: u8 = 0x70;
/// `RegPaDac` value enabling the +20 dBm PA_BOOST path
pub const PA_DAC_HIGH_POWER: u8 = 0x87;
/// `RegPaDac` default
pub const PA_DAC_DEFAULT: u8 = 0x84;

/// LNA maximum gain with default boost
pub const LNA_MAX_GAIN: u8 = 0x23;

/// Detection settings for SF6
pub const DETECT_OPTIMIZE_SF6: u8 = 0x05;
pub const DETECTION_THRESHOLD_SF6: u8 = 0x0C;
/// Detection settings for SF7 to SF12
pub const DETECT_OPTIMIZE_SF7_12: u8 = 0x03;
pub const DETECTION_THRESHOLD_SF7_12: u8 = 0x0A;

/// FIFO base address used for transmission
pub const FIFO_TX_BASE: u8 = 0x80;

// =============================================================================
// Power-on defaults
// =============================================================================

/// Power-on register values for `0x00..=0x41`.
///
/// `RegPaConfig`, `RegModemConfig1` and `RegModemConfig3` hold the SX1272
/// value; the SX1276 overrides come from its
/// [`crate::radio::variant::RegisterLayout`].
pub const DEFAULT_REGISTERS: [u8; 0x42] = [
    0x00, 0x81, 0x1A, 0x0B, 0x00, 0x52, 0xD8, 0x99, // 0x00
    0x99, 0x00, 0x09, 0x3B, 0x23, 0x01, 0x80, 0x00, // 0x08
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // 0x10
    0x10, 0x00, 0x00, 0x00, 0x00, 0x4A, 0x97, 0xFF, // 0x18
    0x00, 0x08, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, // 0x20
    0x00, 0x00, 0x00, 0x00, 0x00, 0x50, 0x14, 0x40, // 0x28
    0x00, 0x03, 0x05, 0x27, 0x1C, 0x0A, 0x00, 0x0A, // 0x30
    0x42, 0x12, 0x65, 0x1D, 0x01, 0xA1, 0x00, 0x00, // 0x38
    0x00, 0x00, // 0x40
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_mode_values() {
        assert_eq!(ModulationFamily::LoRa.op_mode(OpMode::Sleep), 0x80);
        assert_eq!(ModulationFamily::LoRa.op_mode(OpMode::Rx), 0x85);
        assert_eq!(ModulationFamily::Fsk.op_mode(OpMode::Tx), 0x03);
        assert_eq!(ModulationFamily::Fsk.standby(), 0x01);
        assert_eq!(ModulationFamily::LoRa.standby(), 0x81);
    }

    #[test]
    fn test_default_table_anchors() {
        assert_eq!(DEFAULT_REGISTERS.len(), 0x42);
        assert_eq!(DEFAULT_REGISTERS[0x01], 0x81);
        assert_eq!(DEFAULT_REGISTERS[0x1E], 0x97);
        assert_eq!(DEFAULT_REGISTERS[0x39], 0x12);
        assert_eq!(DEFAULT_REGISTERS[0x3D], 0xA1);
        assert_eq!(DEFAULT_REGISTERS[0x41], 0x00);
    }

    #[test]
    fn test_irq_flag_bits() {
        let flags = IrqFlags::from_bits_truncate(0x60);
        assert!(flags.contains(IrqFlags::RX_DONE));
        assert!(flags.contains(IrqFlags::PAYLOAD_CRC_ERROR));
        assert!(!flags.contains(IrqFlags::TX_DONE));
    }
}
