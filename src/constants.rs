//! SX127x Radio Constants
//!
//! Channel words, timing bounds and link-budget constants shared by the
//! driver and the packet forwarder.

// =============================================================================
// Carrier frequency words
// =============================================================================

/// Crystal oscillator frequency
pub const FXOSC_HZ: u64 = 32_000_000;

/// `RegFrf` is expressed in steps of FXOSC / 2^19 (61.035 Hz)
pub const FRF_STEP_SHIFT: u32 = 19;

/// Largest value representable by the three `RegFrf` registers
pub const CHANNEL_MAX: u32 = 0x00FF_FFFF;

/// Convert a carrier frequency to the 24-bit `RegFrf` word, rounding to the
/// nearest step. `None` when the word does not fit in 24 bits.
pub fn frequency_to_channel(freq_hz: u64) -> Option<u32> {
    let fxosc = u128::from(FXOSC_HZ);
    let channel = ((u128::from(freq_hz) << FRF_STEP_SHIFT) + fxosc / 2) / fxosc;
    u32::try_from(channel).ok().filter(|c| *c <= CHANNEL_MAX)
}

/// Convert a 24-bit `RegFrf` word to the carrier frequency
pub fn channel_to_frequency(channel: u32) -> u64 {
    (u64::from(channel) * FXOSC_HZ) >> FRF_STEP_SHIFT
}

/// 863.20 MHz; also the RSSI correction threshold
pub const CH_04_868: u32 = 0xD7CCCC;
/// 863.50 MHz
pub const CH_05_868: u32 = 0xD7E000;
/// 863.80 MHz
pub const CH_06_868: u32 = 0xD7F333;
/// 864.10 MHz
pub const CH_07_868: u32 = 0xD80666;
/// 864.40 MHz
pub const CH_08_868: u32 = 0xD81999;
/// 864.70 MHz
pub const CH_09_868: u32 = 0xD82CCC;
/// 865.20 MHz
pub const CH_10_868: u32 = 0xD84CCC;
/// 865.50 MHz
pub const CH_11_868: u32 = 0xD86000;
/// 865.80 MHz
pub const CH_12_868: u32 = 0xD87333;
/// 866.10 MHz
pub const CH_13_868: u32 = 0xD88666;
/// 866.40 MHz
pub const CH_14_868: u32 = 0xD89999;
/// 866.70 MHz
pub const CH_15_868: u32 = 0xD8ACCC;
/// 867.00 MHz
pub const CH_16_868: u32 = 0xD8C000;
/// 868.00 MHz; high-band image calibration channel
pub const CH_17_868: u32 = 0xD90000;
/// 868.10 MHz
pub const CH_18_868: u32 = 0xD90666;

/// 903.08 MHz
pub const CH_00_900: u32 = 0xE1C51E;
/// 905.24 MHz
pub const CH_01_900: u32 = 0xE24F5C;
/// 907.40 MHz
pub const CH_02_900: u32 = 0xE2D999;
/// 909.56 MHz
pub const CH_03_900: u32 = 0xE363D7;
/// 911.72 MHz
pub const CH_04_900: u32 = 0xE3EE14;
/// 913.88 MHz
pub const CH_05_900: u32 = 0xE47851;
/// 916.04 MHz
pub const CH_06_900: u32 = 0xE5028F;
/// 918.20 MHz
pub const CH_07_900: u32 = 0xE58CCC;
/// 920.36 MHz
pub const CH_08_900: u32 = 0xE6170A;
/// 922.52 MHz
pub const CH_09_900: u32 = 0xE6A147;
/// 924.68 MHz
pub const CH_10_900: u32 = 0xE72B85;
/// 926.84 MHz
pub const CH_11_900: u32 = 0xE7B5C2;
/// 915.00 MHz
pub const CH_12_900: u32 = 0xE4C000;

/// 433.3 MHz
pub const CH_00_433: u32 = 0x6C5333;
/// 433.6 MHz
pub const CH_01_433: u32 = 0x6C6666;
/// 433.9 MHz
pub const CH_02_433: u32 = 0x6C7999;
/// 434.3 MHz
pub const CH_03_433: u32 = 0x6C9333;

/// Channels below this word get the low-band RSSI correction
pub const RSSI_CORRECTION_THRESHOLD: u32 = CH_04_868;

// =============================================================================
// Packet limits
// =============================================================================

/// Largest LoRa payload
pub const MAX_LENGTH: usize = 255;
/// Largest FSK payload (FIFO size)
pub const MAX_LENGTH_FSK: usize = 64;
/// Default LoRa sync word
pub const DEFAULT_SYNC_WORD: u8 = 0x12;

// =============================================================================
// Timing
// =============================================================================

/// Hard ceiling for a single receive window
pub const MAX_WAIT_MS: u32 = 12_000;
/// Default transmit completion bound
pub const DEFAULT_TX_TIMEOUT_MS: u32 = 10_000;
/// IRQ poll interval in LoRa mode
pub const LORA_POLL_INTERVAL_MS: u32 = 100;
/// IRQ poll interval for FSK receive
pub const FSK_POLL_INTERVAL_MS: u32 = 200;
/// Settle time after a register write before verification
pub const SETTLE_MS: u32 = 100;
/// Settle time after programming the payload length
pub const PAYLOAD_LENGTH_SETTLE_MS: u32 = 250;
/// Reset line phases
pub const RESET_PHASE_MS: u32 = 100;
/// Polls of `RegImageCal` before a calibration is reported as timed out
pub const IMAGE_CAL_MAX_POLLS: u32 = 1_000;
/// Default ceiling for LoRa mode switch attempts
pub const DEFAULT_LORA_MODE_ATTEMPTS: u32 = 21;

// =============================================================================
// Link quality
// =============================================================================

/// RSSI offset for LoRa packets
pub const OFFSET_RSSI: i16 = 139;
/// Receive retry budget
pub const MAX_RETRIES: u8 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_channel_conversion() {
        assert_eq!(frequency_to_channel(868_000_000), Some(CH_17_868));
        assert_eq!(frequency_to_channel(915_000_000), Some(CH_12_900));
        assert_eq!(channel_to_frequency(CH_17_868), 868_000_000);
        assert_eq!(channel_to_frequency(CH_12_900), 915_000_000);
    }

    #[test]
    fn test_frequency_beyond_24_bits() {
        let top = channel_to_frequency(CHANNEL_MAX);
        assert_eq!(frequency_to_channel(top), Some(CHANNEL_MAX));
        assert_eq!(frequency_to_channel(channel_to_frequency(CHANNEL_MAX + 1)), None);
        assert_eq!(frequency_to_channel(2_000_000_000), None);
        assert_eq!(frequency_to_channel(35_185_240_188_832), None);
        assert_eq!(frequency_to_channel(u64::MAX >> FRF_STEP_SHIFT), None);
        assert_eq!(frequency_to_channel(u64::MAX), None);
    }
}
