//! # Modulation configuration
//!
//! Every setter follows the same shape:
//!
//! 1. validate the request (no register access on rejection)
//! 2. bracket with standby
//! 3. read-modify-write only the target bit field
//! 4. settle 100 ms, read back and decode with the chip's layout
//! 5. update [`RadioState`](crate::radio::RadioState) only on a match
//! 6. restore the previous mode and settle again
//!
//! LoRa-only parameters requested in FSK mode switch the modem to LoRa first.

use crate::constants::{CHANNEL_MAX, PAYLOAD_LENGTH_SETTLE_MS, SETTLE_MS};
use crate::error::{RadioError, Result};
use crate::radio::driver::{PowerSetting, Sx127xDriver};
use crate::radio::hal::Hal;
use crate::radio::modulation::{
    requires_low_data_rate_optimize, Bandwidth, CodingRate, HeaderMode, LoRaPreset,
    ModemSettings, ModulationFamily, SpreadingFactor,
};
use crate::radio::registers::*;
use crate::radio::variant::RegisterBit;

fn verify(setting: &'static str, expected: u32, actual: u32) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        log::error!(
            "Could not set {}: expected 0x{:X}, read back 0x{:X}",
            setting,
            expected,
            actual
        );
        Err(RadioError::Verification {
            setting,
            expected,
            actual,
        })
    }
}

impl<H: Hal> Sx127xDriver<H> {
    /// Read `addr`, clear `mask`, OR in `bits`, write it back
    fn modify_register(&mut self, addr: u8, mask: u8, bits: u8) -> Result<()> {
        let value = self.read_register(addr)?;
        self.write_register(addr, (value & !mask) | (bits & mask))
    }

    fn set_bit(&mut self, bit: RegisterBit, on: bool) -> Result<()> {
        self.modify_register(bit.register, bit.mask, if on { bit.mask } else { 0 })
    }

    fn read_bit(&mut self, bit: RegisterBit) -> Result<bool> {
        Ok(self.read_register(bit.register)? & bit.mask != 0)
    }

    /// Set the spreading factor.
    ///
    /// SF6 additionally selects implicit header mode and the SF6 detection
    /// settings; every other SF selects explicit header mode. The
    /// LowDataRateOptimize bit is recomputed against the bandwidth currently
    /// programmed in the chip.
    pub fn set_spreading_factor(&mut self, sf: SpreadingFactor) -> Result<()> {
        let layout = self.layout()?;
        self.ensure_lora("spreading factor")?;
        log::debug!("Setting spreading factor {}", sf.value());

        self.with_standby_settled(|d| {
            let bw = d.bandwidth_from_chip()?;
            let ldro = requires_low_data_rate_optimize(sf, bw);
            let header = sf.header_mode();

            d.modify_register(REG_MODEM_CONFIG2, 0xF0, sf.value() << 4)?;
            d.set_bit(layout.low_data_rate_optimize(), ldro)?;
            d.set_bit(layout.agc_auto_on(), true)?;
            d.write_header_bit(header)?;
            if sf == SpreadingFactor::SF6 {
                d.write_register(REG_DETECT_OPTIMIZE, DETECT_OPTIMIZE_SF6)?;
                d.write_register(REG_DETECTION_THRESHOLD, DETECTION_THRESHOLD_SF6)?;
            } else {
                d.write_register(REG_DETECT_OPTIMIZE, DETECT_OPTIMIZE_SF7_12)?;
                d.write_register(REG_DETECTION_THRESHOLD, DETECTION_THRESHOLD_SF7_12)?;
            }
            d.bus.delay_ms(SETTLE_MS);

            let field = d.read_register(REG_MODEM_CONFIG2)? >> 4;
            verify("spreading factor", u32::from(sf.value()), u32::from(field))?;
            let ldro_set = d.read_bit(layout.low_data_rate_optimize())?;
            verify("low data rate optimize", u32::from(ldro), u32::from(ldro_set))?;
            d.verify_header_bit(header)?;

            d.state.spreading_factor = sf;
            d.state.bandwidth = bw;
            d.state.header_mode = header;
            log::debug!("Spreading factor {} set (LDRO {})", sf.value(), ldro);
            Ok(())
        })
    }

    /// Set the signal bandwidth; the SX1272 only accepts 125/250/500 kHz
    pub fn set_bandwidth(&mut self, bw: Bandwidth) -> Result<()> {
        let layout = self.layout()?;
        if !layout.supports_bandwidth(bw) {
            return Err(RadioError::InvalidRequest(format!(
                "{:?} is not supported by the {}",
                bw,
                layout.variant()
            )));
        }
        self.ensure_lora("bandwidth")?;
        log::debug!("Setting bandwidth {} Hz", bw.hz());

        self.with_standby_settled(|d| {
            let sf = d.spreading_factor_from_chip()?;
            let ldro = requires_low_data_rate_optimize(sf, bw);

            let mc1 = d.read_register(REG_MODEM_CONFIG1)?;
            d.write_register(REG_MODEM_CONFIG1, layout.encode_bandwidth(mc1, bw))?;
            d.set_bit(layout.low_data_rate_optimize(), ldro)?;
            d.bus.delay_ms(SETTLE_MS);

            let mc1 = d.read_register(REG_MODEM_CONFIG1)?;
            let field = layout.decode_bandwidth(mc1).map_or(0xFF, |b| b.code());
            verify("bandwidth", u32::from(bw.code()), u32::from(field))?;
            let ldro_set = d.read_bit(layout.low_data_rate_optimize())?;
            verify("low data rate optimize", u32::from(ldro), u32::from(ldro_set))?;

            d.state.bandwidth = bw;
            d.state.spreading_factor = sf;
            Ok(())
        })
    }

    /// Set the coding rate (4/5 to 4/8)
    pub fn set_coding_rate(&mut self, cr: CodingRate) -> Result<()> {
        let layout = self.layout()?;
        self.ensure_lora("coding rate")?;
        log::debug!("Setting coding rate 4/{}", cr.code() + 4);

        self.with_standby_settled(|d| {
            let mc1 = d.read_register(REG_MODEM_CONFIG1)?;
            d.write_register(REG_MODEM_CONFIG1, layout.encode_coding_rate(mc1, cr))?;
            d.bus.delay_ms(SETTLE_MS);

            let mc1 = d.read_register(REG_MODEM_CONFIG1)?;
            let code = layout.decode_coding_rate(mc1);
            verify("coding rate", u32::from(cr.code()), u32::from(code))?;
            d.state.coding_rate = cr;
            Ok(())
        })
    }

    /// Set the LoRa sync word
    pub fn set_sync_word(&mut self, sync_word: u8) -> Result<()> {
        self.layout()?;
        self.ensure_lora("sync word")?;

        self.with_standby_settled(|d| {
            d.write_register(REG_SYNC_WORD, sync_word)?;
            d.bus.delay_ms(SETTLE_MS);
            let value = d.read_register(REG_SYNC_WORD)?;
            verify("sync word", u32::from(sync_word), u32::from(value))?;
            d.state.sync_word = sync_word;
            log::debug!("Sync word 0x{:02X} set", sync_word);
            Ok(())
        })
    }

    /// Select explicit or implicit LoRa headers; SF6 only allows implicit
    pub fn set_header_mode(&mut self, mode: HeaderMode) -> Result<()> {
        self.layout()?;
        if self.state.spreading_factor == SpreadingFactor::SF6 && mode == HeaderMode::Explicit {
            return Err(RadioError::InvalidRequest(
                "spreading factor 6 requires implicit header mode".into(),
            ));
        }
        self.ensure_lora("header mode")?;

        self.with_standby_settled(|d| {
            d.write_header_bit(mode)?;
            d.verify_header_bit(mode)?;
            d.state.header_mode = mode;
            Ok(())
        })
    }

    fn write_header_bit(&mut self, mode: HeaderMode) -> Result<()> {
        let bit = RegisterBit {
            register: REG_MODEM_CONFIG1,
            mask: self.layout()?.implicit_header_bit(),
        };
        self.set_bit(bit, mode == HeaderMode::Implicit)
    }

    fn verify_header_bit(&mut self, mode: HeaderMode) -> Result<()> {
        let mask = self.layout()?.implicit_header_bit();
        let implicit = self.read_register(REG_MODEM_CONFIG1)? & mask != 0;
        verify(
            "header mode",
            u32::from(mode == HeaderMode::Implicit),
            u32::from(implicit),
        )
    }

    /// Tune to a 24-bit `RegFrf` word
    pub fn set_channel(&mut self, channel: u32) -> Result<()> {
        self.layout()?;
        if channel > CHANNEL_MAX {
            return Err(RadioError::InvalidRequest(format!(
                "channel 0x{channel:X} does not fit in 24 bits"
            )));
        }

        self.with_standby_settled(|d| {
            d.write_register(REG_FRF_MSB, (channel >> 16) as u8)?;
            d.write_register(REG_FRF_MID, (channel >> 8) as u8)?;
            d.write_register(REG_FRF_LSB, channel as u8)?;
            d.bus.delay_ms(SETTLE_MS);

            let actual = d.channel()?;
            verify("channel", channel, actual)?;
            d.state.channel = channel;
            log::debug!("Channel 0x{:06X} set", channel);
            Ok(())
        })
    }

    /// The `RegFrf` word currently programmed in the chip
    pub fn channel(&mut self) -> Result<u32> {
        let msb = self.read_register(REG_FRF_MSB)?;
        let mid = self.read_register(REG_FRF_MID)?;
        let lsb = self.read_register(REG_FRF_LSB)?;
        Ok(u32::from(msb) << 16 | u32::from(mid) << 8 | u32::from(lsb))
    }

    /// Set the output power.
    ///
    /// Accepts up to 14 dBm on the normal PA paths, or exactly 20 dBm which
    /// enables the PA DAC high-power mode on PA_BOOST and raises the
    /// over-current limit to 150 mA.
    ///
    /// `RegPaConfig` is written and verified first; the PA DAC and
    /// over-current registers are only touched once it reads back.
    pub fn set_power_dbm(&mut self, dbm: i8) -> Result<()> {
        let layout = self.layout()?;
        let extreme = dbm == 20;
        let pa_config = if extreme {
            if !self.state.pa_boost {
                return Err(RadioError::InvalidRequest(
                    "20 dBm is only available on PA_BOOST".into(),
                ));
            }
            layout.pa_config_extreme()
        } else if dbm > 14 {
            return Err(RadioError::InvalidRequest(format!(
                "output power {dbm} dBm above 14 dBm"
            )));
        } else {
            layout.pa_config(dbm, self.state.pa_boost)?
        };
        log::debug!("Setting output power {} dBm (PA config 0x{:02X})", dbm, pa_config);

        self.with_standby_settled(|d| {
            d.write_register(REG_PA_CONFIG, pa_config)?;
            let value = d.read_register(REG_PA_CONFIG)?;
            verify("output power", u32::from(pa_config), u32::from(value))?;

            if extreme {
                d.write_register(layout.pa_dac_register(), PA_DAC_HIGH_POWER)?;
                d.write_ocp(0x12)?;
            } else {
                d.write_register(layout.pa_dac_register(), PA_DAC_DEFAULT)?;
                d.write_ocp(if dbm > 10 { 0x10 } else { 0x0B })?;
            }
            d.state.power = PowerSetting {
                raw: pa_config,
                dbm,
            };
            Ok(())
        })
    }

    /// Enable over-current protection with trim code `rate` (at most 0x1B)
    pub fn set_max_current(&mut self, rate: u8) -> Result<()> {
        if rate > OCP_TRIM_MAX {
            return Err(RadioError::InvalidRequest(format!(
                "over-current trim 0x{rate:02X} above 0x{OCP_TRIM_MAX:02X}"
            )));
        }
        self.with_standby(|d| d.write_ocp(rate))
    }

    fn write_ocp(&mut self, rate: u8) -> Result<()> {
        let value = rate | OCP_ON;
        self.write_register(REG_OCP, value)?;
        let actual = self.read_register(REG_OCP)?;
        verify("over-current protection", u32::from(value), u32::from(actual))
    }

    /// Program the payload length register of the current modem
    pub fn set_payload_length(&mut self, length: u8) -> Result<()> {
        let register = match self.state.modulation_family {
            ModulationFamily::LoRa => REG_PAYLOAD_LENGTH_LORA,
            ModulationFamily::Fsk => REG_PAYLOAD_LENGTH_FSK,
        };
        let result = self.with_standby(|d| {
            d.write_register(register, length)?;
            let actual = d.read_register(register)?;
            verify("payload length", u32::from(length), u32::from(actual))
        });
        self.bus.delay_ms(PAYLOAD_LENGTH_SETTLE_MS);
        result
    }

    /// Preamble length of the current modem, in symbols (LoRa) or bytes (FSK)
    pub fn preamble_length(&mut self) -> Result<u16> {
        let (msb, lsb) = match self.state.modulation_family {
            ModulationFamily::LoRa => (REG_PREAMBLE_MSB_LORA, REG_PREAMBLE_LSB_LORA),
            ModulationFamily::Fsk => (REG_PREAMBLE_MSB_FSK, REG_PREAMBLE_LSB_FSK),
        };
        let high = self.read_register(msb)?;
        let low = self.read_register(lsb)?;
        Ok(u16::from(high) << 8 | u16::from(low))
    }

    /// Spreading factor currently programmed in the chip
    pub fn spreading_factor_from_chip(&mut self) -> Result<SpreadingFactor> {
        let field = self.read_register(REG_MODEM_CONFIG2)? >> 4;
        SpreadingFactor::from_value(field).ok_or(RadioError::Verification {
            setting: "spreading factor",
            expected: u32::from(self.state.spreading_factor.value()),
            actual: u32::from(field),
        })
    }

    /// Bandwidth currently programmed in the chip
    pub fn bandwidth_from_chip(&mut self) -> Result<Bandwidth> {
        let layout = self.layout()?;
        let mc1 = self.read_register(REG_MODEM_CONFIG1)?;
        layout.decode_bandwidth(mc1).ok_or(RadioError::Verification {
            setting: "bandwidth",
            expected: u32::from(self.state.bandwidth.code()),
            actual: u32::from(mc1),
        })
    }

    /// Coding rate currently programmed in the chip
    pub fn coding_rate_from_chip(&mut self) -> Result<CodingRate> {
        let layout = self.layout()?;
        let code = layout.decode_coding_rate(self.read_register(REG_MODEM_CONFIG1)?);
        CodingRate::from_code(code).ok_or(RadioError::Verification {
            setting: "coding rate",
            expected: u32::from(self.state.coding_rate.code()),
            actual: u32::from(code),
        })
    }

    /// Refresh the state mirror from the modem registers
    pub(crate) fn sync_state_from_chip(&mut self) -> Result<()> {
        let layout = self.layout()?;
        self.state.channel = self.channel()?;
        self.state.sync_word = self.read_register(REG_SYNC_WORD)?;
        self.state.power.raw = self.read_register(REG_PA_CONFIG)?;
        let mc1 = self.read_register(REG_MODEM_CONFIG1)?;
        self.state.header_mode = if mc1 & layout.implicit_header_bit() != 0 {
            HeaderMode::Implicit
        } else {
            HeaderMode::Explicit
        };
        self.state.spreading_factor = self.spreading_factor_from_chip()?;
        self.state.bandwidth = self.bandwidth_from_chip()?;
        self.state.coding_rate = self.coding_rate_from_chip()?;
        Ok(())
    }

    /// Apply spreading factor, bandwidth, coding rate, channel and power.
    ///
    /// All parameters are validated before the first register access.
    pub fn configure(&mut self, settings: &ModemSettings) -> Result<()> {
        let layout = self.layout()?;
        if !layout.supports_bandwidth(settings.bandwidth) {
            return Err(RadioError::InvalidRequest(format!(
                "{:?} is not supported by the {}",
                settings.bandwidth,
                layout.variant()
            )));
        }
        if settings.channel > CHANNEL_MAX {
            return Err(RadioError::InvalidRequest(format!(
                "channel 0x{:X} does not fit in 24 bits",
                settings.channel
            )));
        }
        match settings.power_dbm {
            20 if self.state.pa_boost => {}
            dbm => {
                layout.pa_config(dbm, self.state.pa_boost)?;
            }
        }

        log::info!(
            "Configuring SF{} / {} Hz / CR 4/{} / channel 0x{:06X} / {} dBm",
            settings.spreading_factor.value(),
            settings.bandwidth.hz(),
            settings.coding_rate.code() + 4,
            settings.channel,
            settings.power_dbm
        );
        self.set_coding_rate(settings.coding_rate)?;
        self.set_spreading_factor(settings.spreading_factor)?;
        self.set_bandwidth(settings.bandwidth)?;
        self.set_channel(settings.channel)?;
        self.set_power_dbm(settings.power_dbm)
    }

    /// Apply one of the numbered coding rate / SF / bandwidth presets
    pub fn apply_preset(&mut self, preset: LoRaPreset) -> Result<()> {
        let (cr, sf, bw) = preset.parameters();
        let layout = self.layout()?;
        if !layout.supports_bandwidth(bw) {
            return Err(RadioError::InvalidRequest(format!(
                "{preset:?} needs {bw:?}, not supported by the {}",
                layout.variant()
            )));
        }
        log::debug!("Applying preset {:?}", preset);
        self.set_coding_rate(cr)?;
        self.set_spreading_factor(sf)?;
        self.set_bandwidth(bw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::hal::MockHal;

    fn booted(hal: MockHal) -> Sx127xDriver<MockHal> {
        let mut driver = Sx127xDriver::new(hal);
        driver.power_on().unwrap();
        driver.hal_mut().clear_ops();
        driver
    }

    #[test]
    fn test_state_mirrors_default_table_after_boot() {
        let driver = booted(MockHal::sx1272());
        let state = driver.state();
        assert_eq!(state.spreading_factor, SpreadingFactor::SF9);
        assert_eq!(state.bandwidth, Bandwidth::BW250);
        assert_eq!(state.coding_rate, CodingRate::CR4_5);
        assert_eq!(state.channel, 0xD89999);
        assert_eq!(state.header_mode, HeaderMode::Explicit);
    }

    #[test]
    fn test_sf12_bw125_sets_ldro_sx1276() {
        let mut driver = booted(MockHal::sx1276());
        driver.set_bandwidth(Bandwidth::BW125).unwrap();
        driver.set_spreading_factor(SpreadingFactor::SF12).unwrap();
        assert_eq!(driver.hal().register(REG_MODEM_CONFIG3) & 0x08, 0x08);
        assert_eq!(driver.hal().register(REG_MODEM_CONFIG3) & 0x04, 0x04);
        assert_eq!(driver.hal().register(REG_MODEM_CONFIG2) >> 4, 12);
    }

    #[test]
    fn test_sf12_bw125_sets_ldro_sx1272() {
        let mut driver = booted(MockHal::sx1272());
        driver.set_bandwidth(Bandwidth::BW125).unwrap();
        driver.set_spreading_factor(SpreadingFactor::SF12).unwrap();
        assert_eq!(driver.hal().register(REG_MODEM_CONFIG1) & 0x01, 0x01);
        assert_eq!(driver.hal().register(REG_MODEM_CONFIG2) & 0x04, 0x04);
    }

    #[test]
    fn test_sf6_forces_implicit_header_and_detection() {
        let mut driver = booted(MockHal::sx1276());
        driver.set_spreading_factor(SpreadingFactor::SF6).unwrap();
        assert_eq!(driver.state().header_mode, HeaderMode::Implicit);
        assert_eq!(driver.hal().register(REG_MODEM_CONFIG1) & 0x01, 0x01);
        assert_eq!(driver.hal().register(REG_DETECT_OPTIMIZE), 0x05);
        assert_eq!(driver.hal().register(REG_DETECTION_THRESHOLD), 0x0C);

        assert!(matches!(
            driver.set_header_mode(HeaderMode::Explicit),
            Err(RadioError::InvalidRequest(_))
        ));

        driver.set_spreading_factor(SpreadingFactor::SF7).unwrap();
        assert_eq!(driver.state().header_mode, HeaderMode::Explicit);
        assert_eq!(driver.hal().register(REG_DETECT_OPTIMIZE), 0x03);
        assert_eq!(driver.hal().register(REG_DETECTION_THRESHOLD), 0x0A);
    }

    #[test]
    fn test_sx1272_rejects_narrow_bandwidth_without_bus_traffic() {
        let mut driver = booted(MockHal::sx1272());
        assert!(matches!(
            driver.set_bandwidth(Bandwidth::BW62_5),
            Err(RadioError::InvalidRequest(_))
        ));
        assert!(driver.hal().ops().is_empty());
    }

    #[test]
    fn test_coding_rate_preserves_other_bits() {
        let mut driver = booted(MockHal::sx1272());
        driver.set_coding_rate(CodingRate::CR4_8).unwrap();
        // BW250 field and CRC bit untouched
        assert_eq!(driver.hal().register(REG_MODEM_CONFIG1), 0x62);
        assert_eq!(driver.state().coding_rate, CodingRate::CR4_8);
    }

    #[test]
    fn test_verification_mismatch_keeps_state() {
        let mut hal = MockHal::sx1276();
        hal.pin_register(REG_FRF_LSB, 0x00);
        let mut driver = booted(hal);
        let before = driver.state().channel;

        match driver.set_channel(0xD90666) {
            Err(RadioError::Verification {
                setting,
                expected,
                actual,
            }) => {
                assert_eq!(setting, "channel");
                assert_eq!(expected, 0xD90666);
                assert_eq!(actual, 0xD90600);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(driver.state().channel, before);
        assert_eq!(driver.hal().register(REG_OP_MODE), LORA_STANDBY_MODE);
    }

    #[test]
    fn test_power_limits() {
        let mut driver = booted(MockHal::sx1276());
        assert!(matches!(
            driver.set_power_dbm(17),
            Err(RadioError::InvalidRequest(_))
        ));
        assert!(driver.hal().ops().is_empty());

        driver.set_power_dbm(20).unwrap();
        assert_eq!(driver.hal().register(REG_PA_DAC_SX1276), 0x87);
        assert_eq!(driver.hal().register(REG_OCP), 0x32);
        assert_eq!(driver.hal().register(REG_PA_CONFIG), 0xFF);

        driver.set_power_dbm(14).unwrap();
        assert_eq!(driver.hal().register(REG_PA_DAC_SX1276), 0x84);
        assert_eq!(driver.hal().register(REG_OCP), 0x30);
        assert_eq!(driver.state().power, PowerSetting { raw: 0xFC, dbm: 14 });

        driver.set_power_dbm(10).unwrap();
        assert_eq!(driver.hal().register(REG_OCP), 0x2B);
    }

    #[test]
    fn test_power_mismatch_leaves_dac_and_ocp_alone() {
        let mut hal = MockHal::sx1272();
        hal.pin_register(REG_PA_CONFIG, 0x00);
        let mut driver = booted(hal);
        let before = driver.state().power;

        match driver.set_power_dbm(20) {
            Err(RadioError::Verification { setting, .. }) => assert_eq!(setting, "output power"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(driver.hal().writes_to(REG_PA_DAC_SX1272).is_empty());
        assert!(driver.hal().writes_to(REG_OCP).is_empty());
        assert_eq!(driver.state().power, before);
        assert_eq!(driver.hal().register(REG_OP_MODE), LORA_STANDBY_MODE);
    }

    #[test]
    fn test_header_mode_settles_after_restore() {
        let mut driver = booted(MockHal::sx1276());
        let start = driver.hal().elapsed_ms();
        driver.set_header_mode(HeaderMode::Implicit).unwrap();
        assert_eq!(driver.hal().elapsed_ms() - start, u64::from(SETTLE_MS));
        assert_eq!(driver.hal().register(REG_MODEM_CONFIG1) & 0x01, 0x01);
    }

    #[test]
    fn test_max_current_ceiling() {
        let mut driver = booted(MockHal::sx1272());
        assert!(driver.set_max_current(0x1C).is_err());
        assert!(driver.hal().ops().is_empty());
        driver.set_max_current(0x1B).unwrap();
        assert_eq!(driver.hal().register(REG_OCP), 0x3B);
    }

    #[test]
    fn test_lora_setter_in_fsk_switches_to_lora() {
        let mut driver = booted(MockHal::sx1276());
        driver.enter_fsk_mode().unwrap();
        driver.set_sync_word(0x34).unwrap();
        assert_eq!(driver.state().modulation_family, ModulationFamily::LoRa);
        assert_eq!(driver.hal().register(REG_SYNC_WORD), 0x34);
    }

    #[test]
    fn test_apply_preset() {
        let mut driver = booted(MockHal::sx1276());
        driver.apply_preset(LoRaPreset::Mode2).unwrap();
        assert_eq!(driver.state().spreading_factor, SpreadingFactor::SF12);
        assert_eq!(driver.state().bandwidth, Bandwidth::BW250);
        assert_eq!(driver.hal().register(REG_MODEM_CONFIG3) & 0x08, 0x08);
    }

    #[test]
    fn test_setters_require_power_on() {
        let mut driver = Sx127xDriver::new(MockHal::sx1276());
        assert!(matches!(
            driver.set_sync_word(0x34),
            Err(RadioError::NotPoweredOn)
        ));
    }
}
