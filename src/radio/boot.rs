//! # Boot and calibration
//!
//! `power_on` brings a freshly reset chip into a known LoRa configuration:
//!
//! 1. pulse the reset line with chip select released
//! 2. identify the silicon from `RegVersion`
//! 3. SX1276 only: RX chain image calibration in the low and high bands
//! 4. over-current protection at its ceiling
//! 5. LoRa mode
//! 6. the power-on register table `0x00..=0x41`
//! 7. the configured sync word
//!
//! An unknown version aborts before any register is written. Verification
//! mismatches and calibration timeouts in steps 3 to 7 are collected in the
//! [`BootReport`] instead of aborting. Any other error in those steps leaves
//! the driver powered off.

use crate::constants::{CH_17_868, IMAGE_CAL_MAX_POLLS, RESET_PHASE_MS};
use crate::error::{RadioError, Result};
use crate::radio::driver::{RadioState, Sx127xDriver};
use crate::radio::hal::{Hal, Pin};
use crate::radio::modulation::ModulationFamily;
use crate::radio::registers::*;
use crate::radio::variant::Variant;

/// Boot phase a warning was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootStep {
    Calibration,
    OverCurrent,
    Defaults,
    SyncWord,
}

/// Non-fatal problem observed during boot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootWarning {
    pub step: BootStep,
    pub message: String,
}

/// Outcome of a successful `power_on`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootReport {
    pub variant: Variant,
    /// Attempts the LoRa mode switch needed
    pub lora_mode_attempts: u32,
    /// Preamble length read once LoRa mode was active
    pub preamble_length: u16,
    pub warnings: Vec<BootWarning>,
}

impl BootReport {
    fn new(variant: Variant) -> Self {
        Self {
            variant,
            lora_mode_attempts: 0,
            preamble_length: 0,
            warnings: Vec::new(),
        }
    }

    /// No step reported a mismatch or timeout
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Downgrade verification and timeout errors to warnings
    fn note(&mut self, step: BootStep, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(e @ (RadioError::Verification { .. } | RadioError::Timeout { .. })) => {
                log::warn!("Boot step {:?}: {}", step, e);
                self.warnings.push(BootWarning {
                    step,
                    message: e.to_string(),
                });
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

impl<H: Hal> Sx127xDriver<H> {
    /// Reset, identify and initialize the chip
    pub fn power_on(&mut self) -> Result<BootReport> {
        log::debug!("Starting power on sequence");
        self.layout = None;
        self.state = RadioState {
            pa_boost: self.options.pa_boost,
            max_retries: self.options.max_retries,
            ..RadioState::default()
        };

        self.reset_chip()?;

        let version = self.read_register(REG_VERSION)?;
        let Some(variant) = Variant::from_version(version) else {
            log::error!("Unknown chip version 0x{version:02X}");
            return Err(RadioError::UnsupportedChip { version });
        };
        log::info!("{} detected (version 0x{:02X})", variant, version);

        self.layout = Some(variant.layout());
        self.state.variant = Some(variant);
        match self.initialize(variant) {
            Ok(report) => Ok(report),
            Err(e) => {
                log::error!("{} boot failed: {}", variant, e);
                self.layout = None;
                self.state.variant = None;
                Err(e)
            }
        }
    }

    /// Steps 3 to 7; any error returned here leaves the chip unusable
    fn initialize(&mut self, variant: Variant) -> Result<BootReport> {
        let layout = self.layout()?;
        let mut report = BootReport::new(variant);

        if layout.needs_image_calibration() {
            self.rx_chain_calibration(&mut report)?;
        }

        let ocp = self.set_max_current(OCP_TRIM_MAX);
        report.note(BootStep::OverCurrent, ocp)?;
        log::debug!("Over-current protection set to maximum supply");

        report.lora_mode_attempts = self.enter_lora_mode()?;
        report.preamble_length = self.preamble_length()?;
        log::debug!("Preamble length: {}", report.preamble_length);

        self.write_default_registers()?;
        let synced = self.sync_state_from_chip();
        report.note(BootStep::Defaults, synced)?;

        let sync_word = self.options.sync_word;
        let sync = self.set_sync_word(sync_word);
        report.note(BootStep::SyncWord, sync)?;

        if report.is_clean() {
            log::info!("{} ready", variant);
        } else {
            log::warn!("{} ready with {} boot warning(s)", variant, report.warnings.len());
        }
        Ok(report)
    }

    /// Put the chip to sleep; further operations need a new `power_on`
    pub fn power_off(&mut self) -> Result<()> {
        if self.layout.is_none() {
            return Ok(());
        }
        self.set_op_mode(OpMode::Sleep)?;
        self.layout = None;
        log::info!("Radio powered off");
        Ok(())
    }

    /// Chip select high, then reset low and high, 100 ms per phase
    fn reset_chip(&mut self) -> Result<()> {
        self.bus.set_pin(Pin::ChipSelect, true)?;
        self.bus.delay_ms(RESET_PHASE_MS);
        self.bus.set_pin(Pin::Reset, false)?;
        self.bus.delay_ms(RESET_PHASE_MS);
        self.bus.set_pin(Pin::Reset, true)?;
        self.bus.delay_ms(RESET_PHASE_MS);
        self.state.modulation_family = ModulationFamily::Fsk;
        Ok(())
    }

    /// Image calibration of the LF band, then of the HF band at 868 MHz
    fn rx_chain_calibration(&mut self, report: &mut BootReport) -> Result<()> {
        log::debug!("Running RX chain calibration");
        // cut the PA while calibrating
        self.write_register(REG_PA_CONFIG, 0x00)?;

        let low = self.run_image_calibration("low-band image calibration");
        report.note(BootStep::Calibration, low)?;

        let retune = self.set_channel(CH_17_868);
        report.note(BootStep::Calibration, retune)?;

        let high = self.run_image_calibration("high-band image calibration");
        report.note(BootStep::Calibration, high)
    }

    fn run_image_calibration(&mut self, operation: &'static str) -> Result<()> {
        let value = self.read_register(REG_IMAGE_CAL)?;
        self.write_register(REG_IMAGE_CAL, (value & IMAGE_CAL_MASK) | IMAGE_CAL_START)?;

        for polls in 0..IMAGE_CAL_MAX_POLLS {
            if self.read_register(REG_IMAGE_CAL)? & IMAGE_CAL_RUNNING == 0 {
                log::trace!("{} finished after {} poll(s)", operation, polls + 1);
                return Ok(());
            }
            self.bus.delay_ms(1);
        }
        Err(RadioError::Timeout {
            operation,
            waited_ms: IMAGE_CAL_MAX_POLLS,
        })
    }

    fn write_default_registers(&mut self) -> Result<()> {
        let layout = self.layout()?;
        for addr in 0..DEFAULT_REGISTERS.len() as u8 {
            self.write_register(addr, layout.default_register(addr))?;
        }
        log::debug!("Default register table written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::hal::MockHal;

    #[test]
    fn test_boot_sx1272_clean() {
        let mut driver = Sx127xDriver::new(MockHal::sx1272());
        let report = driver.power_on().unwrap();
        assert_eq!(report.variant, Variant::Sx1272);
        assert!(report.is_clean(), "{:?}", report.warnings);
        assert_eq!(report.lora_mode_attempts, 1);
        assert_eq!(driver.hal().register(REG_OCP), 0x3B);
        assert_eq!(driver.hal().register(REG_MODEM_CONFIG1), 0x4A);
        assert_eq!(driver.hal().register(REG_SYNC_WORD), 0x12);
        assert_eq!(driver.hal().register(REG_OP_MODE), LORA_STANDBY_MODE);
    }

    #[test]
    fn test_boot_sx1276_calibrates() {
        let mut driver = Sx127xDriver::new(MockHal::sx1276());
        let report = driver.power_on().unwrap();
        assert!(report.is_clean(), "{:?}", report.warnings);
        let cal_starts: Vec<u8> = driver
            .hal()
            .writes_to(REG_IMAGE_CAL)
            .into_iter()
            .filter(|v| v & IMAGE_CAL_START != 0)
            .collect();
        assert_eq!(cal_starts.len(), 2);
        assert_eq!(driver.hal().writes_to(REG_FRF_MSB)[0], 0xD9);
        assert_eq!(driver.hal().register(REG_MODEM_CONFIG1), 0x82);
        assert_eq!(driver.hal().register(REG_MODEM_CONFIG3), 0x04);
        assert_eq!(driver.hal().register(REG_PA_CONFIG), 0x40);
    }

    #[test]
    fn test_boot_reset_sequence() {
        let mut driver = Sx127xDriver::new(MockHal::sx1272());
        driver.power_on().unwrap();
        let gpio = driver.hal().gpio_log();
        assert_eq!(
            &gpio[..3],
            &[(Pin::ChipSelect, true), (Pin::Reset, false), (Pin::Reset, true)]
        );
    }

    #[test]
    fn test_boot_calibration_timeout_is_a_warning() {
        let mut hal = MockHal::sx1276();
        hal.set_image_cal_latency(None);
        let mut driver = Sx127xDriver::new(hal);
        let report = driver.power_on().unwrap();
        let steps: Vec<BootStep> = report.warnings.iter().map(|w| w.step).collect();
        assert_eq!(steps, vec![BootStep::Calibration, BootStep::Calibration]);
        assert!(driver.is_powered_on());
    }

    #[test]
    fn test_boot_sync_word_mismatch_is_a_warning() {
        let mut hal = MockHal::sx1272();
        hal.pin_register(REG_SYNC_WORD, 0x00);
        let mut driver = Sx127xDriver::new(hal);
        let report = driver.power_on().unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].step, BootStep::SyncWord);
    }

    #[test]
    fn test_transport_fault_mid_boot_powers_off() {
        let mut hal = MockHal::sx1276();
        // version read, then the PA cut and the first calibration read
        hal.fail_after(3);
        let mut driver = Sx127xDriver::new(hal);
        let err = driver.power_on().unwrap_err();
        assert!(err.is_transport(), "{err}");
        assert!(!driver.is_powered_on());
        assert_eq!(driver.variant(), None);
        assert!(!driver.hal().chip_selected());
    }

    #[test]
    fn test_power_on_recovers_after_failed_boot() {
        let mut hal = MockHal::sx1272();
        hal.refuse_lora_mode(true);
        let mut driver = Sx127xDriver::new(hal);
        assert!(driver.power_on().is_err());
        assert!(!driver.is_powered_on());

        driver.hal_mut().refuse_lora_mode(false);
        let report = driver.power_on().unwrap();
        assert_eq!(report.variant, Variant::Sx1272);
        assert!(driver.is_powered_on());
    }

    #[test]
    fn test_power_off_sleeps() {
        let mut driver = Sx127xDriver::new(MockHal::sx1276());
        driver.power_on().unwrap();
        driver.power_off().unwrap();
        assert_eq!(driver.hal().register(REG_OP_MODE), LORA_SLEEP_MODE);
        assert!(!driver.is_powered_on());
    }
}
