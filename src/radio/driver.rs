//! # SX127x Radio Driver
//!
//! `Sx127xDriver` owns one SPI bus and the mirror of the chip configuration
//! ([`RadioState`]). The implementation is split by concern:
//!
//! - this file: construction, state and the mode controller
//! - [`crate::radio::boot`]: reset, identification, calibration, defaults
//! - [`crate::radio::modem`]: verified modulation setters
//! - [`crate::radio::packet`]: transmit and receive cycles
//! - [`crate::radio::link_quality`]: SNR and RSSI
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────┐
//! │   PacketForwarder / CLI / app   │
//! ├─────────────────────────────────┤
//! │  Sx127xDriver (Radio trait)     │
//! ├─────────────────────────────────┤
//! │  RegisterLayout (SX1272/SX1276) │
//! ├─────────────────────────────────┤
//! │  RegisterBus (2-byte framing)   │
//! ├─────────────────────────────────┤
//! │  Hal (rppal / MockHal)          │
//! └─────────────────────────────────┘
//! ```
//!
//! All operations are blocking and take `&mut self`; one driver instance
//! serves exactly one chip.
//!
//! ## Usage Example
//!
//! ```rust
//! use sx127x_rs::radio::hal::{MockHal, SimulatedPacket};
//! use sx127x_rs::radio::Sx127xDriver;
//!
//! let mut hal = MockHal::sx1276();
//! hal.queue_packet(SimulatedPacket::new(b"hello"));
//!
//! let mut radio = Sx127xDriver::new(hal);
//! radio.power_on()?;
//! let packet = radio.receive(5_000)?;
//! assert_eq!(packet.payload, b"hello");
//! # Ok::<(), sx127x_rs::RadioError>(())
//! ```

use crate::constants::{CH_10_868, DEFAULT_LORA_MODE_ATTEMPTS, DEFAULT_SYNC_WORD, MAX_RETRIES, SETTLE_MS};
use crate::error::{RadioError, Result};
use crate::radio::bus::RegisterBus;
use crate::radio::hal::Hal;
use crate::radio::modulation::{Bandwidth, CodingRate, HeaderMode, ModulationFamily, SpreadingFactor};
use crate::radio::registers::*;
use crate::radio::variant::{RegisterLayout, Variant};

/// Last confirmed PA programming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PowerSetting {
    /// `RegPaConfig` value
    pub raw: u8,
    /// Requested output power
    pub dbm: i8,
}

/// Driver-side mirror of the chip configuration.
///
/// Fields only change after the corresponding register write has been read
/// back and verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioState {
    /// `None` until `power_on` has identified the chip
    pub variant: Option<Variant>,
    pub modulation_family: ModulationFamily,
    pub spreading_factor: SpreadingFactor,
    pub bandwidth: Bandwidth,
    pub coding_rate: CodingRate,
    pub sync_word: u8,
    /// 24-bit `RegFrf` word
    pub channel: u32,
    pub power: PowerSetting,
    pub header_mode: HeaderMode,
    /// Use the PA_BOOST pin (most modules only wire this one)
    pub pa_boost: bool,
    pub retry_count: u8,
    pub max_retries: u8,
}

impl Default for RadioState {
    fn default() -> Self {
        Self {
            variant: None,
            modulation_family: ModulationFamily::Fsk,
            spreading_factor: SpreadingFactor::SF7,
            bandwidth: Bandwidth::BW125,
            coding_rate: CodingRate::CR4_5,
            sync_word: DEFAULT_SYNC_WORD,
            channel: CH_10_868,
            power: PowerSetting::default(),
            header_mode: HeaderMode::Explicit,
            pa_boost: true,
            retry_count: 0,
            max_retries: MAX_RETRIES,
        }
    }
}

/// Construction-time knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverOptions {
    /// Ceiling for LoRa mode switch attempts
    pub lora_mode_attempts: u32,
    pub max_retries: u8,
    pub pa_boost: bool,
    /// Sync word applied at the end of `power_on`
    pub sync_word: u8,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            lora_mode_attempts: DEFAULT_LORA_MODE_ATTEMPTS,
            max_retries: MAX_RETRIES,
            pa_boost: true,
            sync_word: DEFAULT_SYNC_WORD,
        }
    }
}

/// SX1272/SX1276 driver over a [`Hal`]
pub struct Sx127xDriver<H: Hal> {
    pub(crate) bus: RegisterBus<H>,
    pub(crate) layout: Option<&'static dyn RegisterLayout>,
    pub(crate) state: RadioState,
    pub(crate) options: DriverOptions,
}

impl<H: Hal> Sx127xDriver<H> {
    pub fn new(hal: H) -> Self {
        Self::with_options(hal, DriverOptions::default())
    }

    pub fn with_options(hal: H, options: DriverOptions) -> Self {
        let state = RadioState {
            pa_boost: options.pa_boost,
            max_retries: options.max_retries,
            ..RadioState::default()
        };
        Self {
            bus: RegisterBus::new(hal),
            layout: None,
            state,
            options,
        }
    }

    pub fn state(&self) -> &RadioState {
        &self.state
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    pub fn variant(&self) -> Option<Variant> {
        self.state.variant
    }

    pub fn is_powered_on(&self) -> bool {
        self.layout.is_some()
    }

    pub fn hal(&self) -> &H {
        self.bus.hal()
    }

    pub fn hal_mut(&mut self) -> &mut H {
        self.bus.hal_mut()
    }

    /// Give back the HAL, e.g. to release the SPI device
    pub fn release(self) -> H {
        self.bus.into_inner()
    }

    pub(crate) fn layout(&self) -> Result<&'static dyn RegisterLayout> {
        self.layout.ok_or(RadioError::NotPoweredOn)
    }

    pub fn read_register(&mut self, addr: u8) -> Result<u8> {
        Ok(self.bus.read_register(addr)?)
    }

    pub fn write_register(&mut self, addr: u8, value: u8) -> Result<()> {
        Ok(self.bus.write_register(addr, value)?)
    }

    /// Current `RegOpMode`
    pub fn op_mode(&mut self) -> Result<u8> {
        self.read_register(REG_OP_MODE)
    }

    /// Switch to `mode` within the current modulation family
    pub fn set_op_mode(&mut self, mode: OpMode) -> Result<()> {
        let value = self.state.modulation_family.op_mode(mode);
        self.write_register(REG_OP_MODE, value)
    }

    /// Run `f` with the chip in standby, then restore the previous mode.
    ///
    /// The restore is attempted even when `f` or the standby write fails; the
    /// first error wins.
    pub fn with_standby<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let previous = self.read_register(REG_OP_MODE)?;
        let standby = self.state.modulation_family.standby();
        let result = match self.write_register(REG_OP_MODE, standby) {
            Ok(()) => f(self),
            Err(e) => Err(e),
        };
        let restored = self.write_register(REG_OP_MODE, previous);
        let value = result?;
        restored?;
        Ok(value)
    }

    /// [`Self::with_standby`] followed by the post-restore settle delay
    pub(crate) fn with_standby_settled<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let result = self.with_standby(f);
        self.bus.delay_ms(SETTLE_MS);
        result
    }

    /// Switch to LoRa first if a LoRa-only `setting` is requested in FSK mode
    pub(crate) fn ensure_lora(&mut self, setting: &str) -> Result<()> {
        if self.state.modulation_family == ModulationFamily::Fsk {
            log::warn!("FSK has no {setting} parameter, switching to LoRa mode");
            self.enter_lora_mode()?;
        }
        Ok(())
    }

    /// Cycle FSK sleep, LoRa sleep and LoRa standby until `RegOpMode` reads
    /// back LoRa standby.
    ///
    /// Returns the number of attempts used. Attempt `n` waits
    /// `50 + 10 * (n % 21)` ms before reading back.
    pub fn enter_lora_mode(&mut self) -> Result<u32> {
        let attempts = self.options.lora_mode_attempts.max(1);
        let mut mode = 0;
        for attempt in 0..attempts {
            self.write_register(REG_OP_MODE, FSK_SLEEP_MODE)?;
            self.write_register(REG_OP_MODE, LORA_SLEEP_MODE)?;
            self.write_register(REG_OP_MODE, LORA_STANDBY_MODE)?;
            self.bus.delay_ms(50 + 10 * (attempt % 21));
            mode = self.read_register(REG_OP_MODE)?;
            if mode == LORA_STANDBY_MODE {
                self.state.modulation_family = ModulationFamily::LoRa;
                log::debug!("LoRa mode confirmed after {} attempt(s)", attempt + 1);
                return Ok(attempt + 1);
            }
            log::trace!("LoRa mode attempt {} read back 0x{:02X}", attempt + 1, mode);
        }

        self.state.modulation_family = if mode & LONG_RANGE_MODE != 0 {
            ModulationFamily::LoRa
        } else {
            ModulationFamily::Fsk
        };
        log::error!("Could not enter LoRa mode after {attempts} attempts");
        Err(RadioError::ModeSwitch { attempts })
    }

    /// Switch the modem to FSK standby
    pub fn enter_fsk_mode(&mut self) -> Result<()> {
        let sleep = self.state.modulation_family.op_mode(OpMode::Sleep);
        self.write_register(REG_OP_MODE, sleep)?;
        self.write_register(REG_OP_MODE, FSK_SLEEP_MODE)?;
        self.write_register(REG_OP_MODE, FSK_STANDBY_MODE)?;
        self.bus.delay_ms(SETTLE_MS);

        let mode = self.read_register(REG_OP_MODE)?;
        if mode != FSK_STANDBY_MODE {
            return Err(RadioError::Verification {
                setting: "FSK mode",
                expected: u32::from(FSK_STANDBY_MODE),
                actual: u32::from(mode),
            });
        }
        self.state.modulation_family = ModulationFamily::Fsk;
        log::debug!("FSK mode activated");
        Ok(())
    }
}
