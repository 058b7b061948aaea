//! # Radio configuration
//!
//! JSON configuration for the CLI and the packet forwarder. Every field has
//! a default, so `{}` is a valid file describing an SX127x module on SPI0
//! (CE0 via GPIO 25, reset on GPIO 17) listening at SF12/BW125 on 865.2 MHz.
//!
//! ```json
//! {
//!   "spi_bus": 0,
//!   "modem": { "spreading_factor": "SF9", "bandwidth": "BW125" },
//!   "frequency_hz": 868100000,
//!   "sync_word": 52
//! }
//! ```

use crate::constants::{
    channel_to_frequency, frequency_to_channel, CHANNEL_MAX, DEFAULT_LORA_MODE_ATTEMPTS,
    DEFAULT_SYNC_WORD, DEFAULT_TX_TIMEOUT_MS, MAX_RETRIES, MAX_WAIT_MS,
};
use crate::radio::driver::DriverOptions;
use crate::radio::modulation::ModemSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Highest SPI clock accepted for the SX127x
pub const MAX_SPI_CLOCK_HZ: u32 = 10_000_000;

fn default_spi_clock_hz() -> u32 {
    1_000_000
}

fn default_chip_select_pin() -> u8 {
    25
}

fn default_reset_pin() -> u8 {
    17
}

fn default_sync_word() -> u8 {
    DEFAULT_SYNC_WORD
}

fn default_true() -> bool {
    true
}

fn default_rx_timeout_ms() -> u32 {
    MAX_WAIT_MS
}

fn default_tx_timeout_ms() -> u32 {
    DEFAULT_TX_TIMEOUT_MS
}

fn default_max_retries() -> u8 {
    MAX_RETRIES
}

fn default_lora_mode_attempts() -> u32 {
    DEFAULT_LORA_MODE_ATTEMPTS
}

/// Hardware wiring plus modem and timing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioConfig {
    #[serde(default)]
    pub spi_bus: u8,
    #[serde(default = "default_spi_clock_hz")]
    pub spi_clock_hz: u32,
    /// BCM number of the GPIO driving NSS
    #[serde(default = "default_chip_select_pin")]
    pub chip_select_pin: u8,
    /// BCM number of the GPIO driving NRESET
    #[serde(default = "default_reset_pin")]
    pub reset_pin: u8,
    #[serde(default)]
    pub modem: ModemSettings,
    /// Carrier frequency; overrides `modem.channel` when present
    #[serde(default)]
    pub frequency_hz: Option<u64>,
    #[serde(default = "default_sync_word")]
    pub sync_word: u8,
    #[serde(default = "default_true")]
    pub pa_boost: bool,
    #[serde(default = "default_rx_timeout_ms")]
    pub rx_timeout_ms: u32,
    #[serde(default = "default_tx_timeout_ms")]
    pub tx_timeout_ms: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u8,
    #[serde(default = "default_lora_mode_attempts")]
    pub lora_mode_attempts: u32,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            spi_bus: 0,
            spi_clock_hz: default_spi_clock_hz(),
            chip_select_pin: default_chip_select_pin(),
            reset_pin: default_reset_pin(),
            modem: ModemSettings::default(),
            frequency_hz: None,
            sync_word: DEFAULT_SYNC_WORD,
            pa_boost: true,
            rx_timeout_ms: MAX_WAIT_MS,
            tx_timeout_ms: DEFAULT_TX_TIMEOUT_MS,
            max_retries: MAX_RETRIES,
            lora_mode_attempts: DEFAULT_LORA_MODE_ATTEMPTS,
        }
    }
}

impl RadioConfig {
    /// Load and validate a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: RadioConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the limits that do not depend on the chip variant
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spi_clock_hz == 0 || self.spi_clock_hz > MAX_SPI_CLOCK_HZ {
            return Err(ConfigError::Invalid(format!(
                "spi_clock_hz {} outside 1..={}",
                self.spi_clock_hz, MAX_SPI_CLOCK_HZ
            )));
        }
        if self.chip_select_pin == self.reset_pin {
            return Err(ConfigError::Invalid(format!(
                "chip select and reset share GPIO {}",
                self.reset_pin
            )));
        }
        if self.rx_timeout_ms > MAX_WAIT_MS {
            return Err(ConfigError::Invalid(format!(
                "rx_timeout_ms {} above {} ms",
                self.rx_timeout_ms, MAX_WAIT_MS
            )));
        }
        if self.lora_mode_attempts == 0 {
            return Err(ConfigError::Invalid("lora_mode_attempts must be at least 1".into()));
        }
        let dbm = self.modem.power_dbm;
        if dbm > 14 && dbm != 20 {
            return Err(ConfigError::Invalid(format!(
                "power_dbm {dbm} above 14 dBm (only 20 dBm is allowed beyond)"
            )));
        }
        if dbm == 20 && !self.pa_boost {
            return Err(ConfigError::Invalid("20 dBm requires pa_boost".into()));
        }
        self.modem_settings()?;
        Ok(())
    }

    /// Modem settings with `frequency_hz` folded into the channel word
    pub fn modem_settings(&self) -> Result<ModemSettings, ConfigError> {
        let mut settings = self.modem;
        if let Some(freq) = self.frequency_hz {
            settings.channel = frequency_to_channel(freq).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "frequency_hz {} above {} Hz",
                    freq,
                    channel_to_frequency(CHANNEL_MAX)
                ))
            })?;
        }
        if settings.channel > CHANNEL_MAX {
            return Err(ConfigError::Invalid(format!(
                "channel 0x{:X} does not fit in 24 bits",
                settings.channel
            )));
        }
        Ok(settings)
    }

    /// Carrier frequency the configuration resolves to
    pub fn frequency(&self) -> Result<u64, ConfigError> {
        Ok(channel_to_frequency(self.modem_settings()?.channel))
    }

    pub fn driver_options(&self) -> DriverOptions {
        DriverOptions {
            lora_mode_attempts: self.lora_mode_attempts,
            max_retries: self.max_retries,
            pa_boost: self.pa_boost,
            sync_word: self.sync_word,
        }
    }

    #[cfg(feature = "raspberry-pi")]
    pub fn gpio_pins(&self) -> crate::radio::hal::GpioPins {
        crate::radio::hal::GpioPins {
            chip_select: self.chip_select_pin,
            reset: self.reset_pin,
        }
    }
}
