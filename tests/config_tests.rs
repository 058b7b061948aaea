//! Tests for loading `RadioConfig` from disk and applying it to a driver.

use std::io::Write;
use sx127x_rs::constants::CH_17_868;
use sx127x_rs::radio::hal::MockHal;
use sx127x_rs::radio::registers::REG_SYNC_WORD;
use sx127x_rs::radio::{Bandwidth, SpreadingFactor};
use sx127x_rs::{ConfigError, RadioConfig, Sx127xDriver};
use tempfile::NamedTempFile;

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

/// Tests that a configuration file drives boot and `configure`.
#[test]
fn test_config_file_to_driver() {
    let file = write_config(
        r#"{
            "modem": { "spreading_factor": "SF7", "bandwidth": "BW500", "power_dbm": 20 },
            "frequency_hz": 868000000,
            "sync_word": 52,
            "max_retries": 3
        }"#,
    );
    let config = RadioConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.modem_settings().unwrap().channel, CH_17_868);

    let mut driver = Sx127xDriver::with_options(MockHal::sx1276(), config.driver_options());
    driver.power_on().unwrap();
    driver.configure(&config.modem_settings().unwrap()).unwrap();

    let state = driver.state();
    assert_eq!(state.spreading_factor, SpreadingFactor::SF7);
    assert_eq!(state.bandwidth, Bandwidth::BW500);
    assert_eq!(state.channel, CH_17_868);
    assert_eq!(state.power.dbm, 20);
    assert_eq!(state.max_retries, 3);
    assert_eq!(driver.hal().register(REG_SYNC_WORD), 0x34);
}

/// Tests that a missing file is reported as an I/O error.
#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = RadioConfig::from_json_file(dir.path().join("absent.json"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

/// Tests that malformed JSON is reported as a parse error.
#[test]
fn test_malformed_file() {
    let file = write_config("{ \"spi_bus\": ");
    assert!(matches!(
        RadioConfig::from_json_file(file.path()),
        Err(ConfigError::Parse(_))
    ));
}

/// Tests that a saved configuration loads back unchanged.
#[test]
fn test_pretty_json_reloads() {
    let mut config = RadioConfig::default();
    config.modem.spreading_factor = SpreadingFactor::SF10;
    config.rx_timeout_ms = 5_000;

    let file = write_config(&config.to_json_pretty().unwrap());
    assert_eq!(RadioConfig::from_json_file(file.path()).unwrap(), config);
}

/// Tests that a carrier beyond the 24-bit channel word is rejected, not wrapped.
#[test]
fn test_out_of_range_frequency_file() {
    let file = write_config(r#"{ "frequency_hz": 35185240188832 }"#);
    match RadioConfig::from_json_file(file.path()) {
        Err(ConfigError::Invalid(msg)) => assert!(msg.contains("35185240188832"), "{msg}"),
        other => panic!("unexpected {other:?}"),
    }
}
