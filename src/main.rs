use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use sx127x_rs::forwarder::PacketForwarder;
use sx127x_rs::logging::{log_error, log_info, verbosity_level};
use sx127x_rs::radio::hal::{Hal, MockHal, SimulatedPacket};
use sx127x_rs::util::hex::{decode_hex, encode_hex};
use sx127x_rs::{init_logger_with_level, RadioConfig, RxPacket, Sx127xDriver, TxRequest};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

type BoxedHal = Box<dyn Hal + Send>;

#[derive(Parser)]
#[command(name = "sx127x-cli")]
#[command(about = "CLI tool for SX1272/SX1276 LoRa radios")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use the simulated register file instead of hardware
    #[arg(long)]
    simulate: bool,

    /// Increase log verbosity (-v debug, -vv register trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reset the chip and report what was found
    Probe,
    /// Forward uplinks as JSON lines; hex lines on stdin are sent as downlinks
    Listen {
        /// Stop after this many receive windows
        #[arg(long)]
        cycles: Option<u64>,
    },
    /// Transmit one hex-encoded payload
    Send { payload: String },
}

fn open_hal(config: &RadioConfig, simulate: bool) -> Result<BoxedHal> {
    if simulate {
        let mut hal = MockHal::sx1276();
        for (i, text) in ["sim uplink 1", "sim uplink 2", "sim uplink 3"].iter().enumerate() {
            hal.queue_packet(SimulatedPacket::new(text.as_bytes()).arriving_after(400 * (i as u64 + 1)));
        }
        return Ok(Box::new(hal));
    }
    open_hardware(config)
}

#[cfg(feature = "raspberry-pi")]
fn open_hardware(config: &RadioConfig) -> Result<BoxedHal> {
    use sx127x_rs::radio::hal::RaspberryPiHal;
    let hal = RaspberryPiHal::new(config.spi_bus, config.spi_clock_hz, &config.gpio_pins())
        .context("Failed to open SPI/GPIO")?;
    Ok(Box::new(hal))
}

#[cfg(not(feature = "raspberry-pi"))]
fn open_hardware(_config: &RadioConfig) -> Result<BoxedHal> {
    anyhow::bail!("built without the raspberry-pi feature; use --simulate")
}

fn print_uplink(packet: RxPacket) {
    match serde_json::to_string(&packet) {
        Ok(line) => println!("{line}"),
        Err(e) => log_error(&format!("Could not encode uplink: {e}")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger_with_level(verbosity_level(cli.verbose));

    let config = match &cli.config {
        Some(path) => RadioConfig::from_json_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => RadioConfig::default(),
    };
    let hal = open_hal(&config, cli.simulate)?;
    let mut radio = Sx127xDriver::with_options(hal, config.driver_options());

    match cli.command {
        Commands::Probe => {
            let report = radio.power_on().context("Power on failed")?;
            log_info(&format!(
                "{} (version 0x{:02X}), LoRa mode after {} attempt(s), preamble {}",
                report.variant,
                report.variant.version(),
                report.lora_mode_attempts,
                report.preamble_length
            ));
            for warning in &report.warnings {
                log_info(&format!("warning: {:?}: {}", warning.step, warning.message));
            }
            log_info(&format!("state: {:?}", radio.state()));
            radio.power_off()?;
        }
        Commands::Send { payload } => {
            let bytes = decode_hex(&payload).context("Payload is not valid hex")?;
            radio.power_on().context("Power on failed")?;
            radio.configure(&config.modem_settings()?)?;
            let request = TxRequest::new(bytes).with_timeout(config.tx_timeout_ms);
            radio.send(&request).context("Transmit failed")?;
            log_info(&format!("Sent {}", encode_hex(&request.payload)));
            radio.power_off()?;
        }
        Commands::Listen { cycles } => {
            let (tx, rx) = mpsc::channel::<TxRequest>(16);
            let stop = Arc::new(AtomicBool::new(false));
            let tx_timeout_ms = config.tx_timeout_ms;

            tokio::spawn(async move {
                let mut lines = BufReader::new(tokio::io::stdin()).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match decode_hex(&line) {
                        Ok(bytes) => {
                            let request = TxRequest::new(bytes).with_timeout(tx_timeout_ms);
                            if tx.send(request).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => log_error(&format!("Ignoring downlink: {e}")),
                    }
                }
            });

            let ctrl_c_stop = stop.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    ctrl_c_stop.store(true, Ordering::Relaxed);
                }
            });

            let settings = config.modem_settings()?;
            let rx_timeout_ms = config.rx_timeout_ms;
            let stats = tokio::task::spawn_blocking(move || -> Result<_> {
                let mut forwarder = PacketForwarder::new(radio, print_uplink, rx, rx_timeout_ms);
                forwarder.start(&settings)?;
                let stats = match cycles {
                    Some(n) => forwarder.run_cycles(n)?,
                    None => forwarder.run_until(&stop)?,
                };
                Ok(stats)
            })
            .await
            .context("Radio task panicked")??;

            log_info(&format!(
                "{} cycles, {} uplinks, {} CRC errors, {} downlinks",
                stats.cycles, stats.uplinks, stats.crc_errors, stats.downlinks_sent
            ));
        }
    }

    Ok(())
}
