//! # Packet forwarder
//!
//! The single-channel gateway loop. Each cycle first drains the downlinks
//! queued by other tasks, transmitting them in order, then listens for one
//! uplink and hands it to an [`UplinkSink`].
//!
//! The radio is owned by the loop; other threads only hold the sending half
//! of a `tokio::sync::mpsc` channel, so the driver never needs a lock.
//!
//! ```rust
//! use sx127x_rs::forwarder::{PacketForwarder, VecSink};
//! use sx127x_rs::radio::{MockHal, ModemSettings, SimulatedPacket, Sx127xDriver, TxRequest};
//!
//! let mut hal = MockHal::sx1276();
//! hal.queue_packet(SimulatedPacket::new(b"uplink"));
//! let (tx, rx) = tokio::sync::mpsc::channel(8);
//!
//! let mut forwarder = PacketForwarder::new(Sx127xDriver::new(hal), VecSink::default(), rx, 1_000);
//! forwarder.start(&ModemSettings::default())?;
//! tx.try_send(TxRequest::new(b"downlink".to_vec())).unwrap();
//! forwarder.run_cycles(1)?;
//!
//! assert_eq!(forwarder.stats().downlinks_sent, 1);
//! assert_eq!(forwarder.sink().packets[0].payload, b"uplink");
//! # Ok::<(), sx127x_rs::RadioError>(())
//! ```

use crate::error::{RadioError, Result};
use crate::{log_error_throttled, log_warn_throttled};
use crate::radio::boot::BootReport;
use crate::radio::modulation::ModemSettings;
use crate::radio::radio_driver::{Radio, RxPacket, TxRequest};
use crate::util::logging::LogThrottle;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::Receiver;

/// Destination for received packets
pub trait UplinkSink {
    fn deliver(&mut self, packet: RxPacket);
}

/// Sink that keeps every packet in memory
#[derive(Debug, Default)]
pub struct VecSink {
    pub packets: Vec<RxPacket>,
}

impl UplinkSink for VecSink {
    fn deliver(&mut self, packet: RxPacket) {
        self.packets.push(packet);
    }
}

impl<F: FnMut(RxPacket)> UplinkSink for F {
    fn deliver(&mut self, packet: RxPacket) {
        self(packet)
    }
}

/// Counters kept across cycles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwarderStats {
    pub cycles: u64,
    pub uplinks: u64,
    pub crc_errors: u64,
    pub rx_timeouts: u64,
    pub downlinks_sent: u64,
    pub downlink_failures: u64,
}

/// What the receive half of a cycle produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Uplink,
    CrcError,
    Idle,
}

/// Gateway loop over any [`Radio`]
pub struct PacketForwarder<R: Radio, S: UplinkSink> {
    radio: R,
    sink: S,
    downlinks: Receiver<TxRequest>,
    downlinks_open: bool,
    rx_timeout_ms: u32,
    stats: ForwarderStats,
    crc_throttle: LogThrottle,
    error_throttle: LogThrottle,
}

impl<R: Radio, S: UplinkSink> PacketForwarder<R, S> {
    pub fn new(radio: R, sink: S, downlinks: Receiver<TxRequest>, rx_timeout_ms: u32) -> Self {
        Self {
            radio,
            sink,
            downlinks,
            downlinks_open: true,
            rx_timeout_ms,
            stats: ForwarderStats::default(),
            crc_throttle: LogThrottle::new(10_000, 5),
            error_throttle: LogThrottle::new(10_000, 3),
        }
    }

    /// Boot the radio and apply `settings`.
    ///
    /// An unsupported chip is reported as an error; there is nothing to
    /// forward with.
    pub fn start(&mut self, settings: &ModemSettings) -> Result<BootReport> {
        let report = self.radio.power_on()?;
        for warning in &report.warnings {
            log::warn!("{} boot: {:?}: {}", self.radio.name(), warning.step, warning.message);
        }
        self.radio.configure(settings)?;
        log::info!("{} forwarding, rx window {} ms", self.radio.name(), self.rx_timeout_ms);
        Ok(report)
    }

    /// Transmit every queued downlink; returns how many were sent
    pub fn drain_downlinks(&mut self) -> Result<usize> {
        let mut sent = 0;
        while self.downlinks_open {
            let request = match self.downlinks.try_recv() {
                Ok(request) => request,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::debug!("Downlink queue closed");
                    self.downlinks_open = false;
                    break;
                }
            };
            match self.radio.send(&request) {
                Ok(()) => {
                    self.stats.downlinks_sent += 1;
                    sent += 1;
                }
                Err(e @ (RadioError::Timeout { .. } | RadioError::InvalidRequest(_))) => {
                    log::warn!("Downlink of {} bytes dropped: {}", request.payload.len(), e);
                    self.stats.downlink_failures += 1;
                }
                Err(e) => {
                    log_error_throttled!(
                        self.error_throttle,
                        "{} downlink failed: {}",
                        self.radio.name(),
                        e
                    );
                    return Err(e);
                }
            }
        }
        Ok(sent)
    }

    /// One cycle: downlinks first, then a single receive window
    pub fn poll_once(&mut self) -> Result<CycleOutcome> {
        self.drain_downlinks()?;
        self.stats.cycles += 1;

        match self.radio.receive(self.rx_timeout_ms) {
            Ok(packet) => {
                log::info!(
                    "Uplink: {} bytes, RSSI {:?} dBm, SNR {:?} dB",
                    packet.payload.len(),
                    packet.rssi,
                    packet.snr_db()
                );
                self.stats.uplinks += 1;
                self.sink.deliver(packet);
                Ok(CycleOutcome::Uplink)
            }
            Err(RadioError::BadCrc(packet)) => {
                self.stats.crc_errors += 1;
                log_warn_throttled!(
                    self.crc_throttle,
                    "Dropped uplink with bad CRC ({} bytes)",
                    packet.payload.len()
                );
                Ok(CycleOutcome::CrcError)
            }
            Err(RadioError::Timeout { .. }) => {
                self.stats.rx_timeouts += 1;
                Ok(CycleOutcome::Idle)
            }
            Err(e) => {
                log_error_throttled!(
                    self.error_throttle,
                    "{} receive failed: {}",
                    self.radio.name(),
                    e
                );
                Err(e)
            }
        }
    }

    /// Run `cycles` cycles and return the statistics
    pub fn run_cycles(&mut self, cycles: u64) -> Result<ForwarderStats> {
        for _ in 0..cycles {
            self.poll_once()?;
        }
        Ok(self.stats)
    }

    /// Run until `stop` is set, then put the radio to sleep
    pub fn run_until(&mut self, stop: &AtomicBool) -> Result<ForwarderStats> {
        while !stop.load(Ordering::Relaxed) {
            self.poll_once()?;
        }
        self.drain_downlinks()?;
        self.radio.power_off()?;
        log::info!("Forwarder stopped after {} cycles", self.stats.cycles);
        Ok(self.stats)
    }

    pub fn stats(&self) -> ForwarderStats {
        self.stats
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_parts(self) -> (R, S) {
        (self.radio, self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::hal::{MockHal, SimulatedPacket};
    use crate::radio::Sx127xDriver;
    use tokio::sync::mpsc;

    #[test]
    fn test_downlinks_before_receive() {
        let mut hal = MockHal::sx1276();
        hal.queue_packet(SimulatedPacket::new(b"up"));
        let (tx, rx) = mpsc::channel(4);
        let mut forwarder = PacketForwarder::new(Sx127xDriver::new(hal), VecSink::default(), rx, 500);
        forwarder.start(&ModemSettings::default()).unwrap();

        tx.try_send(TxRequest::new(b"one".to_vec())).unwrap();
        tx.try_send(TxRequest::new(b"two".to_vec())).unwrap();
        assert_eq!(forwarder.poll_once().unwrap(), CycleOutcome::Uplink);

        let (driver, sink) = forwarder.into_parts();
        assert_eq!(driver.hal().tx_frames(), &[b"one".to_vec(), b"two".to_vec()]);
        assert_eq!(sink.packets.len(), 1);
    }

    #[test]
    fn test_stats_count_outcomes() {
        let mut hal = MockHal::sx1272();
        hal.queue_packet(SimulatedPacket::new(b"bad").with_crc_error());
        hal.queue_packet(SimulatedPacket::new(b"good"));
        let (_tx, rx) = mpsc::channel(1);
        let mut forwarder = PacketForwarder::new(Sx127xDriver::new(hal), VecSink::default(), rx, 300);
        forwarder.start(&ModemSettings::default()).unwrap();

        let stats = forwarder.run_cycles(3).unwrap();
        assert_eq!(
            stats,
            ForwarderStats {
                cycles: 3,
                uplinks: 1,
                crc_errors: 1,
                rx_timeouts: 1,
                downlinks_sent: 0,
                downlink_failures: 0,
            }
        );
    }

    #[test]
    fn test_oversized_downlink_is_dropped() {
        let (tx, rx) = mpsc::channel(1);
        let mut forwarder =
            PacketForwarder::new(Sx127xDriver::new(MockHal::sx1276()), VecSink::default(), rx, 100);
        forwarder.start(&ModemSettings::default()).unwrap();

        tx.try_send(TxRequest::new(vec![0; 300])).unwrap();
        drop(tx);
        assert_eq!(forwarder.drain_downlinks().unwrap(), 0);
        assert_eq!(forwarder.stats().downlink_failures, 1);
        // closed queue is not an error
        assert_eq!(forwarder.drain_downlinks().unwrap(), 0);
    }

    #[test]
    fn test_unsupported_chip_halts_start() {
        let (_tx, rx) = mpsc::channel(1);
        let mut forwarder =
            PacketForwarder::new(Sx127xDriver::new(MockHal::new(0x00)), VecSink::default(), rx, 100);
        assert!(matches!(
            forwarder.start(&ModemSettings::default()),
            Err(RadioError::UnsupportedChip { version: 0 })
        ));
    }

    #[test]
    fn test_transport_errors_are_logged_throttled() {
        let (tx, rx) = mpsc::channel(4);
        let mut forwarder =
            PacketForwarder::new(Sx127xDriver::new(MockHal::sx1272()), VecSink::default(), rx, 100);
        forwarder.start(&ModemSettings::default()).unwrap();
        forwarder.radio.hal_mut().fail_after(0);

        for _ in 0..5 {
            assert!(forwarder.poll_once().unwrap_err().is_transport());
        }
        tx.try_send(TxRequest::new(b"down".to_vec())).unwrap();
        assert!(forwarder.drain_downlinks().unwrap_err().is_transport());

        let throttle = forwarder.error_throttle.stats();
        assert_eq!(throttle.count, 6);
        assert_eq!(throttle.suppressed, 3);
        assert_eq!(forwarder.stats().cycles, 5);
        assert_eq!(forwarder.crc_throttle.stats().count, 0);
    }

    #[test]
    fn test_run_until_stops_and_sleeps() {
        let (_tx, rx) = mpsc::channel(1);
        let mut received = Vec::new();
        {
            let mut forwarder = PacketForwarder::new(
                Sx127xDriver::new(MockHal::sx1276()),
                |p: RxPacket| received.push(p),
                rx,
                100,
            );
            forwarder.start(&ModemSettings::default()).unwrap();
            let stop = AtomicBool::new(true);
            let stats = forwarder.run_until(&stop).unwrap();
            assert_eq!(stats.cycles, 0);
            assert!(!forwarder.radio().is_powered_on());
        }
        assert!(received.is_empty());
    }
}
