//! # Packet pipeline
//!
//! Timed transmit and receive cycles for both modem families. Completion is
//! detected by polling the IRQ flag registers; elapsed time is the sum of
//! the poll delays, so a `timeout_ms` bound is exact regardless of bus
//! latency.
//!
//! ```text
//! receive:  setup -> Rx -> poll RxDone -> read FIFO -> standby -> clear flags
//! send:     [standby: clear flags, length, FIFO] -> Tx -> poll TxDone -> standby -> clear flags
//! ```

use crate::constants::{
    FSK_POLL_INTERVAL_MS, LORA_POLL_INTERVAL_MS, MAX_LENGTH, MAX_LENGTH_FSK, MAX_WAIT_MS,
    OFFSET_RSSI,
};
use crate::error::{RadioError, Result};
use crate::radio::driver::Sx127xDriver;
use crate::radio::hal::Hal;
use crate::radio::link_quality::{packet_rssi, snr_from_register};
use crate::radio::modulation::{ModulationFamily, SpreadingFactor};
use crate::radio::radio_driver::{CrcStatus, RxPacket, TxRequest};
use crate::radio::registers::*;
use crate::util::logging::log_payload_hex;

impl<H: Hal> Sx127xDriver<H> {
    /// Clear all IRQ flags of the current modem (write-one-to-clear)
    pub fn clear_irq_flags(&mut self) -> Result<()> {
        self.with_standby(|d| d.write_clear_flags())
    }

    fn write_clear_flags(&mut self) -> Result<()> {
        match self.state.modulation_family {
            ModulationFamily::LoRa => self.write_register(REG_IRQ_FLAGS, 0xFF),
            ModulationFamily::Fsk => {
                self.write_register(REG_IRQ_FLAGS1, 0xFF)?;
                self.write_register(REG_IRQ_FLAGS2, 0xFF)
            }
        }
    }

    /// Poll `register` every `interval_ms` until a bit of `mask` is set.
    ///
    /// Returns the flag register contents on success.
    fn wait_for_flag(
        &mut self,
        register: u8,
        mask: u8,
        interval_ms: u32,
        timeout_ms: u32,
        operation: &'static str,
    ) -> Result<u8> {
        let mut waited = 0;
        loop {
            let flags = self.read_register(register)?;
            if flags & mask != 0 {
                log::trace!("{} after {} ms (flags 0x{:02X})", operation, waited, flags);
                return Ok(flags);
            }
            if waited >= timeout_ms {
                return Err(RadioError::Timeout {
                    operation,
                    waited_ms: waited,
                });
            }
            let step = interval_ms.min(timeout_ms - waited);
            self.bus.delay_ms(step);
            waited += step;
        }
    }

    /// Back to standby with the flags cleared
    fn return_to_standby(&mut self) -> Result<()> {
        self.set_op_mode(OpMode::Standby)?;
        self.clear_irq_flags()
    }

    /// Leave a failed cycle in standby; `error` is what the caller sees
    fn abort_cycle(&mut self, error: RadioError) -> RadioError {
        if let Err(idle) = self.return_to_standby() {
            log::warn!("Could not return to standby: {}", idle);
        }
        error
    }

    /// Listen for one packet for at most `timeout_ms` (12 s ceiling)
    pub fn receive(&mut self, timeout_ms: u32) -> Result<RxPacket> {
        if timeout_ms > MAX_WAIT_MS {
            return Err(RadioError::InvalidRequest(format!(
                "receive timeout {timeout_ms} ms above {MAX_WAIT_MS} ms"
            )));
        }
        self.layout()?;

        let result = match self.state.modulation_family {
            ModulationFamily::LoRa => self.receive_lora(timeout_ms),
            ModulationFamily::Fsk => self.receive_fsk(timeout_ms),
        };
        self.account_retry(result)
    }

    fn receive_lora(&mut self, timeout_ms: u32) -> Result<RxPacket> {
        let layout = self.layout()?;
        log::debug!("LoRa receive, timeout {} ms", timeout_ms);

        self.write_register(REG_PA_RAMP, PA_RAMP_RX)?;
        self.write_register(REG_LNA, LNA_MAX_GAIN)?;
        self.write_register(REG_FIFO_ADDR_PTR, 0x00)?;
        let symb_timeout = if self.state.spreading_factor >= SpreadingFactor::SF10 {
            SYMB_TIMEOUT_SLOW
        } else {
            SYMB_TIMEOUT_FAST
        };
        self.write_register(REG_SYMB_TIMEOUT_LSB, symb_timeout)?;
        self.write_register(REG_FIFO_RX_BYTE_ADDR, 0x00)?;
        self.set_payload_length(MAX_LENGTH as u8)?;
        self.set_op_mode(OpMode::Rx)?;

        let flags = match self.wait_for_flag(
            REG_IRQ_FLAGS,
            IrqFlags::RX_DONE.bits(),
            LORA_POLL_INTERVAL_MS,
            timeout_ms,
            "RxDone",
        ) {
            Ok(flags) => flags,
            Err(e) => return Err(self.abort_cycle(e)),
        };

        let read = self.read_lora_payload(flags);
        let (payload, crc_status) = match read {
            Ok(value) => value,
            Err(e) => return Err(self.abort_cycle(e)),
        };
        self.return_to_standby()?;

        let snr_raw = self.read_register(REG_PKT_SNR_VALUE)?;
        let rssi_raw = self.read_register(REG_PKT_RSSI_VALUE)?;
        let correction = OFFSET_RSSI + layout.rssi_correction(self.state.channel);
        let rssi = packet_rssi(rssi_raw, snr_from_register(snr_raw), correction);

        log_payload_hex("RX", &payload);
        log::debug!(
            "Received {} bytes, RSSI {} dBm, SNR {} dB, CRC {:?}",
            payload.len(),
            rssi,
            snr_from_register(snr_raw),
            crc_status
        );
        Ok(RxPacket {
            payload,
            rssi: Some(rssi),
            snr: Some(snr_raw as i8),
            crc_status,
        })
    }

    fn read_lora_payload(&mut self, flags: u8) -> Result<(Vec<u8>, CrcStatus)> {
        let hop = self.read_register(REG_HOP_CHANNEL)?;
        let crc_status = if hop & HOP_CHANNEL_CRC_ON_PAYLOAD == 0 {
            CrcStatus::Absent
        } else if flags & IrqFlags::PAYLOAD_CRC_ERROR.bits() != 0 {
            CrcStatus::Bad
        } else {
            CrcStatus::Ok
        };

        let start = self.read_register(REG_FIFO_RX_CURRENT_ADDR)?;
        self.write_register(REG_FIFO_ADDR_PTR, start)?;
        let length = self.read_register(REG_RX_NB_BYTES)?;
        let payload = (0..length)
            .map(|_| self.read_register(REG_FIFO))
            .collect::<Result<Vec<u8>>>()?;
        Ok((payload, crc_status))
    }

    /// Fixed-length FSK packet of `RegPayloadLength` bytes
    fn receive_fsk(&mut self, timeout_ms: u32) -> Result<RxPacket> {
        log::debug!("FSK receive, timeout {} ms", timeout_ms);
        let config = self.read_register(REG_PACKET_CONFIG1)?;
        self.write_register(REG_PACKET_CONFIG1, config & !PACKET_CONFIG1_ADDRESS_FILTERING)?;
        self.set_op_mode(OpMode::Rx)?;

        let flags = match self.wait_for_flag(
            REG_IRQ_FLAGS2,
            FskIrqFlags2::PAYLOAD_READY.bits(),
            FSK_POLL_INTERVAL_MS,
            timeout_ms,
            "PayloadReady",
        ) {
            Ok(flags) => flags,
            Err(e) => return Err(self.abort_cycle(e)),
        };

        let crc_status = if config & PACKET_CONFIG1_CRC_ON == 0 {
            CrcStatus::Absent
        } else if flags & FskIrqFlags2::CRC_OK.bits() != 0 {
            CrcStatus::Ok
        } else {
            CrcStatus::Bad
        };
        let read = self.read_register(REG_PAYLOAD_LENGTH_FSK).and_then(|length| {
            (0..length)
                .map(|_| self.read_register(REG_FIFO))
                .collect::<Result<Vec<u8>>>()
        });
        let payload = match read {
            Ok(payload) => payload,
            Err(e) => return Err(self.abort_cycle(e)),
        };
        self.return_to_standby()?;

        log_payload_hex("RX", &payload);
        Ok(RxPacket {
            payload,
            rssi: None,
            snr: None,
            crc_status,
        })
    }

    /// Turn a CRC failure into `BadCrc` and keep the retry counter
    fn account_retry(&mut self, result: Result<RxPacket>) -> Result<RxPacket> {
        let packet = result?;
        if packet.crc_status == CrcStatus::Bad {
            if self.state.retry_count < self.state.max_retries {
                self.state.retry_count += 1;
            }
            log::warn!(
                "Payload CRC error, retry {}/{}",
                self.state.retry_count,
                self.state.max_retries
            );
            return Err(RadioError::BadCrc(Box::new(packet)));
        }
        self.state.retry_count = 0;
        Ok(packet)
    }

    /// Whether consecutive CRC failures have used up the retry budget
    pub fn retries_exhausted(&self) -> bool {
        self.state.retry_count >= self.state.max_retries
    }

    /// Transmit one packet and wait for TxDone / PacketSent
    pub fn send(&mut self, request: &TxRequest) -> Result<()> {
        self.layout()?;
        let family = self.state.modulation_family;
        let max = match family {
            ModulationFamily::LoRa => MAX_LENGTH,
            ModulationFamily::Fsk => MAX_LENGTH_FSK,
        };
        let payload = &request.payload;
        if payload.len() > max {
            return Err(RadioError::InvalidRequest(format!(
                "payload of {} bytes exceeds {} bytes",
                payload.len(),
                max
            )));
        }
        log::debug!("Sending {} bytes, timeout {} ms", payload.len(), request.timeout_ms);
        log_payload_hex("TX", payload);

        self.with_standby(|d| {
            d.write_clear_flags()?;
            d.set_payload_length(payload.len() as u8)?;
            if family == ModulationFamily::LoRa {
                d.write_register(REG_FIFO_TX_BASE_ADDR, FIFO_TX_BASE)?;
                d.write_register(REG_FIFO_ADDR_PTR, FIFO_TX_BASE)?;
            }
            payload
                .iter()
                .try_for_each(|byte| d.write_register(REG_FIFO, *byte))
        })?;

        self.clear_irq_flags()?;
        self.set_op_mode(OpMode::Tx)?;

        let done = match family {
            ModulationFamily::LoRa => self.wait_for_flag(
                REG_IRQ_FLAGS,
                IrqFlags::TX_DONE.bits(),
                LORA_POLL_INTERVAL_MS,
                request.timeout_ms,
                "TxDone",
            ),
            ModulationFamily::Fsk => self.wait_for_flag(
                REG_IRQ_FLAGS2,
                FskIrqFlags2::PACKET_SENT.bits(),
                FSK_POLL_INTERVAL_MS,
                request.timeout_ms,
                "PacketSent",
            ),
        };
        if let Err(e) = done {
            return Err(self.abort_cycle(e));
        }
        self.return_to_standby()?;
        log::debug!("Packet sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::hal::{MockHal, SimulatedPacket};

    fn booted(hal: MockHal) -> Sx127xDriver<MockHal> {
        let mut driver = Sx127xDriver::new(hal);
        driver.power_on().unwrap();
        driver.hal_mut().clear_ops();
        driver
    }

    #[test]
    fn test_receive_rejects_long_timeout_without_bus_traffic() {
        let mut driver = booted(MockHal::sx1276());
        assert!(matches!(
            driver.receive(12_001),
            Err(RadioError::InvalidRequest(_))
        ));
        assert!(driver.hal().ops().is_empty());
    }

    #[test]
    fn test_receive_timeout_is_exact() {
        let mut driver = booted(MockHal::sx1276());
        match driver.receive(250) {
            Err(RadioError::Timeout { waited_ms, .. }) => assert_eq!(waited_ms, 250),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(driver.hal().register(REG_OP_MODE), LORA_STANDBY_MODE);
    }

    #[test]
    fn test_receive_good_packet() {
        let mut hal = MockHal::sx1276();
        hal.queue_packet(SimulatedPacket::new(b"hello").arriving_after(300));
        let mut driver = booted(hal);

        let packet = driver.receive(1_000).unwrap();
        assert_eq!(packet.payload, b"hello");
        assert_eq!(packet.crc_status, CrcStatus::Ok);
        assert_eq!(packet.snr_db(), Some(10));
        assert_eq!(packet.rssi, Some(80 + 10 - 157));
        assert_eq!(driver.hal().register(REG_IRQ_FLAGS), 0);
        assert_eq!(driver.hal().register(REG_SYMB_TIMEOUT_LSB), SYMB_TIMEOUT_FAST);
    }

    #[test]
    fn test_receive_without_crc_is_absent() {
        let mut hal = MockHal::sx1272();
        hal.queue_packet(SimulatedPacket::new(&[1, 2, 3]).without_crc().with_crc_error());
        let mut driver = booted(hal);
        let packet = driver.receive(500).unwrap();
        assert_eq!(packet.crc_status, CrcStatus::Absent);
    }

    #[test]
    fn test_bad_crc_counts_retries() {
        let mut hal = MockHal::sx1276();
        for _ in 0..6 {
            hal.queue_packet(SimulatedPacket::new(b"x").with_crc_error());
        }
        hal.queue_packet(SimulatedPacket::new(b"ok"));
        let mut driver = booted(hal);

        match driver.receive(500) {
            Err(RadioError::BadCrc(packet)) => {
                assert_eq!(packet.payload, b"x");
                assert_eq!(packet.crc_status, CrcStatus::Bad);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(driver.state().retry_count, 1);

        for _ in 0..5 {
            assert!(driver.receive(500).is_err());
        }
        assert_eq!(driver.state().retry_count, 5);
        assert!(driver.retries_exhausted());

        driver.receive(500).unwrap();
        assert_eq!(driver.state().retry_count, 0);
    }

    #[test]
    fn test_send_twenty_bytes() {
        let mut driver = booted(MockHal::sx1276());
        let before = driver.hal().fifo_write_count();
        let payload: Vec<u8> = (0..20).collect();

        driver.send(&TxRequest::new(payload.clone())).unwrap();
        assert_eq!(driver.hal().fifo_write_count() - before, 20);
        assert_eq!(driver.hal().register(REG_PAYLOAD_LENGTH_LORA), 20);
        assert_eq!(driver.hal().tx_mode_entries(), 1);
        assert_eq!(driver.hal().tx_frames(), &[payload]);
        assert_eq!(driver.hal().register(REG_IRQ_FLAGS), 0);
    }

    #[test]
    fn test_send_timeout() {
        let mut hal = MockHal::sx1272();
        hal.set_tx_completes(false);
        let mut driver = booted(hal);
        match driver.send(&TxRequest::new(b"ping".to_vec()).with_timeout(350)) {
            Err(RadioError::Timeout { waited_ms, .. }) => assert_eq!(waited_ms, 350),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(driver.hal().register(REG_OP_MODE), LORA_STANDBY_MODE);
    }

    #[test]
    fn test_send_rejects_oversized_payload() {
        let mut driver = booted(MockHal::sx1276());
        assert!(matches!(
            driver.send(&TxRequest::new(vec![0; 256])),
            Err(RadioError::InvalidRequest(_))
        ));
        driver.enter_fsk_mode().unwrap();
        assert!(matches!(
            driver.send(&TxRequest::new(vec![0; 65])),
            Err(RadioError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_fsk_round_trip() {
        let mut hal = MockHal::sx1276();
        hal.queue_packet(SimulatedPacket::new(b"fsk!"));
        let mut driver = booted(hal);
        driver.enter_fsk_mode().unwrap();

        driver.send(&TxRequest::new(b"abc".to_vec())).unwrap();
        assert_eq!(driver.hal().tx_frames().last().unwrap(), b"abc");
        assert_eq!(driver.hal().register(REG_PAYLOAD_LENGTH_FSK), 3);

        driver.set_payload_length(4).unwrap();
        let packet = driver.receive(1_000).unwrap();
        assert_eq!(packet.payload, b"fsk!");
        assert_eq!(packet.rssi, None);
        assert_eq!(packet.snr, None);
        assert_eq!(driver.hal().register(REG_IRQ_FLAGS2), 0);
    }
}
