//! # Simulated SX127x register file
//!
//! `MockHal` answers the two-byte register protocol from an in-memory copy of
//! the chip's 128 registers and its 256-byte FIFO, and models the handful of
//! behaviours the driver relies on:
//!
//! - `RegOpMode` only changes LongRangeMode while the chip sleeps
//! - IRQ flag registers are write-one-to-clear
//! - entering Tx captures the FIFO contents and raises TxDone / PacketSent
//! - entering Rx delivers the next queued [`SimulatedPacket`]
//! - image calibration reports "running" for a configurable number of polls
//! - a reset pulse restores the power-on register state
//!
//! Every exchange is journaled as a [`BusOp`] so tests can assert on exact
//! register traffic. Delays are accounted, not slept.

use super::{Hal, HalError, Pin};
use crate::radio::registers::*;
use std::collections::{HashMap, VecDeque};

const REGISTER_COUNT: usize = 128;
const FIFO_SIZE: usize = 256;

/// One decoded register exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOp {
    Read { addr: u8, value: u8 },
    Write { addr: u8, value: u8 },
}

/// A packet the simulated receiver hands out on the next Rx entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedPacket {
    pub payload: Vec<u8>,
    /// Transmitter enabled the payload CRC (`RegHopChannel` bit 6)
    pub crc_on_payload: bool,
    /// Hardware flagged a payload CRC error
    pub crc_error: bool,
    /// `RegPktSnrValue`
    pub snr_raw: u8,
    /// `RegPktRssiValue`
    pub rssi_raw: u8,
    /// Time after Rx entry before RxDone is raised
    pub arrival_ms: u64,
}

impl SimulatedPacket {
    pub fn new(payload: &[u8]) -> Self {
        Self {
            payload: payload.to_vec(),
            crc_on_payload: true,
            crc_error: false,
            snr_raw: 0x28,
            rssi_raw: 0x50,
            arrival_ms: 0,
        }
    }

    pub fn with_crc_error(mut self) -> Self {
        self.crc_error = true;
        self
    }

    pub fn without_crc(mut self) -> Self {
        self.crc_on_payload = false;
        self
    }

    pub fn with_link(mut self, snr_raw: u8, rssi_raw: u8) -> Self {
        self.snr_raw = snr_raw;
        self.rssi_raw = rssi_raw;
        self
    }

    pub fn arriving_after(mut self, ms: u64) -> Self {
        self.arrival_ms = ms;
        self
    }
}

/// In-memory SX127x used by tests and the CLI simulator
#[derive(Debug)]
pub struct MockHal {
    version: u8,
    registers: [u8; REGISTER_COUNT],
    fifo: [u8; FIFO_SIZE],
    fsk_fifo: VecDeque<u8>,
    cs_low: bool,
    reset_low: bool,
    ops: Vec<BusOp>,
    gpio_log: Vec<(Pin, bool)>,
    elapsed_ms: u64,
    rx_queue: VecDeque<SimulatedPacket>,
    pending_rx: Option<(SimulatedPacket, u64)>,
    tx_frames: Vec<Vec<u8>>,
    tx_entries: usize,
    rx_entries: usize,
    fifo_writes: usize,
    tx_completes: bool,
    refuse_lora: bool,
    image_cal_latency: Option<u32>,
    image_cal_remaining: Option<u32>,
    pinned: HashMap<u8, u8>,
    fail_after: Option<usize>,
    fail_once: Option<usize>,
    transfers: usize,
}

impl MockHal {
    /// Chip reporting `version` in `RegVersion`
    pub fn new(version: u8) -> Self {
        let mut hal = Self {
            version,
            registers: [0; REGISTER_COUNT],
            fifo: [0; FIFO_SIZE],
            fsk_fifo: VecDeque::new(),
            cs_low: false,
            reset_low: false,
            ops: Vec::new(),
            gpio_log: Vec::new(),
            elapsed_ms: 0,
            rx_queue: VecDeque::new(),
            pending_rx: None,
            tx_frames: Vec::new(),
            tx_entries: 0,
            rx_entries: 0,
            fifo_writes: 0,
            tx_completes: true,
            refuse_lora: false,
            image_cal_latency: Some(3),
            image_cal_remaining: None,
            pinned: HashMap::new(),
            fail_after: None,
            fail_once: None,
            transfers: 0,
        };
        hal.power_on_reset();
        hal
    }

    pub fn sx1272() -> Self {
        Self::new(VERSION_SX1272)
    }

    pub fn sx1276() -> Self {
        Self::new(VERSION_SX1276)
    }

    fn power_on_reset(&mut self) {
        self.registers = [0; REGISTER_COUNT];
        self.registers[REG_OP_MODE as usize] = FSK_STANDBY_MODE;
        self.registers[REG_VERSION as usize] = self.version;
        self.registers[REG_IMAGE_CAL as usize] = 0x82;
        self.fsk_fifo.clear();
        self.pending_rx = None;
        self.image_cal_remaining = None;
    }

    // ---------------------------------------------------------------------
    // Scenario setup
    // ---------------------------------------------------------------------

    /// Queue a packet for the next Rx entry
    pub fn queue_packet(&mut self, packet: SimulatedPacket) {
        self.rx_queue.push_back(packet);
    }

    /// Whether entering Tx raises the completion flag
    pub fn set_tx_completes(&mut self, completes: bool) {
        self.tx_completes = completes;
    }

    /// Keep LongRangeMode stuck at FSK
    pub fn refuse_lora_mode(&mut self, refuse: bool) {
        self.refuse_lora = refuse;
    }

    /// Polls of `RegImageCal` before the running bit clears; `None` never clears
    pub fn set_image_cal_latency(&mut self, polls: Option<u32>) {
        self.image_cal_latency = polls;
    }

    /// Make `addr` ignore writes and always read `value`
    pub fn pin_register(&mut self, addr: u8, value: u8) {
        self.pinned.insert(addr & 0x7F, value);
        self.registers[(addr & 0x7F) as usize] = value;
    }

    /// Fail every transfer after the next `n` succeed
    pub fn fail_after(&mut self, n: usize) {
        self.fail_after = Some(self.transfers + n);
    }

    /// Fail only the transfer after the next `n` succeed
    pub fn fail_once_after(&mut self, n: usize) {
        self.fail_once = Some(self.transfers + n + 1);
    }

    /// Poke a register without journaling the access
    pub fn set_register(&mut self, addr: u8, value: u8) {
        self.registers[(addr & 0x7F) as usize] = value;
    }

    // ---------------------------------------------------------------------
    // Observation
    // ---------------------------------------------------------------------

    pub fn register(&self, addr: u8) -> u8 {
        self.registers[(addr & 0x7F) as usize]
    }

    pub fn ops(&self) -> &[BusOp] {
        &self.ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// All register writes in order
    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.ops
            .iter()
            .filter_map(|op| match *op {
                BusOp::Write { addr, value } => Some((addr, value)),
                BusOp::Read { .. } => None,
            })
            .collect()
    }

    /// Values written to `addr` in order
    pub fn writes_to(&self, addr: u8) -> Vec<u8> {
        self.writes()
            .into_iter()
            .filter(|(a, _)| *a == addr)
            .map(|(_, v)| v)
            .collect()
    }

    pub fn gpio_log(&self) -> &[(Pin, bool)] {
        &self.gpio_log
    }

    pub fn chip_selected(&self) -> bool {
        self.cs_low
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn tx_frames(&self) -> &[Vec<u8>] {
        &self.tx_frames
    }

    pub fn tx_mode_entries(&self) -> usize {
        self.tx_entries
    }

    pub fn rx_mode_entries(&self) -> usize {
        self.rx_entries
    }

    /// Bytes written through `RegFifo`
    pub fn fifo_write_count(&self) -> usize {
        self.fifo_writes
    }

    // ---------------------------------------------------------------------
    // Register semantics
    // ---------------------------------------------------------------------

    fn lora(&self) -> bool {
        self.registers[REG_OP_MODE as usize] & LONG_RANGE_MODE != 0
    }

    fn read(&mut self, addr: u8) -> u8 {
        self.deliver_due_packet();
        match addr {
            REG_FIFO => {
                if self.lora() {
                    let ptr = self.registers[REG_FIFO_ADDR_PTR as usize];
                    self.registers[REG_FIFO_ADDR_PTR as usize] = ptr.wrapping_add(1);
                    self.fifo[ptr as usize]
                } else {
                    self.fsk_fifo.pop_front().unwrap_or(0)
                }
            }
            REG_IMAGE_CAL => {
                if let Some(remaining) = self.image_cal_remaining {
                    if remaining <= 1 {
                        self.image_cal_remaining = None;
                        self.registers[REG_IMAGE_CAL as usize] &= !IMAGE_CAL_RUNNING;
                    } else {
                        self.image_cal_remaining = Some(remaining - 1);
                    }
                }
                self.registers[REG_IMAGE_CAL as usize]
            }
            _ => self.registers[addr as usize],
        }
    }

    fn write(&mut self, addr: u8, value: u8) {
        if self.pinned.contains_key(&addr) {
            return;
        }
        match addr {
            REG_FIFO => {
                self.fifo_writes += 1;
                if self.lora() {
                    let ptr = self.registers[REG_FIFO_ADDR_PTR as usize];
                    self.fifo[ptr as usize] = value;
                    self.registers[REG_FIFO_ADDR_PTR as usize] = ptr.wrapping_add(1);
                } else {
                    self.fsk_fifo.push_back(value);
                }
            }
            REG_OP_MODE => self.write_op_mode(value),
            REG_IRQ_FLAGS | REG_IRQ_FLAGS1 | REG_IRQ_FLAGS2 => {
                self.registers[addr as usize] &= !value;
            }
            REG_IMAGE_CAL => {
                if value & IMAGE_CAL_START != 0 {
                    self.registers[addr as usize] = (value & !IMAGE_CAL_START) | IMAGE_CAL_RUNNING;
                    // u32::MAX polls is "never" for any caller with a poll bound
                    self.image_cal_remaining = Some(self.image_cal_latency.unwrap_or(u32::MAX));
                } else {
                    self.registers[addr as usize] = value;
                }
            }
            REG_VERSION | REG_FIFO_RX_CURRENT_ADDR | REG_RX_NB_BYTES | REG_PKT_SNR_VALUE
            | REG_PKT_RSSI_VALUE | REG_HOP_CHANNEL => {}
            _ => self.registers[addr as usize] = value,
        }
    }

    fn write_op_mode(&mut self, value: u8) {
        let current = self.registers[REG_OP_MODE as usize];
        let mut next = value;
        let sleeping = current & 0x07 == 0;
        if !sleeping {
            next = (next & !LONG_RANGE_MODE) | (current & LONG_RANGE_MODE);
        }
        if self.refuse_lora {
            next &= !LONG_RANGE_MODE;
        }
        self.registers[REG_OP_MODE as usize] = next;

        match next & 0x07 {
            0x03 => self.enter_tx(),
            0x05 => self.enter_rx(),
            _ => {}
        }
    }

    fn enter_tx(&mut self) {
        self.tx_entries += 1;
        if self.lora() {
            let len = self.registers[REG_PAYLOAD_LENGTH_LORA as usize] as usize;
            let frame = (0..len)
                .map(|i| self.fifo[(FIFO_TX_BASE as usize + i) % FIFO_SIZE])
                .collect();
            self.tx_frames.push(frame);
            if self.tx_completes {
                self.registers[REG_IRQ_FLAGS as usize] |= IrqFlags::TX_DONE.bits();
            }
        } else {
            self.tx_frames.push(self.fsk_fifo.drain(..).collect());
            if self.tx_completes {
                self.registers[REG_IRQ_FLAGS2 as usize] |= FskIrqFlags2::PACKET_SENT.bits();
            }
        }
    }

    fn enter_rx(&mut self) {
        self.rx_entries += 1;
        if self.pending_rx.is_none() {
            if let Some(packet) = self.rx_queue.pop_front() {
                let due = self.elapsed_ms + packet.arrival_ms;
                self.pending_rx = Some((packet, due));
            }
        }
        self.deliver_due_packet();
    }

    fn deliver_due_packet(&mut self) {
        let due = matches!(self.pending_rx, Some((_, at)) if at <= self.elapsed_ms);
        if !due || self.registers[REG_OP_MODE as usize] & 0x07 != 0x05 {
            return;
        }
        let Some((packet, _)) = self.pending_rx.take() else {
            return;
        };

        if self.lora() {
            let base = self.registers[REG_FIFO_RX_BASE_ADDR as usize];
            for (i, byte) in packet.payload.iter().enumerate() {
                self.fifo[(base as usize + i) % FIFO_SIZE] = *byte;
            }
            self.registers[REG_FIFO_RX_CURRENT_ADDR as usize] = base;
            self.registers[REG_RX_NB_BYTES as usize] = packet.payload.len() as u8;
            self.registers[REG_PKT_SNR_VALUE as usize] = packet.snr_raw;
            self.registers[REG_PKT_RSSI_VALUE as usize] = packet.rssi_raw;
            self.registers[REG_HOP_CHANNEL as usize] = if packet.crc_on_payload {
                HOP_CHANNEL_CRC_ON_PAYLOAD
            } else {
                0
            };
            let mut flags = IrqFlags::RX_DONE | IrqFlags::VALID_HEADER;
            if packet.crc_error {
                flags |= IrqFlags::PAYLOAD_CRC_ERROR;
            }
            self.registers[REG_IRQ_FLAGS as usize] |= flags.bits();
        } else {
            self.fsk_fifo.clear();
            self.fsk_fifo.extend(packet.payload.iter().copied());
            let mut flags = FskIrqFlags2::PAYLOAD_READY;
            if !packet.crc_error {
                flags |= FskIrqFlags2::CRC_OK;
            }
            self.registers[REG_IRQ_FLAGS2 as usize] |= flags.bits();
        }
    }
}

impl Hal for MockHal {
    fn transfer(&mut self, buf: &mut [u8]) -> Result<(), HalError> {
        self.transfers += 1;
        if matches!(self.fail_after, Some(limit) if self.transfers > limit) {
            return Err(HalError::Spi("injected transfer fault".into()));
        }
        if self.fail_once == Some(self.transfers) {
            self.fail_once = None;
            return Err(HalError::Spi("injected transfer fault".into()));
        }
        if !self.cs_low {
            return Err(HalError::Spi("transfer with chip select deasserted".into()));
        }
        if buf.len() != 2 {
            return Err(HalError::Spi(format!("expected 2-byte frame, got {}", buf.len())));
        }

        let addr = buf[0] & 0x7F;
        if buf[0] & 0x80 != 0 {
            let value = buf[1];
            self.ops.push(BusOp::Write { addr, value });
            self.write(addr, value);
            buf[1] = 0;
        } else {
            let value = self.read(addr);
            self.ops.push(BusOp::Read { addr, value });
            buf[1] = value;
        }
        buf[0] = 0;
        Ok(())
    }

    fn gpio_write(&mut self, pin: Pin, high: bool) -> Result<(), HalError> {
        self.gpio_log.push((pin, high));
        match pin {
            Pin::ChipSelect => self.cs_low = !high,
            Pin::Reset => {
                if self.reset_low && high {
                    self.power_on_reset();
                }
                self.reset_low = !high;
            }
        }
        Ok(())
    }

    fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ms += u64::from(ms);
        self.deliver_due_packet();
    }
}
