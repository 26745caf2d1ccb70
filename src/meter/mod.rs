//! Metering-unit side: sampling pipeline, power gate and link endpoint.
//!
//! [`Meter`] owns everything the metering unit's interrupts touch:
//!
//! - the ADC-complete interrupt calls [`Meter::on_adc`]
//! - the UART RX interrupt calls [`Meter::on_uart_rx`]
//! - the UART TX-ready interrupt drains [`Meter::next_tx_byte`]
//!
//! Outbound frames go through a single-producer/single-consumer byte queue,
//! so the ADC handler never waits on the UART.
//!
//! ## Example
//!
//! ```rust
//! # use embedded_hal_mock::eh1::digital::{Mock as Pin, State as PinState, Transaction as PinTransaction};
//! use powerblade_link::meter::{Meter, MeterConfig};
//! use powerblade_link::meter::accumulator::SampleChannel;
//!
//! # let sen = Pin::new(&[PinTransaction::set(PinState::Low)]);
//! # let sys = Pin::new(&[PinTransaction::set(PinState::Low)]);
//! let mut meter = Meter::new(sen, sys, MeterConfig::default());
//! meter.on_adc(SampleChannel::Current, 12);
//! meter.on_adc(SampleChannel::Voltage, 200);
//! meter.on_adc(SampleChannel::Supply, 100);
//! while let Some(byte) = meter.next_tx_byte() {
//!     // write `byte` to the UART data register
//! #   let _ = byte;
//! }
//! # meter.gate.sense_en.done();
//! # meter.gate.sys_en.done();
//! ```

pub mod accumulator;
pub mod capture;
pub mod gate;

use embedded_hal::digital::OutputPin;
use heapless::spsc::Queue;

use crate::consts::{
    ADC_VCHG, ADC_VMIN, DEFAULT_P_SCALE, DEFAULT_V_SCALE, DEFAULT_WH_SCALE, REPORT_VERSION,
    TX_QUEUE_LEN,
};
use crate::error::LinkError;
use crate::framer::{Frame, Unframer, frame};
use crate::message::{Message, MessageType};
use crate::report::{ReportPayload, saturate_u8, saturate_u16};

use accumulator::{PowerReport, SampleChannel, SamplingAccumulator};
use capture::SampleCapture;
use gate::PowerGate;

const SECONDS_PER_HOUR: u64 = 3600;

/// Runtime configuration of the metering unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeterConfig {
    /// Supply reading below which the radio rail is cut.
    pub v_min: u16,
    /// Supply reading above which reports may be sent.
    pub v_charge: u16,
    /// Power scale factor advertised with each report.
    pub p_scale: u16,
    /// Voltage scale factor advertised with each report.
    pub v_scale: u8,
    /// Watt-hour scale factor advertised with each report.
    pub wh_scale: u8,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            v_min: ADC_VMIN,
            v_charge: ADC_VCHG,
            p_scale: DEFAULT_P_SCALE,
            v_scale: DEFAULT_V_SCALE,
            wh_scale: DEFAULT_WH_SCALE,
        }
    }
}

/// The metering unit.
///
/// ## Type Parameters
///
/// - `SEN`: sensing rail enable pin
/// - `SYS`: radio rail enable pin
#[derive(Debug)]
pub struct Meter<SEN, SYS>
where
    SEN: OutputPin,
    SYS: OutputPin,
{
    /// Cycle/second accumulation.
    pub accumulator: SamplingAccumulator,
    /// Supply-driven gate and rail enables.
    pub gate: PowerGate<SEN, SYS>,
    /// Raw-sample capture for streaming.
    pub capture: SampleCapture,
    config: MeterConfig,
    unframer: Unframer,
    tx: Queue<u8, TX_QUEUE_LEN>,
    last_frame: Frame,
    /// Sequence number of the last report built.
    pub sequence: u32,
    energy: u64,
    /// Most recent report, whether or not it was sent.
    pub last_report: Option<PowerReport>,
    /// Frames dropped because the transmit queue was full.
    pub dropped_frames: u16,
}

impl<SEN, SYS> Meter<SEN, SYS>
where
    SEN: OutputPin,
    SYS: OutputPin,
{
    /// Creates a metering unit with zeroed accumulators and both rails off.
    pub fn new(sense_en: SEN, sys_en: SYS, config: MeterConfig) -> Self {
        Self {
            accumulator: SamplingAccumulator::new(),
            gate: PowerGate::new(sense_en, sys_en, config.v_min, config.v_charge),
            capture: SampleCapture::new(),
            config,
            unframer: Unframer::new(),
            tx: Queue::new(),
            last_frame: Frame::new(),
            sequence: 0,
            energy: 0,
            last_report: None,
            dropped_frames: 0,
        }
    }

    /// Runtime configuration in use.
    pub fn config(&self) -> &MeterConfig {
        &self.config
    }

    /// Accumulated energy in watt-hours (ADC units).
    pub fn watt_hours(&self) -> u32 {
        u32::try_from(self.energy / SECONDS_PER_HOUR).unwrap_or(u32::MAX)
    }

    /// Handles one ADC conversion-complete event.
    pub fn on_adc(&mut self, channel: SampleChannel, value: u16) {
        self.accumulator.on_conversion(channel, value);
        match channel {
            SampleChannel::Current => {}
            SampleChannel::Voltage => self.capture.record(self.accumulator.current(), value),
            SampleChannel::Supply => {
                let _ = self.gate.on_supply(value);
                if let Some(report) = self.accumulator.end_round() {
                    self.on_report(report);
                }
                self.service_capture();
            }
        }
    }

    /// Handles one byte received from the radio unit.
    pub fn on_uart_rx(&mut self, byte: u8) {
        match self.unframer.push(byte) {
            Ok(message) => self.on_message(&message),
            Err(nb::Error::WouldBlock) => {}
            Err(nb::Error::Other(LinkError::UnrecognizedType(code))) => {
                debug!("meter: ignoring message type {}", code);
            }
            Err(nb::Error::Other(_)) => {
                // NAKs are not replayed; `last_frame` keeps the last reply.
                if let Ok(bytes) = frame(MessageType::Nak, &[]) {
                    let _ = self.enqueue(&bytes);
                }
            }
        }
    }

    /// Next byte for the UART, if any is queued.
    pub fn next_tx_byte(&mut self) -> Option<u8> {
        self.tx.dequeue()
    }

    /// Bytes waiting in the transmit queue.
    pub fn tx_pending(&self) -> usize {
        self.tx.len()
    }

    fn on_report(&mut self, report: PowerReport) {
        self.last_report = Some(report);
        self.energy += report.real_power as u64;
        if !self.gate.release() {
            return;
        }
        self.sequence = self.sequence.wrapping_add(1);
        let payload = ReportPayload {
            version: REPORT_VERSION,
            sequence: self.sequence,
            p_scale: self.config.p_scale,
            v_scale: self.config.v_scale,
            wh_scale: self.config.wh_scale,
            v_rms: saturate_u8(report.rms_voltage),
            real_power: saturate_u16(report.real_power),
            apparent_power: saturate_u16(report.apparent_power),
            watt_hours: self.watt_hours(),
            flags: 0,
        };
        let _ = self.send(MessageType::Data, &payload.encode());
    }

    fn on_message(&mut self, message: &Message) {
        trace!("meter: received type {}", message.kind.code());
        match message.kind {
            MessageType::Nak => self.resend_last(),
            MessageType::SetSeq => {
                if let Some(&value) = message.payload.first() {
                    self.sequence = value as u32;
                }
            }
            MessageType::StartSample => {
                self.capture.start();
                let _ = self.send(MessageType::StartSample, &[]);
            }
            MessageType::ContSample => {
                self.capture.request_chunk();
                self.service_capture();
            }
            MessageType::DoneSample => {
                self.capture.stop();
                let _ = self.send(MessageType::DoneSample, &[]);
            }
            MessageType::Data => {}
        }
    }

    fn service_capture(&mut self) {
        if let Some(chunk) = self.capture.take_chunk() {
            let _ = self.send(MessageType::ContSample, &chunk);
        }
    }

    fn send(&mut self, kind: MessageType, payload: &[u8]) -> Result<(), LinkError> {
        let bytes = frame(kind, payload)?;
        self.enqueue(&bytes)?;
        self.last_frame = bytes;
        Ok(())
    }

    fn resend_last(&mut self) {
        let bytes = self.last_frame.clone();
        if bytes.is_empty() {
            return;
        }
        let _ = self.enqueue(&bytes);
    }

    fn enqueue(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        if self.tx.capacity() - self.tx.len() < bytes.len() {
            self.dropped_frames = self.dropped_frames.wrapping_add(1);
            warn!("meter: tx queue full, dropping {} byte frame", bytes.len());
            return Err(LinkError::QueueFull);
        }
        for &b in bytes {
            let _ = self.tx.enqueue(b);
        }
        Ok(())
    }
}
