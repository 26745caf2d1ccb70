//! Radio-unit side: link state machine, advertisement and raw-sample streaming.
//!
//! The radio unit only ever answers inside a transmit window opened by a
//! periodic timer, and sends at most one message per window:
//!
//! - the timer tick calls [`RadioLink::open_window`]
//! - the main loop calls [`RadioLink::poll_transmit`] and feeds the UART from
//!   [`RadioLink::next_tx_byte`]
//! - the UART RX interrupt calls [`RadioLink::on_uart_rx`]
//! - client characteristic writes call [`RadioLink::begin_raw_samples`],
//!   [`RadioLink::stop_raw_samples`] and [`RadioLink::request_next_chunk`]
//!
//! Everything the outside world sees goes through a [`RadioServices`]
//! implementation.
//!
//! ## Example
//!
//! ```rust
//! use powerblade_link::radio::{RadioConfig, RadioLink, RadioServices, StreamStatus};
//!
//! #[derive(Default)]
//! struct Ble {
//!     status: Option<StreamStatus>,
//! }
//!
//! impl RadioServices for Ble {
//!     fn update_advertisement(&mut self, _data: &[u8]) {}
//!     fn update_sample_data(&mut self, _data: &[u8]) {}
//!     fn notify_status(&mut self, status: StreamStatus) {
//!         self.status = Some(status);
//!     }
//! }
//!
//! let mut ble = Ble::default();
//! let mut radio = RadioLink::new(RadioConfig::default());
//! radio.begin_raw_samples();
//! radio.open_window();
//! assert!(radio.poll_transmit());
//! while let Some(byte) = radio.next_tx_byte() {
//!     // write `byte` to the UART data register
//! #   let _ = byte;
//! }
//! # radio.on_uart_rx(0x00, &mut ble);
//! ```

pub mod advertisement;
pub mod state;
pub mod streaming;

use crate::consts::{DEFAULT_CALIBRATION_SEQUENCE, SERVICE_IDENTIFIER};
use crate::error::LinkError;
use crate::framer::{FrameCursor, Unframer, frame};
use crate::message::{Message, MessageType};

use advertisement::Advertisement;
use state::{CalibrationState, LinkState, NakState, Outbound};
pub use streaming::{RawSampleState, SampleBuffer, StreamStatus};

/// Outbound effects of the radio unit: advertisement and client-facing data.
pub trait RadioServices {
    /// The advertisement body changed; `data` includes the service id.
    fn update_advertisement(&mut self, data: &[u8]);
    /// The raw-sample buffer changed.
    fn update_sample_data(&mut self, data: &[u8]);
    /// The client-visible status byte changed and should be notified.
    fn notify_status(&mut self, status: StreamStatus);
}

/// Runtime configuration of the radio unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioConfig {
    /// First byte of every advertisement.
    pub service_id: u8,
    /// Queue one SET_SEQ of [`DEFAULT_CALIBRATION_SEQUENCE`] at start-up.
    pub calibrate_on_start: bool,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            service_id: SERVICE_IDENTIFIER,
            calibrate_on_start: false,
        }
    }
}

/// The radio unit's link endpoint.
#[derive(Debug)]
pub struct RadioLink {
    /// Arbitrated link state.
    pub state: LinkState,
    config: RadioConfig,
    unframer: Unframer,
    cursor: FrameCursor,
    window_open: bool,
    advertisement: Advertisement,
    samples: SampleBuffer,
    status: StreamStatus,
}

impl RadioLink {
    /// Creates an idle endpoint showing the debugging advertisement.
    pub fn new(config: RadioConfig) -> Self {
        let mut state = LinkState::new();
        if config.calibrate_on_start {
            state.calibration = CalibrationState::SetSequence(DEFAULT_CALIBRATION_SEQUENCE);
        }
        Self {
            state,
            config,
            unframer: Unframer::new(),
            cursor: FrameCursor::new(),
            window_open: false,
            advertisement: Advertisement::debug(config.service_id),
            samples: SampleBuffer::default(),
            status: StreamStatus::Done,
        }
    }

    /// Runtime configuration in use.
    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    /// Current advertisement bytes.
    pub fn advertisement(&self) -> &[u8] {
        self.advertisement.as_bytes()
    }

    /// Current raw-sample buffer.
    pub fn samples(&self) -> &[u8] {
        self.samples.as_slice()
    }

    /// Client-visible status.
    pub fn status(&self) -> StreamStatus {
        self.status
    }

    /// Whether the current window is still unused.
    pub fn window_open(&self) -> bool {
        self.window_open
    }

    /// Opens a transmit window. Called from the periodic timer.
    pub fn open_window(&mut self) {
        self.window_open = true;
    }

    /// Sends the highest-priority pending message if a window is open.
    ///
    /// # Returns
    /// `true` if a message was loaded for transmission. The window then
    /// closes; otherwise it stays open.
    pub fn poll_transmit(&mut self) -> bool {
        if !self.window_open || self.cursor.is_sending() {
            return false;
        }
        let Some(outbound) = self.state.next_outbound() else {
            return false;
        };
        trace!("radio: window used");
        let sent = match outbound {
            Outbound::Resend => {
                self.cursor.rewind();
                Ok(())
            }
            Outbound::ChecksumNak => frame(MessageType::Nak, &[]).map(|bytes| {
                // Resends replay the last request, never the NAK.
                self.cursor.load_once(bytes);
            }),
            Outbound::StartSample => self.send(MessageType::StartSample, &[]),
            Outbound::ContSample => self.send(MessageType::ContSample, &[]),
            Outbound::DoneSample => self.send(MessageType::DoneSample, &[]),
            Outbound::SetSequence(value) => self.send(MessageType::SetSeq, &[value]),
        };
        if sent.is_err() {
            return false;
        }
        self.window_open = false;
        true
    }

    /// Next byte for the UART, if a message is being sent.
    pub fn next_tx_byte(&mut self) -> Option<u8> {
        self.cursor.next_byte()
    }

    /// Handles one byte received from the metering unit.
    pub fn on_uart_rx<S: RadioServices>(&mut self, byte: u8, services: &mut S) {
        match self.unframer.push(byte) {
            Ok(message) => self.on_message(&message, services),
            Err(nb::Error::WouldBlock) => {}
            Err(nb::Error::Other(LinkError::UnrecognizedType(code))) => {
                debug!("radio: ignoring message type {}", code);
            }
            Err(nb::Error::Other(_)) => {
                self.state.nak = NakState::PendingChecksumNak;
                self.samples.mark_checksum_fail();
                services.update_sample_data(self.samples.as_slice());
            }
        }
    }

    /// Client asked to start raw-sample collection.
    pub fn begin_raw_samples(&mut self) {
        if self.state.raw_sample.begin() {
            self.status = StreamStatus::Started;
        }
    }

    /// Client asked to stop raw-sample collection.
    pub fn stop_raw_samples(&mut self) {
        if self.state.raw_sample.stop() {
            self.status = StreamStatus::Stopped;
        }
    }

    /// Client consumed the current chunk and wants the next one.
    pub fn request_next_chunk(&mut self) {
        self.status = StreamStatus::Started;
        let _ = self.state.raw_sample.request_next();
    }

    /// Queues a SET_SEQ for the metering unit.
    pub fn request_set_sequence(&mut self, value: u8) {
        self.state.calibration = CalibrationState::SetSequence(value);
    }

    fn on_message<S: RadioServices>(&mut self, message: &Message, services: &mut S) {
        trace!("radio: received type {}", message.kind.code());
        match message.kind {
            MessageType::Data => {
                if let Some(marker) = self.state.raw_sample.missed_reply_marker() {
                    debug!("radio: peer turn without streaming reply");
                    self.samples.mark(marker);
                    services.update_sample_data(self.samples.as_slice());
                }
                if !message.payload.is_empty() {
                    let _ = self
                        .advertisement
                        .update(self.config.service_id, &message.payload);
                    services.update_advertisement(self.advertisement.as_bytes());
                }
            }
            MessageType::Nak => self.state.nak = NakState::PendingResend,
            MessageType::StartSample => self.state.raw_sample.on_start_ack(),
            MessageType::ContSample => {
                self.samples.fill(&message.payload);
                services.update_sample_data(self.samples.as_slice());
                self.set_status(StreamStatus::NewData, services);
                self.state.raw_sample.on_chunk();
            }
            MessageType::DoneSample => {
                self.samples.clear();
                services.update_sample_data(self.samples.as_slice());
                self.set_status(StreamStatus::Done, services);
                self.state.raw_sample.on_done();
            }
            MessageType::SetSeq => {}
        }
    }

    fn set_status<S: RadioServices>(&mut self, status: StreamStatus, services: &mut S) {
        self.status = status;
        services.notify_status(status);
    }

    fn send(&mut self, kind: MessageType, payload: &[u8]) -> Result<(), LinkError> {
        let bytes = frame(kind, payload)?;
        self.cursor.load(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{CYCLE_COUNT, CYCLE_LEN, MARKER_NO_DATA, SAMPLE_CHUNK_MAX_LEN};
    use crate::meter::accumulator::SampleChannel;
    use crate::meter::{Meter, MeterConfig};
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    #[derive(Default)]
    struct Recorder {
        adverts: Vec<Vec<u8>>,
        samples: Vec<Vec<u8>>,
        statuses: Vec<StreamStatus>,
    }

    impl RadioServices for Recorder {
        fn update_advertisement(&mut self, data: &[u8]) {
            self.adverts.push(data.to_vec());
        }
        fn update_sample_data(&mut self, data: &[u8]) {
            self.samples.push(data.to_vec());
        }
        fn notify_status(&mut self, status: StreamStatus) {
            self.statuses.push(status);
        }
    }

    fn feed(radio: &mut RadioLink, services: &mut Recorder, kind: MessageType, payload: &[u8]) {
        for b in frame(kind, payload).unwrap() {
            radio.on_uart_rx(b, services);
        }
    }

    fn transmitted(radio: &mut RadioLink) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(b) = radio.next_tx_byte() {
            out.push(b);
        }
        out
    }

    fn window(radio: &mut RadioLink) -> Vec<u8> {
        radio.open_window();
        let _ = radio.poll_transmit();
        transmitted(radio)
    }

    #[test]
    fn test_window_closed_sends_nothing() {
        let mut radio = RadioLink::new(RadioConfig::default());
        radio.begin_raw_samples();
        assert!(!radio.poll_transmit());
        assert!(radio.next_tx_byte().is_none());
        assert_eq!(radio.state.raw_sample, RawSampleState::Start);
    }

    #[test]
    fn test_unused_window_stays_open() {
        let mut radio = RadioLink::new(RadioConfig::default());
        radio.open_window();
        assert!(!radio.poll_transmit());
        assert!(radio.window_open());
        radio.request_set_sequence(150);
        assert!(radio.poll_transmit());
        assert!(!radio.window_open());
        assert_eq!(transmitted(&mut radio), frame(MessageType::SetSeq, &[150]).unwrap().as_slice());
    }

    #[test]
    fn test_data_updates_advertisement() {
        let mut radio = RadioLink::new(RadioConfig::default());
        let mut ble = Recorder::default();
        assert_eq!(radio.advertisement().len(), 20);

        feed(&mut radio, &mut ble, MessageType::Data, &[9, 8, 7]);
        assert_eq!(radio.advertisement(), &[SERVICE_IDENTIFIER, 9, 8, 7]);
        assert_eq!(ble.adverts.len(), 1);

        // Empty DATA leaves the advertisement alone.
        feed(&mut radio, &mut ble, MessageType::Data, &[]);
        assert_eq!(ble.adverts.len(), 1);
    }

    #[test]
    fn test_checksum_failure_queues_nak() {
        let mut radio = RadioLink::new(RadioConfig::default());
        let mut ble = Recorder::default();
        let mut bad = frame(MessageType::Data, &[1, 2, 3]).unwrap();
        let last = bad.len() - 1;
        bad[last] ^= 0xFF;
        for b in bad {
            radio.on_uart_rx(b, &mut ble);
        }
        assert_eq!(radio.state.nak, NakState::PendingChecksumNak);
        assert_eq!(radio.samples()[0], 0xA5);
        assert!(ble.adverts.is_empty());

        assert_eq!(window(&mut radio), &[0x00, 0x04, 0x02, 0x06]);
        assert_eq!(radio.state.nak, NakState::None);
    }

    #[test]
    fn test_nak_resends_last_bytes_before_streaming() {
        let mut radio = RadioLink::new(RadioConfig::default());
        let mut ble = Recorder::default();
        radio.request_set_sequence(42);
        let first = window(&mut radio);

        radio.begin_raw_samples();
        feed(&mut radio, &mut ble, MessageType::Nak, &[]);
        assert_eq!(radio.state.nak, NakState::PendingResend);

        assert_eq!(window(&mut radio), first);
        assert_eq!(radio.state.raw_sample, RawSampleState::Start);

        assert_eq!(
            window(&mut radio),
            frame(MessageType::StartSample, &[]).unwrap().as_slice()
        );
        assert_eq!(radio.state.raw_sample, RawSampleState::WaitStart);
    }

    #[test]
    fn test_missed_reply_marks_buffer() {
        let mut radio = RadioLink::new(RadioConfig::default());
        let mut ble = Recorder::default();
        radio.state.raw_sample = RawSampleState::WaitData;
        feed(&mut radio, &mut ble, MessageType::Data, &[1]);
        assert_eq!(radio.samples()[0], MARKER_NO_DATA);
        assert_eq!(radio.state.raw_sample, RawSampleState::WaitData);
        assert_eq!(ble.samples.len(), 1);
        assert_eq!(ble.samples[0][0], MARKER_NO_DATA);
    }

    #[test]
    fn test_unrecognized_type_is_ignored() {
        let mut radio = RadioLink::new(RadioConfig::default());
        let mut ble = Recorder::default();
        radio.state.raw_sample = RawSampleState::WaitData;
        let mut bytes = vec![0x00, 0x05, 0x7E, 0x33];
        bytes.push(crate::checksum::checksum(&bytes));
        for b in bytes {
            radio.on_uart_rx(b, &mut ble);
        }
        assert_eq!(radio.state.nak, NakState::None);
        assert_eq!(radio.state.raw_sample, RawSampleState::WaitData);
        assert_eq!(radio.samples(), &[0]);
        assert!(ble.adverts.is_empty());
        assert!(ble.samples.is_empty());
        assert!(ble.statuses.is_empty());

        radio.open_window();
        assert!(!radio.poll_transmit());
    }

    #[test]
    fn test_short_length_queues_nak() {
        let mut radio = RadioLink::new(RadioConfig::default());
        let mut ble = Recorder::default();
        for b in [0x00, 0x03, 0x01, 0x04] {
            radio.on_uart_rx(b, &mut ble);
        }
        assert_eq!(radio.state.nak, NakState::PendingChecksumNak);
        assert_eq!(radio.samples()[0], 0xA5);
        assert_eq!(ble.samples, [vec![0xA5]]);
        assert_eq!(window(&mut radio), &[0x00, 0x04, 0x02, 0x06]);
        assert_eq!(radio.state.nak, NakState::None);
    }

    #[test]
    fn test_calibrate_on_start() {
        let config = RadioConfig {
            calibrate_on_start: true,
            ..RadioConfig::default()
        };
        let mut radio = RadioLink::new(config);
        assert_eq!(
            window(&mut radio),
            frame(MessageType::SetSeq, &[DEFAULT_CALIBRATION_SEQUENCE]).unwrap().as_slice()
        );
        radio.open_window();
        assert!(!radio.poll_transmit());
    }

    #[test]
    fn test_streaming_sequence() {
        let mut radio = RadioLink::new(RadioConfig::default());
        let mut ble = Recorder::default();
        let chunk = [0x5Au8; SAMPLE_CHUNK_MAX_LEN];

        radio.begin_raw_samples();
        assert_eq!(radio.status(), StreamStatus::Started);
        let _ = window(&mut radio);
        assert_eq!(radio.state.raw_sample, RawSampleState::WaitStart);

        feed(&mut radio, &mut ble, MessageType::StartSample, &[]);
        assert_eq!(radio.state.raw_sample, RawSampleState::WaitData);

        feed(&mut radio, &mut ble, MessageType::ContSample, &chunk);
        assert_eq!(radio.state.raw_sample, RawSampleState::Idle);
        assert_eq!(radio.samples(), &chunk[..]);
        assert_eq!(ble.statuses, [StreamStatus::NewData]);

        radio.request_next_chunk();
        assert_eq!(radio.status(), StreamStatus::Started);
        assert_eq!(radio.state.raw_sample, RawSampleState::Next);
        assert_eq!(
            window(&mut radio),
            frame(MessageType::ContSample, &[]).unwrap().as_slice()
        );
        assert_eq!(radio.state.raw_sample, RawSampleState::WaitData);

        feed(&mut radio, &mut ble, MessageType::ContSample, &chunk[..10]);
        assert_eq!(radio.state.raw_sample, RawSampleState::Idle);

        radio.stop_raw_samples();
        assert_eq!(radio.status(), StreamStatus::Stopped);
        assert_eq!(
            window(&mut radio),
            frame(MessageType::DoneSample, &[]).unwrap().as_slice()
        );
        assert_eq!(radio.state.raw_sample, RawSampleState::WaitQuit);

        feed(&mut radio, &mut ble, MessageType::DoneSample, &[]);
        assert_eq!(radio.state.raw_sample, RawSampleState::None);
        assert_eq!(radio.samples(), &[0]);
        assert_eq!(
            ble.statuses,
            [StreamStatus::NewData, StreamStatus::NewData, StreamStatus::Done]
        );
    }

    fn quiet_meter() -> Meter<PinMock, PinMock> {
        let sen = PinMock::new(&[PinTransaction::set(PinState::Low)]);
        let sys = PinMock::new(&[PinTransaction::set(PinState::Low)]);
        Meter::new(sen, sys, MeterConfig::default())
    }

    fn pump(radio: &mut RadioLink, meter: &mut Meter<PinMock, PinMock>, ble: &mut Recorder) {
        while let Some(b) = radio.next_tx_byte() {
            meter.on_uart_rx(b);
        }
        while let Some(b) = meter.next_tx_byte() {
            radio.on_uart_rx(b, ble);
        }
    }

    fn sample_rounds(meter: &mut Meter<PinMock, PinMock>, rounds: usize) {
        for i in 0..rounds {
            meter.on_adc(SampleChannel::Current, i as u16);
            meter.on_adc(SampleChannel::Voltage, 500);
            // Between the gate thresholds: no rail changes, no reports sent.
            meter.on_adc(SampleChannel::Supply, 100);
        }
    }

    #[test]
    fn test_streaming_between_units() {
        let mut radio = RadioLink::new(RadioConfig::default());
        let mut meter = quiet_meter();
        let mut ble = Recorder::default();

        radio.begin_raw_samples();
        radio.open_window();
        assert!(radio.poll_transmit());
        pump(&mut radio, &mut meter, &mut ble);
        assert_eq!(radio.state.raw_sample, RawSampleState::WaitData);
        assert!(meter.capture.capturing);

        sample_rounds(&mut meter, SAMPLE_CHUNK_MAX_LEN / 4);
        pump(&mut radio, &mut meter, &mut ble);
        assert_eq!(radio.state.raw_sample, RawSampleState::Idle);
        assert_eq!(radio.samples().len(), SAMPLE_CHUNK_MAX_LEN);
        assert_eq!(&radio.samples()[..4], &[0x00, 0x00, 0x01, 0xF4]);

        radio.request_next_chunk();
        radio.open_window();
        assert!(radio.poll_transmit());
        pump(&mut radio, &mut meter, &mut ble);
        assert_eq!(radio.state.raw_sample, RawSampleState::WaitData);

        sample_rounds(&mut meter, SAMPLE_CHUNK_MAX_LEN / 4);
        pump(&mut radio, &mut meter, &mut ble);
        assert_eq!(radio.state.raw_sample, RawSampleState::Idle);

        radio.stop_raw_samples();
        radio.open_window();
        assert!(radio.poll_transmit());
        pump(&mut radio, &mut meter, &mut ble);
        assert_eq!(radio.state.raw_sample, RawSampleState::None);
        assert_eq!(radio.status(), StreamStatus::Done);
        assert!(!meter.capture.capturing);

        meter.gate.sense_en.done();
        meter.gate.sys_en.done();
    }

    #[test]
    fn test_corrupted_nak_does_not_stall_link() {
        let mut radio = RadioLink::new(RadioConfig::default());
        let mut meter = quiet_meter();
        let mut ble = Recorder::default();

        let mut bad = frame(MessageType::Data, &[1, 2, 3]).unwrap();
        let last = bad.len() - 1;
        bad[last] ^= 0xFF;
        for b in bad {
            radio.on_uart_rx(b, &mut ble);
        }
        radio.begin_raw_samples();

        // The NAK reaches the meter with a flipped bit and is NAKed back.
        radio.open_window();
        assert!(radio.poll_transmit());
        let mut nak = transmitted(&mut radio);
        assert_eq!(nak, [0x00, 0x04, 0x02, 0x06]);
        nak[3] ^= 0x01;
        for b in nak {
            meter.on_uart_rx(b);
        }
        pump(&mut radio, &mut meter, &mut ble);
        assert_eq!(radio.state.nak, NakState::PendingResend);

        for _ in 0..3 {
            radio.open_window();
            let _ = radio.poll_transmit();
            pump(&mut radio, &mut meter, &mut ble);
        }
        assert_eq!(radio.state.nak, NakState::None);
        assert_eq!(radio.state.raw_sample, RawSampleState::WaitData);
        assert!(meter.capture.capturing);

        meter.gate.sense_en.done();
        meter.gate.sys_en.done();
    }

    #[test]
    fn test_reports_reach_advertisement() {
        let sen = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let sys = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let mut meter = Meter::new(sen, sys, MeterConfig::default());
        let mut radio = RadioLink::new(RadioConfig::default());
        let mut ble = Recorder::default();

        let rounds = CYCLE_LEN as usize * CYCLE_COUNT as usize;
        for i in 0..rounds {
            meter.on_adc(SampleChannel::Current, 10);
            meter.on_adc(SampleChannel::Voltage, 20);
            let supply = if i + 1 == rounds { 200 } else { 100 };
            meter.on_adc(SampleChannel::Supply, supply);
        }
        pump(&mut radio, &mut meter, &mut ble);

        let adv = radio.advertisement();
        assert_eq!(adv[0], SERVICE_IDENTIFIER);
        let report = crate::report::ReportPayload::decode(&adv[1..]).unwrap();
        assert_eq!(report.sequence, 1);
        assert_eq!(report.real_power, 12_000);
        assert_eq!(report.v_rms, 20);

        meter.gate.sense_en.done();
        meter.gate.sys_en.done();
    }
}
