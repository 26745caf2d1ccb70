//! Raw-sample streaming, radio-unit side.
//!
//! A pull-based handshake layered on the link:
//!
//! ```text
//! begin ─► Start ──(window: START)──► WaitStart ──(ack)──► WaitData
//!                                                            │ CONT(chunk)
//!            ┌──(window: CONT)── Next ◄──(request next)── Idle ◄┘
//!            ▼
//!         WaitData ──CONT(chunk)──► Idle ...
//!
//! stop ─► Quit ──(window: DONE)──► WaitQuit ──(DONE)──► None
//! ```
//!
//! Waiting states have no timeout. If the peer uses its turn without
//! answering, a marker byte is written into the sample buffer and the state is
//! left as it is.

use heapless::Vec;

use crate::consts::{
    MARKER_CHECKSUM_FAIL, MARKER_NO_DATA, MARKER_NO_DONE, MARKER_NO_START_ACK,
    SAMPLE_CHUNK_MAX_LEN,
};
use crate::radio::state::Outbound;

/// Streaming progress as seen by the radio unit.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum RawSampleState {
    /// No streaming in progress.
    #[default]
    None,
    /// START must be sent in the next free window.
    Start,
    /// START sent, waiting for the acknowledgement.
    WaitStart,
    /// A chunk request must be sent in the next free window.
    Next,
    /// Waiting for a chunk.
    WaitData,
    /// Chunk delivered, waiting for the client to pull the next one.
    Idle,
    /// DONE must be sent in the next free window.
    Quit,
    /// DONE sent, waiting for the confirmation.
    WaitQuit,
}

impl RawSampleState {
    /// Whether a streaming exchange is in progress.
    pub fn is_active(self) -> bool {
        self != RawSampleState::None
    }

    /// Client asked to begin collection. Only honoured when idle.
    pub fn begin(&mut self) -> bool {
        if *self != RawSampleState::None {
            return false;
        }
        *self = RawSampleState::Start;
        true
    }

    /// Client asked to stop. Overrides any active state.
    pub fn stop(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        *self = RawSampleState::Quit;
        true
    }

    /// Client asked for the next chunk.
    pub fn request_next(&mut self) -> bool {
        if *self != RawSampleState::Idle {
            return false;
        }
        *self = RawSampleState::Next;
        true
    }

    /// Message to send for this state, moving to the matching wait state.
    pub fn take_outbound(&mut self) -> Option<Outbound> {
        let (kind, next) = match *self {
            RawSampleState::Start => (Outbound::StartSample, RawSampleState::WaitStart),
            RawSampleState::Next => (Outbound::ContSample, RawSampleState::WaitData),
            RawSampleState::Quit => (Outbound::DoneSample, RawSampleState::WaitQuit),
            RawSampleState::None
            | RawSampleState::WaitStart
            | RawSampleState::WaitData
            | RawSampleState::Idle
            | RawSampleState::WaitQuit => return None,
        };
        *self = next;
        Some(kind)
    }

    /// The peer acknowledged START.
    pub fn on_start_ack(&mut self) {
        if *self != RawSampleState::Quit {
            *self = RawSampleState::WaitData;
        }
    }

    /// The peer delivered a chunk.
    pub fn on_chunk(&mut self) {
        if *self != RawSampleState::Quit {
            *self = RawSampleState::Idle;
        }
    }

    /// The peer confirmed the end of streaming.
    pub fn on_done(&mut self) {
        *self = RawSampleState::None;
    }

    /// Marker for a peer turn that did not answer this state, if it was waiting.
    pub fn missed_reply_marker(self) -> Option<u8> {
        match self {
            RawSampleState::WaitStart => Some(MARKER_NO_START_ACK),
            RawSampleState::WaitData => Some(MARKER_NO_DATA),
            RawSampleState::WaitQuit => Some(MARKER_NO_DONE),
            _ => None,
        }
    }
}

/// Status byte exposed to the connected client.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum StreamStatus {
    /// Collection requested, or the client consumed the last chunk.
    Started,
    /// A new chunk is available.
    NewData,
    /// Streaming finished (also the power-on value).
    Done,
    /// Stop requested, waiting for the peer.
    Stopped,
}

impl StreamStatus {
    /// Byte value written to the status characteristic.
    pub const fn code(self) -> u8 {
        match self {
            StreamStatus::Started => 0,
            StreamStatus::NewData => 1,
            StreamStatus::Done => 2,
            StreamStatus::Stopped => 255,
        }
    }
}

/// Latest raw-sample chunk handed to the client.
///
/// Always holds at least one byte, mirroring a characteristic whose length
/// never drops below one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBuffer {
    data: Vec<u8, SAMPLE_CHUNK_MAX_LEN>,
}

impl Default for SampleBuffer {
    fn default() -> Self {
        let mut data = Vec::new();
        let _ = data.push(0);
        Self { data }
    }
}

impl SampleBuffer {
    /// Buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Replaces the contents with `chunk`, truncated to the chunk bound.
    pub fn fill(&mut self, chunk: &[u8]) {
        let len = chunk.len().min(SAMPLE_CHUNK_MAX_LEN);
        self.data.clear();
        let _ = self.data.extend_from_slice(&chunk[..len]);
        if self.data.is_empty() {
            let _ = self.data.push(0);
        }
    }

    /// Resets to a single zero byte.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Overwrites the first byte with a diagnostic marker.
    pub fn mark(&mut self, marker: u8) {
        if let Some(first) = self.data.first_mut() {
            *first = marker;
        }
    }

    /// Marks a checksum failure.
    pub fn mark_checksum_fail(&mut self) {
        self.mark(MARKER_CHECKSUM_FAIL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_only_from_none() {
        let mut state = RawSampleState::None;
        assert!(state.begin());
        assert_eq!(state, RawSampleState::Start);
        assert!(!state.begin());
    }

    #[test]
    fn test_stop_only_when_active() {
        let mut state = RawSampleState::None;
        assert!(!state.stop());
        assert_eq!(state, RawSampleState::None);
        state = RawSampleState::WaitData;
        assert!(state.stop());
        assert_eq!(state, RawSampleState::Quit);
    }

    #[test]
    fn test_request_next_only_when_idle() {
        let mut state = RawSampleState::WaitData;
        assert!(!state.request_next());
        state = RawSampleState::Idle;
        assert!(state.request_next());
        assert_eq!(state, RawSampleState::Next);
    }

    #[test]
    fn test_outbound_moves_to_wait_states() {
        let mut state = RawSampleState::Start;
        assert_eq!(state.take_outbound(), Some(Outbound::StartSample));
        assert_eq!(state, RawSampleState::WaitStart);
        assert_eq!(state.take_outbound(), None);

        state = RawSampleState::Next;
        assert_eq!(state.take_outbound(), Some(Outbound::ContSample));
        assert_eq!(state, RawSampleState::WaitData);

        state = RawSampleState::Quit;
        assert_eq!(state.take_outbound(), Some(Outbound::DoneSample));
        assert_eq!(state, RawSampleState::WaitQuit);
    }

    #[test]
    fn test_quit_is_not_overridden_by_late_replies() {
        let mut state = RawSampleState::Quit;
        state.on_start_ack();
        assert_eq!(state, RawSampleState::Quit);
        state.on_chunk();
        assert_eq!(state, RawSampleState::Quit);
        state.on_done();
        assert_eq!(state, RawSampleState::None);
    }

    #[test]
    fn test_missed_reply_markers() {
        assert_eq!(RawSampleState::WaitStart.missed_reply_marker(), Some(0xF1));
        assert_eq!(RawSampleState::WaitData.missed_reply_marker(), Some(0xF2));
        assert_eq!(RawSampleState::WaitQuit.missed_reply_marker(), Some(0xF3));
        assert_eq!(RawSampleState::Idle.missed_reply_marker(), None);
    }

    #[test]
    fn test_sample_buffer_never_empty() {
        let mut buf = SampleBuffer::default();
        assert_eq!(buf.as_slice(), &[0]);
        buf.fill(&[]);
        assert_eq!(buf.as_slice(), &[0]);
        buf.fill(&[1, 2, 3]);
        buf.mark_checksum_fail();
        assert_eq!(buf.as_slice(), &[0xA5, 2, 3]);
        buf.clear();
        assert_eq!(buf.as_slice(), &[0]);
    }
}
