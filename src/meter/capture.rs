//! Raw-sample capture for on-demand streaming.
//!
//! While the radio unit has streaming open, every sampling round stores its
//! current and voltage readings (big-endian `u16` each) in a bounded deque.
//! Chunks of up to [`SAMPLE_CHUNK_MAX_LEN`] bytes are handed out one per
//! request. When the deque is full new rounds are dropped, so a chunk always
//! holds contiguous samples.

use heapless::{Deque, Vec};

use crate::consts::{SAMPLE_BUF_LEN, SAMPLE_CHUNK_MAX_LEN};

/// One raw-sample chunk.
pub type Chunk = Vec<u8, SAMPLE_CHUNK_MAX_LEN>;

const ROUND_BYTES: usize = 4;

/// Bounded capture buffer plus the request bookkeeping of the responder side.
#[derive(Debug, Default)]
pub struct SampleCapture {
    buf: Deque<u8, SAMPLE_BUF_LEN>,
    /// Whether rounds are currently being recorded.
    pub capturing: bool,
    /// Whether the peer is waiting for a chunk.
    pub chunk_owed: bool,
    /// Rounds dropped because the buffer was full.
    pub dropped: u16,
}

impl SampleCapture {
    /// Creates an idle capture buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the buffer and starts recording. The first chunk is owed at once.
    pub fn start(&mut self) {
        self.buf.clear();
        self.capturing = true;
        self.chunk_owed = true;
        self.dropped = 0;
    }

    /// Stops recording and forgets buffered samples.
    pub fn stop(&mut self) {
        self.buf.clear();
        self.capturing = false;
        self.chunk_owed = false;
    }

    /// Marks the next chunk as requested.
    pub fn request_chunk(&mut self) {
        if self.capturing {
            self.chunk_owed = true;
        }
    }

    /// Buffered bytes not yet handed out.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Records one round, if capturing and there is room.
    pub fn record(&mut self, current: u16, voltage: u16) {
        if !self.capturing {
            return;
        }
        if SAMPLE_BUF_LEN - self.buf.len() < ROUND_BYTES {
            self.dropped = self.dropped.wrapping_add(1);
            return;
        }
        let [c_hi, c_lo] = current.to_be_bytes();
        let [v_hi, v_lo] = voltage.to_be_bytes();
        for b in [c_hi, c_lo, v_hi, v_lo] {
            let _ = self.buf.push_back(b);
        }
    }

    /// Takes the owed chunk once a full one is buffered.
    pub fn take_chunk(&mut self) -> Option<Chunk> {
        if !self.chunk_owed || self.buf.len() < SAMPLE_CHUNK_MAX_LEN {
            return None;
        }
        let mut chunk = Chunk::new();
        while !chunk.is_full() {
            match self.buf.pop_front() {
                Some(b) => {
                    let _ = chunk.push(b);
                }
                None => break,
            }
        }
        self.chunk_owed = false;
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_capture_ignores_rounds() {
        let mut capture = SampleCapture::new();
        capture.record(1, 2);
        assert_eq!(capture.buffered(), 0);
        assert!(capture.take_chunk().is_none());
    }

    #[test]
    fn test_chunk_released_when_full_and_owed() {
        let mut capture = SampleCapture::new();
        capture.start();
        let rounds = SAMPLE_CHUNK_MAX_LEN / ROUND_BYTES;
        for i in 0..rounds - 1 {
            capture.record(i as u16, 0x0100 + i as u16);
        }
        assert!(capture.take_chunk().is_none());
        capture.record(0xAAAA, 0xBBBB);

        let chunk = capture.take_chunk().unwrap();
        assert_eq!(chunk.len(), SAMPLE_CHUNK_MAX_LEN);
        assert_eq!(&chunk[..4], &[0x00, 0x00, 0x01, 0x00]);
        assert_eq!(&chunk[SAMPLE_CHUNK_MAX_LEN - 4..], &[0xAA, 0xAA, 0xBB, 0xBB]);
        assert!(!capture.chunk_owed);

        // Not owed any more until requested.
        for _ in 0..rounds {
            capture.record(1, 1);
        }
        assert!(capture.take_chunk().is_none());
        capture.request_chunk();
        assert!(capture.take_chunk().is_some());
    }

    #[test]
    fn test_overflow_drops_newest_rounds() {
        let mut capture = SampleCapture::new();
        capture.start();
        capture.chunk_owed = false;
        for _ in 0..(SAMPLE_BUF_LEN / ROUND_BYTES + 3) {
            capture.record(7, 7);
        }
        assert_eq!(capture.buffered(), SAMPLE_BUF_LEN);
        assert_eq!(capture.dropped, 3);
    }

    #[test]
    fn test_stop_clears() {
        let mut capture = SampleCapture::new();
        capture.start();
        capture.record(1, 2);
        capture.stop();
        assert_eq!(capture.buffered(), 0);
        capture.request_chunk();
        assert!(!capture.chunk_owed);
    }
}
