//! Length-prefixed, checksummed framing for the UART link.
//!
//! The same framing is used in both directions. [`frame`] builds the complete
//! byte image of a message; [`Unframer`] is fed one received byte at a time
//! (typically from the UART RX interrupt) and yields a [`Message`] once the
//! declared length has been reached.
//!
//! ## Receive bound
//!
//! The unframer never holds more than [`MAX_FRAME_LEN`] bytes. If a frame
//! declares a larger length it is cut at the bound, checked against the last
//! kept byte, and the rest of the declared bytes are swallowed so the next
//! frame starts on a clean boundary.
//!
//! ## Result convention
//!
//! [`Unframer::push`] returns an [`nb::Result`]: `WouldBlock` means the frame
//! is still incomplete, `Other(LinkError)` reports a bad frame that has
//! already been discarded.

use heapless::Vec;

use crate::checksum::{checksum, verify};
use crate::consts::{LENGTH_FIELD_LEN, MAX_FRAME_LEN, MIN_FRAME_LEN};
use crate::error::LinkError;
use crate::message::{Message, MessageType, Payload};

/// Byte image of one framed message.
pub type Frame = Vec<u8, MAX_FRAME_LEN>;

/// Frames a message of type `kind` carrying `payload`.
///
/// # Errors
/// [`LinkError::PayloadTooLong`] if the payload does not fit in one frame.
pub fn frame(kind: MessageType, payload: &[u8]) -> Result<Frame, LinkError> {
    let message = Message::new(kind, payload)?;
    Ok(encode(&message))
}

/// Serializes an already-built [`Message`].
pub fn encode(message: &Message) -> Frame {
    let mut out = Frame::new();
    // Capacity is MAX_PAYLOAD_LEN + overhead and `Message` bounds its payload.
    let _ = out.extend_from_slice(&message.wire_len().to_be_bytes());
    let _ = out.push(message.kind.code());
    let _ = out.extend_from_slice(&message.payload);
    let _ = out.push(checksum(&out));
    out
}

/// Incremental frame decoder.
///
/// Exactly one frame is assembled at a time; as soon as it completes (or is
/// rejected) the decoder is ready for the first byte of the next one.
#[derive(Debug, Default)]
pub struct Unframer {
    buf: Frame,
    declared: Option<u16>,
    skip: u16,
    /// Number of frames rejected for checksum or length errors.
    pub bad: u16,
    /// Number of frames accepted.
    pub good: u16,
}

impl Unframer {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops any partially received frame.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.declared = None;
    }

    /// Feeds one received byte.
    ///
    /// # Returns
    /// - `Ok(message)` when a frame completed with a valid checksum and known type
    /// - `Err(nb::Error::WouldBlock)` while the frame is incomplete
    /// - `Err(nb::Error::Other(e))` when a completed frame was rejected
    pub fn push(&mut self, byte: u8) -> nb::Result<Message, LinkError> {
        if self.skip > 0 {
            self.skip -= 1;
            return Err(nb::Error::WouldBlock);
        }

        // Room is guaranteed: the frame completes at MAX_FRAME_LEN at the latest.
        let _ = self.buf.push(byte);
        if self.buf.len() < MIN_FRAME_LEN {
            return Err(nb::Error::WouldBlock);
        }

        let declared = match self.declared {
            Some(len) => len,
            None => {
                let len = u16::from_be_bytes([self.buf[0], self.buf[1]]);
                if (len as usize) < MIN_FRAME_LEN {
                    warn!("unframe: declared length {} below minimum", len);
                    self.reset();
                    self.bad = self.bad.wrapping_add(1);
                    return Err(nb::Error::Other(LinkError::MalformedLength(len)));
                }
                self.declared = Some(len);
                len
            }
        };

        let received = self.buf.len();
        if received < declared as usize && received < MAX_FRAME_LEN {
            return Err(nb::Error::WouldBlock);
        }

        if declared as usize > received {
            self.skip = declared - received as u16;
            warn!("unframe: truncating frame of {} bytes, skipping {}", declared, self.skip);
        }

        let result = self.complete();
        self.reset();
        match result {
            Ok(_) => self.good = self.good.wrapping_add(1),
            Err(LinkError::ChecksumMismatch { .. }) => self.bad = self.bad.wrapping_add(1),
            Err(_) => {}
        }
        result.map_err(nb::Error::Other)
    }

    fn complete(&self) -> Result<Message, LinkError> {
        let end = self.buf.len() - 1;
        let received = self.buf[end];
        if !verify(&self.buf[..end], received) {
            let computed = checksum(&self.buf[..end]);
            debug!("unframe: checksum {} != {}", computed, received);
            return Err(LinkError::ChecksumMismatch { computed, received });
        }

        let kind = MessageType::try_from(self.buf[LENGTH_FIELD_LEN])?;
        let payload = Payload::from_slice(&self.buf[LENGTH_FIELD_LEN + 1..end])
            .map_err(|_| LinkError::MalformedLength(end as u16 + 1))?;
        Ok(Message {
            kind,
            payload,
            checksum: received,
        })
    }
}

/// Byte-at-a-time transmitter for one frame.
///
/// Remembers the last frame loaded with [`FrameCursor::load`] so it can be
/// replayed verbatim when the peer answers with a NAK. Frames sent with
/// [`FrameCursor::load_once`] are never replayed.
#[derive(Debug, Default)]
pub struct FrameCursor {
    frame: Frame,
    index: usize,
    replay: Frame,
}

impl FrameCursor {
    /// Creates an idle cursor with no frame loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts sending `frame` and keeps it for a later [`FrameCursor::rewind`].
    pub fn load(&mut self, frame: Frame) {
        self.replay.clone_from(&frame);
        self.load_once(frame);
    }

    /// Starts sending `frame` without replacing the replay frame.
    pub fn load_once(&mut self, frame: Frame) {
        self.frame = frame;
        self.index = 0;
    }

    /// Starts sending the replay frame again from its first byte.
    pub fn rewind(&mut self) {
        self.frame.clone_from(&self.replay);
        self.index = 0;
    }

    /// Whether bytes of the current frame remain unsent.
    pub fn is_sending(&self) -> bool {
        self.index < self.frame.len()
    }

    /// Next byte to hand to the UART, if any.
    pub fn next_byte(&mut self) -> Option<u8> {
        let byte = self.frame.get(self.index).copied()?;
        self.index += 1;
        Some(byte)
    }
}
