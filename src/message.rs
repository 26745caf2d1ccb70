//! Link message types.
//!
//! A [`Message`] is the unit exchanged between the metering unit and the radio
//! unit. On the wire it is framed as
//!
//! ```text
//! +--------+--------+------+-------------------+----------+
//! | len_hi | len_lo | type | payload[0..n]     | checksum |
//! +--------+--------+------+-------------------+----------+
//! ```
//!
//! where `len` counts every byte of the frame, itself included, and the
//! checksum is the additive checksum of all preceding bytes. See
//! [`crate::framer`] for the encoder and the incremental decoder.

use heapless::Vec;

use crate::checksum::checksum;
use crate::consts::{
    FRAME_OVERHEAD, MAX_PAYLOAD_LEN, MSG_CONT_SAMPLE, MSG_DATA, MSG_DONE_SAMPLE, MSG_NAK,
    MSG_SET_SEQ, MSG_START_SAMPLE,
};
use crate::error::LinkError;

/// Message payload buffer.
pub type Payload = Vec<u8, MAX_PAYLOAD_LEN>;

/// The kind of a link message, carried in the type byte.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum MessageType {
    /// Power report; the payload is a [`ReportPayload`](crate::report::ReportPayload).
    Data,
    /// Negative acknowledgement; the receiver resends its last frame.
    Nak,
    /// Sets the metering unit's report sequence counter to the 1-byte payload.
    SetSeq,
    /// Starts raw-sample streaming (radio → meter) or acknowledges it (meter → radio).
    StartSample,
    /// Requests the next chunk (radio → meter) or carries it (meter → radio).
    ContSample,
    /// Stops raw-sample streaming (radio → meter) or confirms it (meter → radio).
    DoneSample,
}

impl MessageType {
    /// Wire code of this message type.
    pub const fn code(self) -> u8 {
        match self {
            MessageType::Data => MSG_DATA,
            MessageType::Nak => MSG_NAK,
            MessageType::SetSeq => MSG_SET_SEQ,
            MessageType::StartSample => MSG_START_SAMPLE,
            MessageType::ContSample => MSG_CONT_SAMPLE,
            MessageType::DoneSample => MSG_DONE_SAMPLE,
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = LinkError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            MSG_DATA => Ok(MessageType::Data),
            MSG_NAK => Ok(MessageType::Nak),
            MSG_SET_SEQ => Ok(MessageType::SetSeq),
            MSG_START_SAMPLE => Ok(MessageType::StartSample),
            MSG_CONT_SAMPLE => Ok(MessageType::ContSample),
            MSG_DONE_SAMPLE => Ok(MessageType::DoneSample),
            other => Err(LinkError::UnrecognizedType(other)),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(kind: MessageType) -> Self {
        kind.code()
    }
}

/// A decoded (or to-be-encoded) link message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message type.
    pub kind: MessageType,
    /// Type-dependent payload.
    pub payload: Payload,
    /// Additive checksum over the length prefix, type byte and payload.
    pub checksum: u8,
}

impl Message {
    /// Builds a message and computes its checksum.
    ///
    /// # Errors
    /// [`LinkError::PayloadTooLong`] if `payload` exceeds [`MAX_PAYLOAD_LEN`].
    pub fn new(kind: MessageType, payload: &[u8]) -> Result<Self, LinkError> {
        let payload = Payload::from_slice(payload).map_err(|_| LinkError::PayloadTooLong {
            len: payload.len(),
            max: MAX_PAYLOAD_LEN,
        })?;
        let len = Self::frame_len(payload.len()).to_be_bytes();
        let sum = checksum(&[len[0], len[1], kind.code()])
            .wrapping_add(checksum(&payload));
        Ok(Self {
            kind,
            payload,
            checksum: sum,
        })
    }

    /// Builds a message with an empty payload.
    pub fn empty(kind: MessageType) -> Self {
        let len = Self::frame_len(0).to_be_bytes();
        Self {
            kind,
            payload: Payload::new(),
            checksum: checksum(&[len[0], len[1], kind.code()]),
        }
    }

    /// Length of this message on the wire.
    pub fn wire_len(&self) -> u16 {
        Self::frame_len(self.payload.len())
    }

    pub(crate) fn frame_len(payload_len: usize) -> u16 {
        (payload_len + FRAME_OVERHEAD) as u16
    }
}
