//! Link protocol error types.
//!
//! None of these are fatal. Receive-side errors are answered with a NAK or
//! ignored; transmit-side errors drop the frame.

use thiserror::Error;

/// Errors produced while framing or unframing link messages.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum LinkError {
    /// The trailing checksum byte does not match the frame contents.
    #[error("checksum mismatch: computed 0x{computed:02X}, received 0x{received:02X}")]
    ChecksumMismatch {
        /// Checksum computed over the received bytes.
        computed: u8,
        /// Checksum byte carried by the frame.
        received: u8,
    },

    /// The declared length is shorter than the smallest possible frame.
    #[error("malformed length field: {0}")]
    MalformedLength(u16),

    /// The type byte is not a known message type.
    #[error("unrecognized message type: 0x{0:02X}")]
    UnrecognizedType(u8),

    /// The payload does not fit in a single frame.
    #[error("payload too long: {len} bytes, maximum {max}")]
    PayloadTooLong {
        /// Length of the rejected payload.
        len: usize,
        /// Largest accepted payload.
        max: usize,
    },

    /// The outbound byte queue cannot hold the frame.
    #[error("transmit queue full")]
    QueueFull,
}
