//! Additive checksum used by every link frame.
//!
//! The checksum is the sum of all bytes modulo 256. It is cheap enough to run
//! inside a UART interrupt and catches any single-bit error.

/// Returns the wrapping sum of `bytes`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Returns `true` when `claimed` is the checksum of `bytes`.
pub fn verify(bytes: &[u8], claimed: u8) -> bool {
    checksum(bytes) == claimed
}
