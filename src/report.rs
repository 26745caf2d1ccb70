//! Body of a `DATA` message.
//!
//! The metering unit sends its per-second figures in the exact layout the
//! radio unit advertises, so the radio can copy the payload without parsing
//! it. All multi-byte fields are big-endian; values wider than their field
//! saturate.
//!
//! | Offset | Size | Field            |
//! |--------|------|------------------|
//! | 0      | 1    | version          |
//! | 1      | 4    | sequence         |
//! | 5      | 2    | power scale      |
//! | 7      | 1    | voltage scale    |
//! | 8      | 1    | watt-hour scale  |
//! | 9      | 1    | V_RMS            |
//! | 10     | 2    | real power       |
//! | 12     | 2    | apparent power   |
//! | 14     | 4    | watt-hours       |
//! | 18     | 1    | flags            |

use crate::consts::{REPORT_LEN, REPORT_VERSION};

/// Decoded report body.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct ReportPayload {
    /// Layout version, [`REPORT_VERSION`].
    pub version: u8,
    /// Report counter.
    pub sequence: u32,
    /// Power scale factor.
    pub p_scale: u16,
    /// Voltage scale factor.
    pub v_scale: u8,
    /// Watt-hour scale factor.
    pub wh_scale: u8,
    /// RMS voltage.
    pub v_rms: u8,
    /// Real power.
    pub real_power: u16,
    /// Apparent power.
    pub apparent_power: u16,
    /// Accumulated energy.
    pub watt_hours: u32,
    /// Status flags.
    pub flags: u8,
}

impl Default for ReportPayload {
    fn default() -> Self {
        Self {
            version: REPORT_VERSION,
            sequence: 0,
            p_scale: 0,
            v_scale: 0,
            wh_scale: 0,
            v_rms: 0,
            real_power: 0,
            apparent_power: 0,
            watt_hours: 0,
            flags: 0,
        }
    }
}

impl ReportPayload {
    /// Serializes the report body.
    pub fn encode(&self) -> [u8; REPORT_LEN] {
        let mut out = [0u8; REPORT_LEN];
        out[0] = self.version;
        out[1..5].copy_from_slice(&self.sequence.to_be_bytes());
        out[5..7].copy_from_slice(&self.p_scale.to_be_bytes());
        out[7] = self.v_scale;
        out[8] = self.wh_scale;
        out[9] = self.v_rms;
        out[10..12].copy_from_slice(&self.real_power.to_be_bytes());
        out[12..14].copy_from_slice(&self.apparent_power.to_be_bytes());
        out[14..18].copy_from_slice(&self.watt_hours.to_be_bytes());
        out[18] = self.flags;
        out
    }

    /// Parses a report body; `None` if `bytes` is too short.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let b: &[u8; REPORT_LEN] = bytes.get(..REPORT_LEN)?.try_into().ok()?;
        Some(Self {
            version: b[0],
            sequence: u32::from_be_bytes([b[1], b[2], b[3], b[4]]),
            p_scale: u16::from_be_bytes([b[5], b[6]]),
            v_scale: b[7],
            wh_scale: b[8],
            v_rms: b[9],
            real_power: u16::from_be_bytes([b[10], b[11]]),
            apparent_power: u16::from_be_bytes([b[12], b[13]]),
            watt_hours: u32::from_be_bytes([b[14], b[15], b[16], b[17]]),
            flags: b[18],
        })
    }
}

/// Narrows a value to `u8`, saturating.
pub(crate) fn saturate_u8(value: u32) -> u8 {
    u8::try_from(value).unwrap_or(u8::MAX)
}

/// Narrows a value to `u16`, saturating.
pub(crate) fn saturate_u16(value: u32) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_matches_debug_advertisement() {
        let report = ReportPayload {
            version: 0x01,
            sequence: 0x0101_0101,
            p_scale: 0x424A,
            v_scale: 0x7B,
            wh_scale: 0x09,
            v_rms: 0x31,
            real_power: 0x0802,
            apparent_power: 0x0A1A,
            watt_hours: 0x0000_010D,
            flags: 0x00,
        };
        assert_eq!(
            report.encode(),
            [
                0x01, 0x01, 0x01, 0x01, 0x01, 0x42, 0x4A, 0x7B, 0x09, 0x31, 0x08, 0x02, 0x0A, 0x1A,
                0x00, 0x00, 0x01, 0x0D, 0x00
            ]
        );
        assert_eq!(ReportPayload::decode(&report.encode()), Some(report));
    }

    #[test]
    fn test_decode_short_input() {
        assert_eq!(ReportPayload::decode(&[0x01, 0x02]), None);
    }

    #[test]
    fn test_saturation() {
        assert_eq!(saturate_u8(300), 255);
        assert_eq!(saturate_u8(42), 42);
        assert_eq!(saturate_u16(70_000), u16::MAX);
    }
}
