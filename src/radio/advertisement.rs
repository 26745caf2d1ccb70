//! Manufacturer-specific advertisement body.
//!
//! The first byte is the service identifier; the rest is the latest report
//! body received from the metering unit, copied verbatim.

use heapless::Vec;

use crate::consts::{
    ADV_DATA_MAX_LEN, DEFAULT_P_SCALE, DEFAULT_V_SCALE, DEFAULT_WH_SCALE, REPORT_VERSION,
};
use crate::report::ReportPayload;

/// Advertisement buffer, service id included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    data: Vec<u8, ADV_DATA_MAX_LEN>,
}

impl Advertisement {
    /// Builds the debugging advertisement shown before the first report.
    pub fn debug(service_id: u8) -> Self {
        let report = ReportPayload {
            version: REPORT_VERSION,
            sequence: 0x0101_0101,
            p_scale: DEFAULT_P_SCALE,
            v_scale: DEFAULT_V_SCALE,
            wh_scale: DEFAULT_WH_SCALE,
            v_rms: 0x31,
            real_power: 0x0802,
            apparent_power: 0x0A1A,
            watt_hours: 0x0000_010D,
            flags: 0,
        };
        let mut adv = Self { data: Vec::new() };
        let _ = adv.update(service_id, &report.encode());
        adv
    }

    /// Replaces the body. Bytes past the buffer bound are dropped.
    ///
    /// # Returns
    /// Number of body bytes kept.
    pub fn update(&mut self, service_id: u8, body: &[u8]) -> usize {
        let kept = body.len().min(ADV_DATA_MAX_LEN - 1);
        self.data.clear();
        let _ = self.data.push(service_id);
        let _ = self.data.extend_from_slice(&body[..kept]);
        kept
    }

    /// Full advertisement bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}
