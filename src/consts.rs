//! Constants used across the metering pipeline and the link protocol.
//!
//! This module defines the sampling window sizes, the supply thresholds used
//! by the power gate, the link message type codes, and the bounds of every
//! fixed-capacity buffer in the crate.
//!
//! ## Key Concepts
//!
//! - **Cycle**: [`CYCLE_LEN`] sampling rounds, roughly one AC half-cycle.
//! - **Second**: [`CYCLE_COUNT`] cycles, after which a report is produced.
//! - **Frame**: `length (2, BE) | type (1) | payload | checksum (1)`.
//! - **Sentinels**: marker bytes written into the raw-sample buffer when the
//!   peer does not answer or a frame fails its checksum.
//!
//! Runtime-tunable values (thresholds, scale factors) live in
//! [`MeterConfig`](crate::meter::MeterConfig); the values here are their defaults.

/// Number of sampling rounds in one accumulation cycle.
pub const CYCLE_LEN: u8 = 21;

/// Number of cycles accumulated before a [`PowerReport`](crate::meter::accumulator::PowerReport)
/// is produced.
pub const CYCLE_COUNT: u8 = 60;

/// Supply reading below which the radio rail is switched off.
pub const ADC_VMIN: u16 = 92;

/// Supply reading above which the sensing rail is enabled and reports may be sent.
pub const ADC_VCHG: u16 = 138;

/// Length of the big-endian length prefix.
pub const LENGTH_FIELD_LEN: usize = 2;

/// Bytes every frame carries besides its payload: length, type and checksum.
pub const FRAME_OVERHEAD: usize = LENGTH_FIELD_LEN + 2;

/// Smallest well-formed frame (a type code with an empty payload).
pub const MIN_FRAME_LEN: usize = FRAME_OVERHEAD;

/// Maximum size of one raw-sample chunk carried by `CONT_SAMPLE`.
pub const SAMPLE_CHUNK_MAX_LEN: usize = 200;

/// Maximum manufacturer-specific advertisement length, service id included.
pub const ADV_DATA_MAX_LEN: usize = 24;

/// Largest payload any message may carry.
pub const MAX_PAYLOAD_LEN: usize = SAMPLE_CHUNK_MAX_LEN;

/// Receive bound of the unframer; bytes beyond it are discarded.
pub const MAX_FRAME_LEN: usize = MAX_PAYLOAD_LEN + FRAME_OVERHEAD;

/// Capacity of the metering unit's outbound byte queue.
///
/// `heapless::spsc::Queue` keeps one slot free, so this holds 511 bytes:
/// enough for a report frame queued behind a full sample chunk.
pub const TX_QUEUE_LEN: usize = 512;

/// Capacity, in bytes, of the metering unit's raw-sample capture buffer.
pub const SAMPLE_BUF_LEN: usize = 512;

/// Message type code: power report / advertisement body.
pub const MSG_DATA: u8 = 0x01;
/// Message type code: negative acknowledgement, asks the peer to resend.
pub const MSG_NAK: u8 = 0x02;
/// Message type code: set the report sequence counter (1-byte payload).
pub const MSG_SET_SEQ: u8 = 0x03;
/// Message type code: begin raw-sample streaming, or its acknowledgement.
pub const MSG_START_SAMPLE: u8 = 0x10;
/// Message type code: request for, or delivery of, one raw-sample chunk.
pub const MSG_CONT_SAMPLE: u8 = 0x11;
/// Message type code: end raw-sample streaming, or its confirmation.
pub const MSG_DONE_SAMPLE: u8 = 0x12;

/// Sequence value of the SET_SEQ queued by [`RadioConfig::calibrate_on_start`].
///
/// [`RadioConfig::calibrate_on_start`]: crate::radio::RadioConfig::calibrate_on_start
pub const DEFAULT_CALIBRATION_SEQUENCE: u8 = 150;

/// Raw-sample buffer marker: an inbound frame failed its checksum.
pub const MARKER_CHECKSUM_FAIL: u8 = 0xA5;
/// Raw-sample buffer marker: no acknowledgement while waiting for START.
pub const MARKER_NO_START_ACK: u8 = 0xF1;
/// Raw-sample buffer marker: no chunk while waiting for data.
pub const MARKER_NO_DATA: u8 = 0xF2;
/// Raw-sample buffer marker: no confirmation while waiting for DONE.
pub const MARKER_NO_DONE: u8 = 0xF3;

/// Service identifier placed in front of the advertised report body.
pub const SERVICE_IDENTIFIER: u8 = 0x11;

/// Version byte of the report body.
pub const REPORT_VERSION: u8 = 0x01;

/// Encoded length of a report body (see [`crate::report`]).
pub const REPORT_LEN: usize = 19;

/// Default power scale factor advertised with each report.
pub const DEFAULT_P_SCALE: u16 = 0x424A;
/// Default voltage scale factor advertised with each report.
pub const DEFAULT_V_SCALE: u8 = 0x7B;
/// Default watt-hour scale factor advertised with each report.
pub const DEFAULT_WH_SCALE: u8 = 0x09;
