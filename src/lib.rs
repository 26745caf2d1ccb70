//! # powerblade-link
//!
//! A portable, no_std Rust implementation of a two-processor plug-load power
//! meter: a metering unit that turns ADC samples into per-second power
//! reports, and a radio unit that advertises them and streams raw samples to
//! a connected client on demand.
//!
//! This crate implements:
//! - integer-only RMS/power accumulation with a supply-driven power gate
//! - a length-prefixed, checksummed serial framing between the two units
//! - the radio unit's prioritized per-window link state machine
//! - optional interrupt sharing with `critical-section` or a blocking window loop
//!
//! ## Crate features
//! | Feature          | Description |
//! |------------------|-------------|
//! | `std`            | Builds against `std` (host tests and tools) |
//! | `isr` (default)  | `critical_section` globals and the `init_*!`/`setup_*!` macros |
//! | `delay-loop`     | Blocking radio window loop over `embedded_hal::delay::DelayNs` |
//! | `defmt-0-3`      | Uses `defmt` logging |
//! | `log`            | Uses `log` logging |
//!
//! ## Wire format
//!
//! ```text
//! | length (2, BE, whole frame) | type (1) | payload (0..=200) | checksum (1) |
//! ```
//!
//! The checksum is the 8-bit wrapping sum of every preceding byte. A NAK is
//! therefore always `00 04 02 06`.
//!
//! ## Usage
//!
//! ```rust
//! use powerblade_link::radio::{RadioConfig, RadioLink, RadioServices, StreamStatus};
//!
//! struct Ble;
//! impl RadioServices for Ble {
//!     fn update_advertisement(&mut self, _data: &[u8]) {}
//!     fn update_sample_data(&mut self, _data: &[u8]) {}
//!     fn notify_status(&mut self, _status: StreamStatus) {}
//! }
//!
//! let mut radio = RadioLink::new(RadioConfig::default());
//! for byte in [0x00, 0x04, 0x02, 0x06] {
//!     radio.on_uart_rx(byte, &mut Ble); // from the UART RX interrupt
//! }
//! radio.open_window(); // from the window timer
//! if radio.poll_transmit() {
//!     while let Some(_byte) = radio.next_tx_byte() {
//!         // write to the UART
//!     }
//! }
//! ```
//!
//! The metering unit side is [`meter::Meter`]; see its module docs.
//!
//! ## Integration Notes
//!
//! - The metering unit expects three conversions per round (current, voltage,
//!   supply) at 1260 rounds per second; see [`timer::compute_adc_trigger`].
//! - The radio unit sends at most one message per window and never retries
//!   on its own; lost replies show up as marker bytes in the sample buffer.
//! - Only one instance of each unit should be installed in interrupt mode.
//!
//! --
//! Designed for `#![no_std]` use in resource-constrained embedded environments.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
mod fmt;

#[cfg(feature = "isr")]
pub use critical_section;

pub use heapless;

pub mod checksum;
pub mod consts;
pub mod error;
pub mod framer;
pub mod message;
pub mod meter;
pub mod radio;
pub mod report;
pub mod timer;
