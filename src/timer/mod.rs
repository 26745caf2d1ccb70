//! Timing helpers and interrupt glue for both units.
//!
//! Two ways of driving the link are supported: interrupt handlers sharing the
//! unit through `critical_section` (`isr` feature), or a blocking window loop
//! over `embedded_hal::delay::DelayNs` (`delay-loop` feature).
//!
//! Contains:
//! - `compute_adc_trigger` / `const_adc_trigger`: compare value of the timer
//!   that triggers ADC conversions
//! - `compute_window_ticks` / `const_window_ticks`: compare value of the radio
//!   unit's window timer
//! - `run_window_loop`: blocking radio loop (feature `delay-loop`)
//! - `Shared` globals and the `init_*!`/`setup_*!` macros (feature `isr`)
//!
//! Typical trigger compare values (1260 rounds, 3780 conversions per second):
//!
//! | Clock      | Divider | Trigger compare |
//! |------------|---------|-----------------|
//! | 32.768 kHz |       1 |               8 |
//! | 1 MHz      |       1 |             264 |
//! | 8 MHz      |       8 |             264 |

use libm::round;

use crate::consts::{CYCLE_COUNT, CYCLE_LEN};

#[cfg(feature = "delay-loop")]
mod delay;
#[cfg_attr(feature = "delay-loop", allow(unused_imports))]
#[cfg(feature = "delay-loop")]
pub use delay::*;

#[cfg(feature = "isr")]
mod isr;
#[cfg_attr(feature = "isr", allow(unused_imports))]
#[cfg(feature = "isr")]
pub use isr::*;

#[cfg(feature = "isr")]
mod macros;

/// Sampling rounds per second (one round per current/voltage/supply triple).
pub const ROUNDS_PER_SECOND: u32 = CYCLE_LEN as u32 * CYCLE_COUNT as u32;
/// ADC conversions per sampling round.
pub const CONVERSIONS_PER_ROUND: u32 = 3;
/// Interval between reports from the metering unit.
pub const REPORT_PERIOD_MS: u32 = 1_000;
/// Milliseconds per second.
pub const MILLIS_PER_SECOND: u32 = 1_000;

/// Computes the compare value of an up-counting timer triggering ADC
/// conversions, so that a full second of rounds fits one second.
///
/// # Arguments
/// - `clock_hz`: timer input clock in Hz
/// - `divider`: timer input divider (1, 2, 4, 8)
///
/// # Returns
/// - Compare value (the timer period is `compare + 1` counts)
pub fn compute_adc_trigger(clock_hz: u32, divider: u32) -> u16 {
    let counts_per_second = clock_hz as f64 / divider as f64;
    let conversions = (ROUNDS_PER_SECOND * CONVERSIONS_PER_ROUND) as f64;
    let period = round(counts_per_second / conversions);
    if period < 1.0 {
        return 0;
    }
    (period as u32 - 1).min(u16::MAX as u32) as u16
}

/// Compile-time version of [`compute_adc_trigger`], truncating instead of
/// rounding.
pub const fn const_adc_trigger(clock_hz: u32, divider: u32) -> u16 {
    let period = clock_hz / divider / (ROUNDS_PER_SECOND * CONVERSIONS_PER_ROUND);
    if period == 0 {
        return 0;
    }
    let compare = period - 1;
    if compare > u16::MAX as u32 {
        u16::MAX
    } else {
        compare as u16
    }
}

/// Computes the compare value of the radio unit's low-frequency window timer.
///
/// # Arguments
/// - `lfclk_hz`: low-frequency clock in Hz (usually 32768)
/// - `prescaler`: timer prescaler register value (divides by `prescaler + 1`)
/// - `period_ms`: window period in milliseconds
///
/// # Returns
/// - Timer ticks per window, rounded to the nearest tick
pub fn compute_window_ticks(lfclk_hz: u32, prescaler: u32, period_ms: u32) -> u32 {
    let ticks_per_second = lfclk_hz as f64 / (prescaler as f64 + 1.0);
    round(ticks_per_second * period_ms as f64 / MILLIS_PER_SECOND as f64) as u32
}

/// Compile-time version of [`compute_window_ticks`], truncating instead of
/// rounding.
pub const fn const_window_ticks(lfclk_hz: u32, prescaler: u32, period_ms: u32) -> u32 {
    let ticks = period_ms as u64 * lfclk_hz as u64
        / ((prescaler as u64 + 1) * MILLIS_PER_SECOND as u64);
    ticks as u32
}
