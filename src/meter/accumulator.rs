//! Cycle and second accumulation of ADC conversions.
//!
//! The ADC converts three channels in a fixed round-robin order
//! (current, voltage, supply). Every round contributes one instantaneous
//! power sample and one squared sample per line quantity to the current
//! [`CycleAccumulator`]. After [`CYCLE_LEN`] rounds the cycle's mean real power
//! moves into the [`SecondAccumulator`]; after [`CYCLE_COUNT`] cycles a
//! [`PowerReport`] is produced.
//!
//! Everything here is integer arithmetic and runs in the ADC interrupt.
//! There is no error path: conversion results are taken as delivered.

use crate::consts::{CYCLE_COUNT, CYCLE_LEN};

/// The quantity an ADC conversion result represents.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum SampleChannel {
    /// Line current sense.
    Current,
    /// Line voltage sense.
    Voltage,
    /// Local supply rail sense, consumed by the power gate.
    Supply,
}

impl SampleChannel {
    /// The channel converted after this one.
    pub const fn next(self) -> Self {
        match self {
            SampleChannel::Current => SampleChannel::Voltage,
            SampleChannel::Voltage => SampleChannel::Supply,
            SampleChannel::Supply => SampleChannel::Current,
        }
    }
}

/// Power figures for one second of sampling.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct PowerReport {
    /// Sum of the per-cycle mean real power over the second, in ADC units
    /// (current × voltage). Saturates at `u32::MAX`.
    pub real_power: u32,
    /// RMS current of the last cycle.
    pub rms_current: u32,
    /// RMS voltage of the last cycle.
    pub rms_voltage: u32,
    /// `rms_current × rms_voltage`.
    pub apparent_power: u32,
}

/// Per-cycle running sums.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleAccumulator {
    /// Sum of `current × voltage` over the cycle.
    pub power_sum: u64,
    /// Sum of `current²` over the cycle.
    pub current_sq_sum: u64,
    /// Sum of `voltage²` over the cycle.
    pub voltage_sq_sum: u64,
    /// Completed rounds in this cycle, `0..CYCLE_LEN`.
    pub samples: u8,
}

impl CycleAccumulator {
    /// Clears every sum and the round counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn mean(sum: u64) -> u32 {
        // Mean of u16 products always fits in u32.
        (sum / CYCLE_LEN as u64) as u32
    }
}

/// Per-second accumulation of cycle means.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SecondAccumulator {
    /// Sum of the mean real power of every completed cycle.
    pub total_power: u64,
    /// Completed cycles in this second, `0..CYCLE_COUNT`.
    pub cycles: u8,
}

impl SecondAccumulator {
    /// Clears the total and the cycle counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// The sampling pipeline of the metering unit.
///
/// Feed every conversion result to [`on_conversion`](SamplingAccumulator::on_conversion).
/// Supply readings are not accumulated; the caller routes them to the
/// [`PowerGate`](crate::meter::gate::PowerGate) before calling
/// [`end_round`](SamplingAccumulator::end_round).
#[derive(Debug, Default)]
pub struct SamplingAccumulator {
    current: u16,
    /// Running sums of the cycle in progress.
    pub cycle: CycleAccumulator,
    /// Running totals of the second in progress.
    pub second: SecondAccumulator,
}

impl SamplingAccumulator {
    /// Creates a zeroed accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest current reading of the round in progress.
    pub fn current(&self) -> u16 {
        self.current
    }

    /// Accumulates one conversion result.
    ///
    /// `Supply` results are ignored here.
    pub fn on_conversion(&mut self, channel: SampleChannel, value: u16) {
        let value64 = value as u64;
        match channel {
            SampleChannel::Current => {
                self.current = value;
                self.cycle.current_sq_sum += value64 * value64;
            }
            SampleChannel::Voltage => {
                self.cycle.power_sum += self.current as u64 * value64;
                self.cycle.voltage_sq_sum += value64 * value64;
            }
            SampleChannel::Supply => {}
        }
    }

    /// Closes a sampling round (called after the supply conversion).
    ///
    /// # Returns
    /// A [`PowerReport`] when this round completed the last cycle of a second.
    pub fn end_round(&mut self) -> Option<PowerReport> {
        self.cycle.samples += 1;
        if self.cycle.samples < CYCLE_LEN {
            return None;
        }

        let real_power = CycleAccumulator::mean(self.cycle.power_sum);
        self.second.total_power += real_power as u64;
        self.second.cycles += 1;

        let report = if self.second.cycles >= CYCLE_COUNT {
            let rms_current = integer_sqrt(CycleAccumulator::mean(self.cycle.current_sq_sum));
            let rms_voltage = integer_sqrt(CycleAccumulator::mean(self.cycle.voltage_sq_sum));
            let report = PowerReport {
                real_power: u32::try_from(self.second.total_power).unwrap_or(u32::MAX),
                rms_current,
                rms_voltage,
                apparent_power: rms_current * rms_voltage,
            };
            trace!(
                "second complete: p={} irms={} vrms={}",
                report.real_power,
                rms_current,
                rms_voltage
            );
            self.second.reset();
            Some(report)
        } else {
            None
        };

        self.cycle.reset();
        report
    }
}

/// Floor of the square root of `input`, computed digit by digit.
///
/// Exact for every `u32`, no floating point.
pub fn integer_sqrt(input: u32) -> u32 {
    let mut op = input;
    let mut res: u32 = 0;
    // Highest power of four not greater than the input.
    let mut one: u32 = 1 << 30;
    while one > op {
        one >>= 2;
    }

    while one != 0 {
        if op >= res + one {
            op -= res + one;
            res = (res >> 1) + one;
        } else {
            res >>= 1;
        }
        one >>= 2;
    }
    res
}
