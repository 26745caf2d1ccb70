//! Link state of the radio unit and per-window arbitration.
//!
//! Three independent sub-states may each want the next transmit window. They
//! are consulted in a fixed order and the first one with something to send
//! takes the window:
//!
//! 1. [`NakState`]
//! 2. [`RawSampleState`] (only `Start`, `Next` and `Quit` send)
//! 3. [`CalibrationState`]

use crate::radio::streaming::RawSampleState;

/// Pending negative-acknowledgement work.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum NakState {
    /// Nothing to do.
    #[default]
    None,
    /// An inbound frame failed its checksum; send a NAK.
    PendingChecksumNak,
    /// The peer NAKed our last frame; send it again.
    PendingResend,
}

/// Pending calibration traffic.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum CalibrationState {
    /// Nothing to do.
    #[default]
    None,
    /// Send SET_SEQ with this value.
    SetSequence(u8),
}

/// What to send in a window.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Outbound {
    /// NAK with an empty payload.
    ChecksumNak,
    /// The previously transmitted bytes, verbatim.
    Resend,
    /// START_SAMPLE.
    StartSample,
    /// CONT_SAMPLE (chunk request).
    ContSample,
    /// DONE_SAMPLE.
    DoneSample,
    /// SET_SEQ with the given value.
    SetSequence(u8),
}

type Arbiter = fn(&mut LinkState) -> Option<Outbound>;

/// Sub-states in priority order.
const PRIORITY: [Arbiter; 3] = [claim_nak, claim_raw_sample, claim_calibration];

/// The radio unit's link state.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct LinkState {
    /// NAK handling.
    pub nak: NakState,
    /// Raw-sample streaming.
    pub raw_sample: RawSampleState,
    /// Calibration.
    pub calibration: CalibrationState,
}

impl LinkState {
    /// Creates an idle link state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decides what to send in a free window and applies the transition.
    ///
    /// # Returns
    /// `None` if nothing is sent this window.
    pub fn next_outbound(&mut self) -> Option<Outbound> {
        PRIORITY.iter().find_map(|claim| claim(self))
    }
}

fn claim_nak(state: &mut LinkState) -> Option<Outbound> {
    let outbound = match state.nak {
        NakState::None => return None,
        NakState::PendingChecksumNak => Outbound::ChecksumNak,
        NakState::PendingResend => Outbound::Resend,
    };
    state.nak = NakState::None;
    Some(outbound)
}

fn claim_raw_sample(state: &mut LinkState) -> Option<Outbound> {
    state.raw_sample.take_outbound()
}

fn claim_calibration(state: &mut LinkState) -> Option<Outbound> {
    match state.calibration {
        CalibrationState::None => None,
        CalibrationState::SetSequence(value) => {
            state.calibration = CalibrationState::None;
            Some(Outbound::SetSequence(value))
        }
    }
}
