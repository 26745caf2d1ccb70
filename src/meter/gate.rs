//! Supply-driven power gating.
//!
//! The metering unit runs from a capacitor charged off the line. Every round
//! ends with a supply conversion, and [`PowerGate::on_supply`] decides from
//! that single reading whether the downstream circuitry may run:
//!
//! | Reading                 | State                          | Side effect            |
//! |-------------------------|--------------------------------|------------------------|
//! | `< v_min`               | [`Off`](PowerGateState::Off)   | radio rail disabled    |
//! | `> v_charge`            | [`Ready`](PowerGateState::Ready) | sensing rail enabled |
//! | otherwise               | [`Off`](PowerGateState::Off)   | none                   |
//!
//! The evaluation is one-shot: a reading between the thresholds forces `Off`
//! rather than keeping the previous state.
//!
//! A report is only released while the gate is `Ready`. Releasing it turns the
//! radio rail on and drops the gate back to `Off` until the next charged reading.

use embedded_hal::digital::OutputPin;

/// Gate decision derived from the latest supply reading.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum PowerGateState {
    /// Supply too low; reports are suppressed.
    #[default]
    Off,
    /// Intermediate state reserved for a latching policy. The one-shot policy never enters it.
    Armed,
    /// Supply charged; the next report may be sent.
    Ready,
}

/// Power-gate policy driving the sensing and radio rail enables.
///
/// ## Type Parameters
///
/// - `SEN`: output enabling the sensing front end
/// - `SYS`: output enabling the radio unit's supply
#[derive(Debug)]
pub struct PowerGate<SEN, SYS>
where
    SEN: OutputPin,
    SYS: OutputPin,
{
    /// Sensing rail enable.
    pub sense_en: SEN,
    /// Radio rail enable.
    pub sys_en: SYS,
    /// Current gate state.
    pub state: PowerGateState,
    v_min: u16,
    v_charge: u16,
    /// Reports dropped because the gate was not ready.
    pub suppressed: u16,
}

impl<SEN, SYS> PowerGate<SEN, SYS>
where
    SEN: OutputPin,
    SYS: OutputPin,
{
    /// Creates a gate with both rails driven low.
    pub fn new(sense_en: SEN, sys_en: SYS, v_min: u16, v_charge: u16) -> Self {
        let mut gate = Self {
            sense_en,
            sys_en,
            state: PowerGateState::Off,
            v_min,
            v_charge,
            suppressed: 0,
        };
        let _ = gate.sense_en.set_low();
        let _ = gate.sys_en.set_low();
        gate
    }

    /// Evaluates one supply reading.
    pub fn on_supply(&mut self, sample: u16) -> PowerGateState {
        self.state = if sample < self.v_min {
            let _ = self.sys_en.set_low();
            PowerGateState::Off
        } else if sample > self.v_charge {
            let _ = self.sense_en.set_high();
            PowerGateState::Ready
        } else {
            PowerGateState::Off
        };
        self.state
    }

    /// Asks to release a report.
    ///
    /// # Returns
    /// `true` if the gate was [`Ready`](PowerGateState::Ready); the radio rail is
    /// then enabled and the gate resets to [`Off`](PowerGateState::Off).
    pub fn release(&mut self) -> bool {
        if self.state != PowerGateState::Ready {
            self.suppressed = self.suppressed.wrapping_add(1);
            debug!("gate: report suppressed ({} so far)", self.suppressed);
            return false;
        }
        let _ = self.sys_en.set_high();
        self.state = PowerGateState::Off;
        true
    }
}
