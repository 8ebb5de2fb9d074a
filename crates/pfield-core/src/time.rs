//! The time state advanced by the stepper and persisted in checkpoints.

use crate::id::StepIndex;

/// Current simulation time, step counter, and step size.
///
/// `time` and `step` only ever increase. `dt` may shrink after a failed
/// step and keeps its reduced value afterwards, so it is part of the state
/// a restart must reproduce.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeState {
    /// Completed steps since the start of the run.
    pub step: StepIndex,
    /// Simulated time reached after `step` steps.
    pub time: f64,
    /// Step size for the next step.
    pub dt: f64,
}

impl TimeState {
    /// State at the beginning of a run.
    pub fn initial(dt: f64) -> Self {
        Self {
            step: StepIndex(0),
            time: 0.0,
            dt,
        }
    }

    /// State after completing a step of size `taken`.
    pub fn advanced(self, taken: f64) -> Self {
        Self {
            step: self.step.next(),
            time: self.time + taken,
            dt: self.dt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advancing_keeps_dt_and_counts_steps() {
        let t = TimeState::initial(0.25).advanced(0.25).advanced(0.1);
        assert_eq!(t.step, StepIndex(2));
        assert!((t.time - 0.35).abs() < 1e-15);
        assert_eq!(t.dt, 0.25);
    }
}
