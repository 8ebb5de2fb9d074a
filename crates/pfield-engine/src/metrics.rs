//! Per-step metrics for the time stepper.
//!
//! [`StepMetrics`] captures timing and solver effort for a single
//! accepted step.

/// Timing and solver data collected during one step.
///
/// Durations are in microseconds and cover every attempt of the step,
/// including ones discarded by a retry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepMetrics {
    /// Wall-clock time for the whole step.
    pub total_us: u64,
    /// Time spent assembling and applying explicit updates.
    pub explicit_us: u64,
    /// Time spent in Newton solves.
    pub solve_us: u64,
    /// Per-field time: `(name, microseconds)`, in stepping order.
    pub field_us: Vec<(String, u64)>,
    /// Newton iterations over all solved fields.
    pub nonlinear_iterations: usize,
    /// CG iterations over all solved fields.
    pub linear_iterations: usize,
    /// Attempts discarded before the step was accepted.
    pub retries: u32,
}
