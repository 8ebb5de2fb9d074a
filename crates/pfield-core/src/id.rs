//! Strongly-typed identifiers.

use std::fmt;

/// Identifies a field within a simulation.
///
/// Fields are declared before the mesh is attached and assigned sequential
/// IDs. `FieldId(n)` corresponds to the n-th declared field, which is also
/// the order fields are stepped in and written to checkpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub u32);

impl FieldId {
    /// The ID as a vector index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FieldId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Monotonically increasing time-step counter.
///
/// Incremented each time the simulation completes one step. Failed
/// attempts that are retried with a smaller step size do not advance it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepIndex(pub u64);

impl StepIndex {
    /// The following step index.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for StepIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepIndex {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
