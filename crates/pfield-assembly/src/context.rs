//! Inputs shared by every assembly call within one evaluation.

use pfield_core::{FieldId, FieldReader};

/// Read-only field access and time data for assembly.
///
/// Holds two views, like a double-buffered step:
///
/// - **`current`**: the values equations see through
///   [`QuadPoint::field`](crate::QuadPoint::field).
/// - **`previous`**: the values at the start of the step, seen through
///   [`QuadPoint::previous`](crate::QuadPoint::previous).
///
/// `components[f]` is the DOFs-per-node of field `f`. Both views are
/// shared across assembly threads, hence the `Sync` bound.
#[derive(Clone, Copy)]
pub struct AssemblyContext<'a> {
    current: &'a (dyn FieldReader + Sync),
    previous: &'a (dyn FieldReader + Sync),
    components: &'a [usize],
    time: f64,
    dt: f64,
}

impl<'a> AssemblyContext<'a> {
    /// Construct a context.
    ///
    /// Typically built by the stepper; tests pass mock readers from
    /// `pfield-test-utils` or plain `Vec<Vec<f64>>`s.
    pub fn new(
        current: &'a (dyn FieldReader + Sync),
        previous: &'a (dyn FieldReader + Sync),
        components: &'a [usize],
        time: f64,
        dt: f64,
    ) -> Self {
        Self {
            current,
            previous,
            components,
            time,
            dt,
        }
    }

    /// Current-value reader.
    pub fn current(&self) -> &'a (dyn FieldReader + Sync) {
        self.current
    }

    /// Start-of-step reader.
    pub fn previous(&self) -> &'a (dyn FieldReader + Sync) {
        self.previous
    }

    /// DOFs per node of `field`, if it exists.
    pub fn components(&self, field: FieldId) -> Option<usize> {
        self.components.get(field.index()).copied()
    }

    /// Number of fields known to the context.
    pub fn n_fields(&self) -> usize {
        self.components.len()
    }

    /// Time at the start of the step.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Step size.
    pub fn dt(&self) -> f64 {
        self.dt
    }
}
