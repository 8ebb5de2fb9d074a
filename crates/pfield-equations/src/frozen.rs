//! A field that never changes.

use pfield_assembly::{Equation, QuadPoint, Terms};
use pfield_core::{FieldId, FieldSet};

/// `∂u/∂t = 0`: the update is identically zero.
///
/// Useful for fields that only carry initial data, such as a fixed
/// order parameter read by other equations.
#[derive(Clone, Debug, PartialEq)]
pub struct Frozen {
    field: FieldId,
}

impl Frozen {
    /// Freeze `field`.
    pub fn new(field: FieldId) -> Self {
        Self { field }
    }
}

impl Equation for Frozen {
    fn name(&self) -> &str {
        "frozen"
    }

    fn field(&self) -> FieldId {
        self.field
    }

    fn reads(&self) -> FieldSet {
        FieldSet::empty()
    }

    fn rhs(&self, _point: &QuadPoint<'_>) -> Terms {
        Terms::zero()
    }
}
