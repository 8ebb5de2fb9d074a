//! Steady Poisson and Laplace problems.

use crate::error::EquationError;
use crate::{check_finite, check_positive};
use pfield_assembly::{Equation, PointValue, QuadPoint, Terms};
use pfield_core::{FieldId, FieldSet};

/// `-∇·(k∇u) = s` with constant conductivity `k` and source `s`.
///
/// Residual `r(u) = ∫ sφ - ∫ k∇u·∇φ`; linearized operator
/// `∫ k∇Δu·∇φ`. A zero source gives Laplace's equation.
#[derive(Clone, Debug, PartialEq)]
pub struct Poisson {
    field: FieldId,
    conductivity: f64,
    source: f64,
}

impl Poisson {
    /// Poisson problem for `field`.
    pub fn new(field: FieldId, conductivity: f64, source: f64) -> Result<Self, EquationError> {
        Ok(Self {
            field,
            conductivity: check_positive("poisson", "conductivity", conductivity)?,
            source: check_finite("poisson", "source", source)?,
        })
    }

    /// Laplace's equation `Δu = 0`.
    pub fn laplace(field: FieldId) -> Self {
        Self {
            field,
            conductivity: 1.0,
            source: 0.0,
        }
    }
}

impl Equation for Poisson {
    fn name(&self) -> &str {
        "poisson"
    }

    fn field(&self) -> FieldId {
        self.field
    }

    fn reads(&self) -> FieldSet {
        FieldSet::empty()
    }

    fn rhs(&self, point: &QuadPoint<'_>) -> Terms {
        let g = point.gradient(self.field);
        Terms::scalar(
            self.source,
            [
                -self.conductivity * g[0],
                -self.conductivity * g[1],
                -self.conductivity * g[2],
            ],
        )
    }

    fn lhs(&self, _point: &QuadPoint<'_>, change: &PointValue) -> Terms {
        let g = change.scalar_gradient();
        Terms::scalar(
            0.0,
            [
                self.conductivity * g[0],
                self.conductivity * g[1],
                self.conductivity * g[2],
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_profile_is_a_laplace_solution_pointwise() {
        let eq = Poisson::laplace(FieldId(0));
        let mut pv = PointValue::ZERO;
        pv.gradient[0] = [1.0, 0.0, 0.0];
        let current = [pv];
        let q = QuadPoint::new([0.2, 0.0, 0.0], 1, 0.0, 1.0, &current, &[]);
        let t = eq.rhs(&q);
        assert_eq!(t.value[0], 0.0);
        assert_eq!(t.gradient[0], [-1.0, 0.0, 0.0]);
    }

    #[test]
    fn operator_is_linear_in_change() {
        let eq = Poisson::new(FieldId(0), 2.0, 1.0).unwrap();
        let q = QuadPoint::new([0.0; 3], 2, 0.0, 1.0, &[], &[]);
        let mut change = PointValue::ZERO;
        change.gradient[0] = [1.0, 2.0, 0.0];
        assert_eq!(eq.lhs(&q, &change).gradient[0], [2.0, 4.0, 0.0]);
        let mut doubled = change;
        doubled.gradient[0] = [2.0, 4.0, 0.0];
        assert_eq!(eq.lhs(&q, &doubled).gradient[0], [4.0, 8.0, 0.0]);
    }

    #[test]
    fn invalid_parameters() {
        assert!(Poisson::new(FieldId(0), -1.0, 0.0).is_err());
        assert!(Poisson::new(FieldId(0), 1.0, f64::INFINITY).is_err());
    }
}
