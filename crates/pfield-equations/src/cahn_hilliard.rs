//! Cahn–Hilliard split into a conserved concentration and its chemical
//! potential.
//!
//! The fourth-order equation `∂c/∂t = ∇·(M∇(f'(c) - κΔc))` is solved as
//! two second-order fields: an explicit [`CahnHilliard`] concentration
//! reading `μ`, and a time-independent [`ChemicalPotential`] that is
//! re-solved every step from the freshly advanced `c`.

use crate::error::EquationError;
use crate::{check_positive, double_well_derivative};
use pfield_assembly::{Equation, PointValue, QuadPoint, Terms};
use pfield_core::{FieldId, FieldSet};

/// `∂c/∂t = ∇·(M∇μ)`; weak right-hand side `-∫ M∇μ·∇φ`.
#[derive(Clone, Debug, PartialEq)]
pub struct CahnHilliard {
    field: FieldId,
    potential: FieldId,
    mobility: f64,
}

impl CahnHilliard {
    /// Concentration `field` driven by the chemical potential field.
    pub fn new(field: FieldId, potential: FieldId, mobility: f64) -> Result<Self, EquationError> {
        Ok(Self {
            field,
            potential,
            mobility: check_positive("cahn_hilliard", "mobility", mobility)?,
        })
    }
}

impl Equation for CahnHilliard {
    fn name(&self) -> &str {
        "cahn_hilliard"
    }

    fn field(&self) -> FieldId {
        self.field
    }

    fn reads(&self) -> FieldSet {
        FieldSet::empty().with(self.potential)
    }

    fn rhs(&self, point: &QuadPoint<'_>) -> Terms {
        let g = point.gradient(self.potential);
        let m = self.mobility;
        Terms::scalar(0.0, [-m * g[0], -m * g[1], -m * g[2]])
    }
}

/// `μ = f'(c) - κΔc`, solved as a projection.
///
/// Residual `r(μ) = ∫ (f'(c) - μ)φ + ∫ κ∇c·∇φ`; the linearized operator
/// is the mass matrix `∫ Δμ φ`.
#[derive(Clone, Debug, PartialEq)]
pub struct ChemicalPotential {
    field: FieldId,
    concentration: FieldId,
    kappa: f64,
    barrier: f64,
}

impl ChemicalPotential {
    /// Potential `field` of the given concentration.
    pub fn new(
        field: FieldId,
        concentration: FieldId,
        kappa: f64,
        barrier: f64,
    ) -> Result<Self, EquationError> {
        Ok(Self {
            field,
            concentration,
            kappa: check_positive("chemical_potential", "kappa", kappa)?,
            barrier: check_positive("chemical_potential", "barrier", barrier)?,
        })
    }
}

impl Equation for ChemicalPotential {
    fn name(&self) -> &str {
        "chemical_potential"
    }

    fn field(&self) -> FieldId {
        self.field
    }

    fn reads(&self) -> FieldSet {
        FieldSet::empty().with(self.concentration)
    }

    fn rhs(&self, point: &QuadPoint<'_>) -> Terms {
        let c = point.scalar(self.concentration);
        let g = point.gradient(self.concentration);
        let mu = point.scalar(self.field);
        let k = self.kappa;
        Terms::scalar(
            double_well_derivative(self.barrier, c) - mu,
            [k * g[0], k * g[1], k * g[2]],
        )
    }

    fn lhs(&self, _point: &QuadPoint<'_>, change: &PointValue) -> Terms {
        Terms::scalar(change.scalar(), [0.0; 3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn potential_residual_vanishes_at_bulk_equilibrium() {
        let eq = ChemicalPotential::new(FieldId(1), FieldId(0), 1.0, 1.0).unwrap();
        let mut c = PointValue::ZERO;
        c.value[0] = 0.25;
        let mut mu = PointValue::ZERO;
        mu.value[0] = double_well_derivative(1.0, 0.25);
        let current = [c, mu];
        let t = eq.rhs(&QuadPoint::new([0.0; 3], 2, 0.0, 0.1, &current, &[]));
        assert_eq!(t, Terms::zero());
    }

    #[test]
    fn concentration_flows_down_potential_gradient() {
        let eq = CahnHilliard::new(FieldId(0), FieldId(1), 0.5).unwrap();
        let mut mu = PointValue::ZERO;
        mu.gradient[0] = [2.0, 0.0, 0.0];
        let current = [PointValue::ZERO, mu];
        let t = eq.rhs(&QuadPoint::new([0.0; 3], 1, 0.0, 0.1, &current, &[]));
        assert_eq!(t.gradient[0], [-1.0, 0.0, 0.0]);
        assert!(eq.reads().contains(FieldId(1)));
    }
}
