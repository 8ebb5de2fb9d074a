//! Allen–Cahn relaxation of a non-conserved order parameter.

use crate::error::EquationError;
use crate::{check_positive, double_well_derivative};
use pfield_assembly::{Equation, QuadPoint, Terms};
use pfield_core::{FieldId, FieldSet};

/// `∂η/∂t = -M (f'(η) - κΔη)` with the double well `f = W η²(1-η)²`.
///
/// Weak form: value term `-M f'(η)`, gradient term `-Mκ∇η`.
#[derive(Clone, Debug, PartialEq)]
pub struct AllenCahn {
    field: FieldId,
    mobility: f64,
    kappa: f64,
    barrier: f64,
    max_dt: Option<f64>,
}

impl AllenCahn {
    /// Allen–Cahn for `field` with mobility `M`, gradient energy `κ` and
    /// barrier height `W`.
    pub fn new(
        field: FieldId,
        mobility: f64,
        kappa: f64,
        barrier: f64,
    ) -> Result<Self, EquationError> {
        Ok(Self {
            field,
            mobility: check_positive("allen_cahn", "mobility", mobility)?,
            kappa: check_positive("allen_cahn", "kappa", kappa)?,
            barrier: check_positive("allen_cahn", "barrier", barrier)?,
            max_dt: None,
        })
    }

    /// Report the diffusive limit `h² / (2·dim·Mκ)` as `max_dt`.
    pub fn with_stability_limit(mut self, min_spacing: f64, dim: usize) -> Self {
        let dim = dim.max(1) as f64;
        self.max_dt = Some(min_spacing * min_spacing / (2.0 * dim * self.mobility * self.kappa));
        self
    }
}

impl Equation for AllenCahn {
    fn name(&self) -> &str {
        "allen_cahn"
    }

    fn field(&self) -> FieldId {
        self.field
    }

    fn reads(&self) -> FieldSet {
        FieldSet::empty()
    }

    fn rhs(&self, point: &QuadPoint<'_>) -> Terms {
        let eta = point.scalar(self.field);
        let g = point.gradient(self.field);
        let mk = self.mobility * self.kappa;
        Terms::scalar(
            -self.mobility * double_well_derivative(self.barrier, eta),
            [-mk * g[0], -mk * g[1], -mk * g[2]],
        )
    }

    fn max_dt(&self) -> Option<f64> {
        self.max_dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pfield_assembly::PointValue;

    fn at(eta: f64) -> Terms {
        let eq = AllenCahn::new(FieldId(0), 1.0, 1.0, 1.0).unwrap();
        let mut pv = PointValue::ZERO;
        pv.value[0] = eta;
        let current = [pv];
        eq.rhs(&QuadPoint::new([0.0; 3], 2, 0.0, 0.01, &current, &[]))
    }

    #[test]
    fn bulk_phases_are_stationary() {
        assert_eq!(at(0.0).value[0], 0.0);
        assert_eq!(at(1.0).value[0], 0.0);
    }

    #[test]
    fn order_parameter_relaxes_toward_nearest_well() {
        assert!(at(0.2).value[0] < 0.0);
        assert!(at(0.8).value[0] > 0.0);
    }

    #[test]
    fn stability_limit_includes_kappa() {
        let eq = AllenCahn::new(FieldId(0), 2.0, 0.5, 1.0)
            .unwrap()
            .with_stability_limit(0.2, 1);
        assert!((eq.max_dt().unwrap() - 0.02).abs() < 1e-15);
    }
}
