//! Linear diffusion, advanced explicitly or by backward Euler.
//!
//! Both forms apply component-wise, so they govern scalar and vector
//! fields alike.

use crate::check_positive;
use crate::error::EquationError;
use pfield_assembly::{Equation, PointValue, QuadPoint, Terms};
use pfield_core::{FieldId, FieldSet};

/// Forward-Euler diffusion `∂u/∂t = ∇·(D∇u)`.
///
/// The weak right-hand side is `-∫ D∇u·∇φ`. Constructed with an optional
/// stability limit from the smallest cell size: with a lumped mass the
/// scheme is stable for `dt ≤ h² / (2·dim·D)`.
///
/// ```
/// use pfield_core::FieldId;
/// use pfield_equations::Diffusion;
/// use pfield_assembly::Equation;
///
/// let eq = Diffusion::new(FieldId(0), 0.5)
///     .unwrap()
///     .with_stability_limit(0.1, 2);
/// assert!((eq.max_dt().unwrap() - 0.005).abs() < 1e-15);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Diffusion {
    field: FieldId,
    coefficient: f64,
    components: usize,
    max_dt: Option<f64>,
}

impl Diffusion {
    /// Scalar diffusion with coefficient `D > 0`.
    pub fn new(field: FieldId, coefficient: f64) -> Result<Self, EquationError> {
        Ok(Self {
            field,
            coefficient: check_positive("diffusion", "coefficient", coefficient)?,
            components: 1,
            max_dt: None,
        })
    }

    /// Diffuse each of `components` components independently.
    pub fn with_components(mut self, components: usize) -> Self {
        self.components = components.max(1);
        self
    }

    /// Report `h² / (2·dim·D)` as this equation's `max_dt`.
    pub fn with_stability_limit(mut self, min_spacing: f64, dim: usize) -> Self {
        let dim = dim.max(1) as f64;
        self.max_dt = Some(min_spacing * min_spacing / (2.0 * dim * self.coefficient));
        self
    }

    /// The diffusion coefficient.
    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }
}

impl Equation for Diffusion {
    fn name(&self) -> &str {
        "diffusion"
    }

    fn field(&self) -> FieldId {
        self.field
    }

    fn reads(&self) -> FieldSet {
        FieldSet::empty()
    }

    fn rhs(&self, point: &QuadPoint<'_>) -> Terms {
        let u = point.field(self.field);
        let mut terms = Terms::zero();
        for c in 0..self.components {
            for d in 0..point.dim() {
                terms.gradient[c][d] = -self.coefficient * u.gradient[c][d];
            }
        }
        terms
    }

    fn max_dt(&self) -> Option<f64> {
        self.max_dt
    }
}

/// Backward-Euler diffusion.
///
/// Each step solves `r(u) = 0` with
/// `r(u) = -∫ (u - uⁿ)φ - dt ∫ D∇u·∇φ`, so the linearized operator is
/// `∫ Δu φ + dt ∫ D∇Δu·∇φ`: symmetric positive definite for any `dt`.
#[derive(Clone, Debug, PartialEq)]
pub struct ImplicitDiffusion {
    field: FieldId,
    coefficient: f64,
    components: usize,
}

impl ImplicitDiffusion {
    /// Scalar backward-Euler diffusion with coefficient `D > 0`.
    pub fn new(field: FieldId, coefficient: f64) -> Result<Self, EquationError> {
        Ok(Self {
            field,
            coefficient: check_positive("diffusion", "coefficient", coefficient)?,
            components: 1,
        })
    }

    /// Diffuse each of `components` components independently.
    pub fn with_components(mut self, components: usize) -> Self {
        self.components = components.max(1);
        self
    }
}

impl Equation for ImplicitDiffusion {
    fn name(&self) -> &str {
        "implicit_diffusion"
    }

    fn field(&self) -> FieldId {
        self.field
    }

    fn reads(&self) -> FieldSet {
        FieldSet::empty()
    }

    fn reads_previous(&self) -> FieldSet {
        FieldSet::empty().with(self.field)
    }

    fn rhs(&self, point: &QuadPoint<'_>) -> Terms {
        let u = point.field(self.field);
        let old = point.previous(self.field);
        let scale = point.dt() * self.coefficient;
        let mut terms = Terms::zero();
        for c in 0..self.components {
            terms.value[c] = -(u.value[c] - old.value[c]);
            for d in 0..point.dim() {
                terms.gradient[c][d] = -scale * u.gradient[c][d];
            }
        }
        terms
    }

    fn lhs(&self, point: &QuadPoint<'_>, change: &PointValue) -> Terms {
        let scale = point.dt() * self.coefficient;
        let mut terms = Terms::zero();
        for c in 0..self.components {
            terms.value[c] = change.value[c];
            for d in 0..point.dim() {
                terms.gradient[c][d] = scale * change.gradient[c][d];
            }
        }
        terms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point_value(value: f64, gradient: [f64; 3]) -> PointValue {
        let mut pv = PointValue::ZERO;
        pv.value[0] = value;
        pv.gradient[0] = gradient;
        pv
    }

    #[test]
    fn explicit_flux_opposes_gradient() {
        let eq = Diffusion::new(FieldId(0), 2.0).unwrap();
        let current = [point_value(1.0, [1.0, -0.5, 0.0])];
        let q = QuadPoint::new([0.0; 3], 2, 0.0, 0.1, &current, &[]);
        let t = eq.rhs(&q);
        assert_eq!(t.value[0], 0.0);
        assert_eq!(t.gradient[0], [-2.0, 1.0, 0.0]);
    }

    #[test]
    fn gradient_beyond_mesh_dimension_is_ignored() {
        let eq = Diffusion::new(FieldId(0), 1.0).unwrap();
        let current = [point_value(0.0, [1.0, 1.0, 1.0])];
        let q = QuadPoint::new([0.0; 3], 1, 0.0, 0.1, &current, &[]);
        assert_eq!(eq.rhs(&q).gradient[0], [-1.0, 0.0, 0.0]);
    }

    #[test]
    fn vector_components_diffuse_independently() {
        let eq = Diffusion::new(FieldId(0), 1.0).unwrap().with_components(2);
        let mut pv = PointValue::ZERO;
        pv.gradient[0] = [1.0, 0.0, 0.0];
        pv.gradient[1] = [0.0, 3.0, 0.0];
        let current = [pv];
        let q = QuadPoint::new([0.0; 3], 2, 0.0, 0.1, &current, &[]);
        let t = eq.rhs(&q);
        assert_eq!(t.gradient[0], [-1.0, 0.0, 0.0]);
        assert_eq!(t.gradient[1], [0.0, -3.0, 0.0]);
    }

    #[test]
    fn non_positive_coefficient_is_rejected() {
        assert!(Diffusion::new(FieldId(0), 0.0).is_err());
        assert!(ImplicitDiffusion::new(FieldId(0), f64::NAN).is_err());
    }

    #[test]
    fn implicit_residual_vanishes_at_steady_unchanged_state() {
        let eq = ImplicitDiffusion::new(FieldId(0), 1.0).unwrap();
        let current = [point_value(0.3, [0.0; 3])];
        let previous = [point_value(0.3, [0.0; 3])];
        let q = QuadPoint::new([0.0; 3], 2, 0.0, 0.5, &current, &previous);
        assert!(eq.rhs(&q) == Terms::zero());
        assert!(eq.reads_previous().contains(FieldId(0)));
    }

    #[test]
    fn implicit_operator_scales_stiffness_by_dt() {
        let eq = ImplicitDiffusion::new(FieldId(0), 4.0).unwrap();
        let q = QuadPoint::new([0.0; 3], 2, 0.0, 0.25, &[], &[]);
        let t = eq.lhs(&q, &point_value(2.0, [1.0, 1.0, 0.0]));
        assert_eq!(t.value[0], 2.0);
        assert_eq!(t.gradient[0], [1.0, 1.0, 0.0]);
    }
}
