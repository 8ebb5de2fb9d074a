//! The [`Equation`] trait.
//!
//! Equations are stateless pointwise weak forms. They declare their field
//! dependencies once, at pipeline validation, and are evaluated at every
//! quadrature point of every cell during assembly.

use crate::point::{PointValue, QuadPoint, Terms};
use pfield_core::{FieldId, FieldSet};

/// Governing equation of one field.
///
/// # Sign convention
///
/// [`rhs`](Self::rhs) returns the weak-form integrand of the right-hand
/// side `r(u)`:
///
/// - explicit fields advance by `u += dt · M⁻¹ r(u)`, so for diffusion
///   `∂u/∂t = ∇·(D∇u)` the terms are `f = 0`, `g = -D∇u`;
/// - implicit and time-independent fields drive `r(u)` to zero by Newton
///   iteration, solving `J Δu = r(u)` where [`lhs`](Self::lhs) returns the
///   integrand of `J Δu` (the negated derivative of `r` in direction `Δu`).
///   For Laplace's equation `r = -∫∇u·∇φ` and `J Δu = ∫∇Δu·∇φ`.
///
/// # Contract
///
/// - Evaluation MUST be deterministic: same inputs, identical outputs.
/// - `&self`: equations carry parameters, never per-step state.
/// - Only fields in [`reads`](Self::reads), the governed field, and
///   [`reads_previous`](Self::reads_previous) are evaluated.
///
/// # Examples
///
/// ```
/// use pfield_assembly::{Equation, QuadPoint, Terms};
/// use pfield_core::{FieldId, FieldSet};
///
/// /// du/dt = -k u
/// struct Decay {
///     field: FieldId,
///     k: f64,
/// }
///
/// impl Equation for Decay {
///     fn name(&self) -> &str { "decay" }
///     fn field(&self) -> FieldId { self.field }
///     fn reads(&self) -> FieldSet { FieldSet::empty() }
///     fn rhs(&self, q: &QuadPoint<'_>) -> Terms {
///         Terms::scalar(-self.k * q.scalar(self.field), [0.0; 3])
///     }
/// }
///
/// let eq = Decay { field: FieldId(0), k: 2.0 };
/// assert_eq!(eq.name(), "decay");
/// assert!(eq.max_dt().is_none());
/// ```
pub trait Equation: Send + Sync + 'static {
    /// Human-readable name for logging and error reporting.
    fn name(&self) -> &str;

    /// The field this equation governs.
    fn field(&self) -> FieldId;

    /// Other fields whose current values and gradients are read.
    ///
    /// Explicit equations see the pre-step snapshot of every field; solved
    /// equations see explicit fields already advanced this step.
    fn reads(&self) -> FieldSet;

    /// Fields read as they were at the start of the step.
    ///
    /// Default: empty set.
    fn reads_previous(&self) -> FieldSet {
        FieldSet::empty()
    }

    /// Integrand of the right-hand side at one quadrature point.
    fn rhs(&self, point: &QuadPoint<'_>) -> Terms;

    /// Integrand of the linearized operator applied to `change` (the value
    /// and gradient of the correction at this point).
    ///
    /// Only called for implicit and time-independent fields. Default: zero.
    fn lhs(&self, point: &QuadPoint<'_>, change: &PointValue) -> Terms {
        let _ = (point, change);
        Terms::zero()
    }

    /// Largest stable step for this equation, if it has one.
    ///
    /// Validation requires `dt <= min(max_dt)` across all equations.
    fn max_dt(&self) -> Option<f64> {
        None
    }
}
