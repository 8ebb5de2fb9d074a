//! Quadrature-point values and the weak-form terms equations return.

use pfield_core::FieldId;
use pfield_mesh::MAX_DIM;

/// Value and gradient of one field at one quadrature point.
///
/// Scalars use component 0. `gradient[c][d]` is `∂u_c/∂x_d`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointValue {
    /// Component values.
    pub value: [f64; MAX_DIM],
    /// Component gradients.
    pub gradient: [[f64; MAX_DIM]; MAX_DIM],
}

impl PointValue {
    /// All zeros.
    pub const ZERO: Self = Self {
        value: [0.0; MAX_DIM],
        gradient: [[0.0; MAX_DIM]; MAX_DIM],
    };

    /// Scalar value (component 0).
    pub fn scalar(&self) -> f64 {
        self.value[0]
    }

    /// Scalar gradient (component 0).
    pub fn scalar_gradient(&self) -> [f64; MAX_DIM] {
        self.gradient[0]
    }
}

/// Pointwise coefficients of the weak form, tested against `φ` and `∇φ`.
///
/// For a scalar field only component 0 is read.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Terms {
    /// Multiplies the test function, per component.
    pub value: [f64; MAX_DIM],
    /// Multiplies the test-function gradient, per component.
    pub gradient: [[f64; MAX_DIM]; MAX_DIM],
}

impl Terms {
    /// No contribution.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Scalar terms `f·φ + g·∇φ`.
    pub fn scalar(value: f64, gradient: [f64; MAX_DIM]) -> Self {
        let mut t = Self::zero();
        t.value[0] = value;
        t.gradient[0] = gradient;
        t
    }

    /// Returns `true` if every entry is finite.
    pub fn is_finite(&self) -> bool {
        self.value.iter().all(|v| v.is_finite())
            && self.gradient.iter().flatten().all(|v| v.is_finite())
    }
}

/// Everything an equation may read at one quadrature point.
///
/// Fields outside the equation's declared [`reads`](crate::Equation::reads)
/// (plus the field it governs) and
/// [`reads_previous`](crate::Equation::reads_previous) are not evaluated
/// and read as zero.
#[derive(Clone, Copy, Debug)]
pub struct QuadPoint<'a> {
    pub(crate) position: [f64; MAX_DIM],
    pub(crate) dim: usize,
    pub(crate) time: f64,
    pub(crate) dt: f64,
    pub(crate) current: &'a [PointValue],
    pub(crate) previous: &'a [PointValue],
}

impl<'a> QuadPoint<'a> {
    /// Construct a point view directly, for testing equations in isolation.
    pub fn new(
        position: [f64; MAX_DIM],
        dim: usize,
        time: f64,
        dt: f64,
        current: &'a [PointValue],
        previous: &'a [PointValue],
    ) -> Self {
        Self {
            position,
            dim,
            time,
            dt,
            current,
            previous,
        }
    }

    /// Physical coordinates.
    pub fn position(&self) -> [f64; MAX_DIM] {
        self.position
    }

    /// Spatial dimension of the mesh.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Simulation time at the start of the step being assembled.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Step size of the step being assembled.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Current value and gradient of `field`.
    pub fn field(&self, field: FieldId) -> &'a PointValue {
        self.current.get(field.index()).unwrap_or(&PointValue::ZERO)
    }

    /// Value and gradient of `field` at the start of the step.
    pub fn previous(&self, field: FieldId) -> &'a PointValue {
        self.previous.get(field.index()).unwrap_or(&PointValue::ZERO)
    }

    /// Current scalar value of `field`.
    pub fn scalar(&self, field: FieldId) -> f64 {
        self.field(field).scalar()
    }

    /// Current scalar gradient of `field`.
    pub fn gradient(&self, field: FieldId) -> [f64; MAX_DIM] {
        self.field(field).scalar_gradient()
    }

    /// Current vector value of `field`.
    pub fn vector(&self, field: FieldId) -> [f64; MAX_DIM] {
        self.field(field).value
    }

    /// Scalar value of `field` at the start of the step.
    pub fn previous_scalar(&self, field: FieldId) -> f64 {
        self.previous(field).scalar()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unevaluated_fields_read_zero() {
        let mut values = [PointValue::ZERO; 2];
        values[1].value[0] = 3.0;
        values[1].gradient[0] = [1.0, 2.0, 0.0];
        let q = QuadPoint::new([0.5; 3], 2, 0.0, 0.1, &values, &[]);
        assert_eq!(q.scalar(FieldId(1)), 3.0);
        assert_eq!(q.gradient(FieldId(1)), [1.0, 2.0, 0.0]);
        assert_eq!(q.scalar(FieldId(7)), 0.0);
        assert_eq!(q.previous_scalar(FieldId(1)), 0.0);
    }

    #[test]
    fn nan_terms_are_detected() {
        assert!(Terms::scalar(1.0, [0.0; 3]).is_finite());
        let mut t = Terms::zero();
        t.gradient[2][1] = f64::NAN;
        assert!(!t.is_finite());
    }
}
