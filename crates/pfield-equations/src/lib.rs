//! Reference governing equations for the pfield engine.
//!
//! Each model implements [`Equation`](pfield_assembly::Equation) for one
//! field. [`EquationSpec`] is the serde form used by parameter files and
//! builds the boxed equation once field ids are known.
//!
//! | Model | PDE type | Strong form |
//! |-------|----------|-------------|
//! | [`Frozen`] | explicit | `∂u/∂t = 0` |
//! | [`Diffusion`] | explicit | `∂u/∂t = ∇·(D∇u)` |
//! | [`ImplicitDiffusion`] | implicit | `∂u/∂t = ∇·(D∇u)`, backward Euler |
//! | [`Poisson`] | time-independent | `-∇·(k∇u) = s` |
//! | [`AllenCahn`] | explicit | `∂η/∂t = -M(f'(η) - κΔη)` |
//! | [`CahnHilliard`] | explicit | `∂c/∂t = ∇·(M∇μ)` |
//! | [`ChemicalPotential`] | time-independent | `μ = f'(c) - κΔc` |
//!
//! The double-well `f(x) = W x²(1-x)²` is the only free energy provided.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod allen_cahn;
pub mod cahn_hilliard;
pub mod diffusion;
pub mod error;
pub mod frozen;
pub mod poisson;
pub mod spec;

pub use allen_cahn::AllenCahn;
pub use cahn_hilliard::{CahnHilliard, ChemicalPotential};
pub use diffusion::{Diffusion, ImplicitDiffusion};
pub use error::EquationError;
pub use frozen::Frozen;
pub use poisson::Poisson;
pub use spec::{BuildContext, EquationSpec};

/// Derivative of the double well `W x²(1-x)²`.
pub fn double_well_derivative(barrier: f64, x: f64) -> f64 {
    2.0 * barrier * x * (1.0 - x) * (1.0 - 2.0 * x)
}

fn check_positive(
    model: &'static str,
    parameter: &'static str,
    value: f64,
) -> Result<f64, EquationError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(EquationError::InvalidParameter {
            model,
            parameter,
            value,
        })
    }
}

fn check_finite(
    model: &'static str,
    parameter: &'static str,
    value: f64,
) -> Result<f64, EquationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EquationError::InvalidParameter {
            model,
            parameter,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn double_well_has_three_stationary_points() {
        for x in [0.0, 0.5, 1.0] {
            assert_eq!(double_well_derivative(1.0, x), 0.0);
        }
        assert!(double_well_derivative(1.0, 0.25) > 0.0);
        assert!(double_well_derivative(1.0, 0.75) < 0.0);
    }

    proptest! {
        #[test]
        fn double_well_derivative_is_antisymmetric(x in -1.0f64..2.0, w in 0.01f64..10.0) {
            let sum = double_well_derivative(w, x) + double_well_derivative(w, 1.0 - x);
            prop_assert!(sum.abs() <= 1e-9 * w.max(1.0) * (1.0 + x.abs()).powi(3));
        }
    }
}
