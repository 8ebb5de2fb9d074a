//! Error types for assembly and linear solves.

use pfield_core::{ErrorKind, FieldId};
use pfield_mesh::MeshError;
use thiserror::Error;

/// Errors raised while integrating an equation or solving for a correction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssemblyError {
    /// A quadrature-point evaluation produced NaN or infinity.
    #[error("equation '{equation}' produced a non-finite value for field {field} in cell {cell}")]
    NonFinite {
        /// Equation name.
        equation: String,
        /// Field being assembled.
        field: FieldId,
        /// First offending cell.
        cell: usize,
    },
    /// A field the equation reads is absent from the context.
    #[error("equation '{equation}' reads field {field}, which is not available")]
    MissingField {
        /// Equation name.
        equation: String,
        /// The missing field.
        field: FieldId,
    },
    /// A DOF vector does not match the mesh.
    #[error("field {field} vector has {got} entries, mesh requires {expected}")]
    LengthMismatch {
        /// The field.
        field: FieldId,
        /// Required length.
        expected: usize,
        /// Provided length.
        got: usize,
    },
    /// Conjugate gradients met a non-positive or non-finite curvature.
    #[error("conjugate gradient breakdown at iteration {iteration} (curvature {curvature})")]
    Breakdown {
        /// Iteration of the breakdown.
        iteration: usize,
        /// The offending `pᵀAp`.
        curvature: f64,
    },
    /// Boundary lookup on the mesh failed.
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

impl AssemblyError {
    /// Classification for the stepper and driver.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NonFinite { .. } => ErrorKind::Numerical,
            Self::Breakdown { .. } => ErrorKind::Convergence,
            Self::MissingField { .. } => ErrorKind::Lookup,
            Self::LengthMismatch { .. } => ErrorKind::Resource,
            Self::Mesh(e) => e.kind(),
        }
    }
}
