//! Error types for boundary-condition parsing and constraint building.

use pfield_core::ErrorKind;
use pfield_mesh::{BoundaryId, MeshError};
use thiserror::Error;

/// Errors from BC specifications and constraint sets.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstraintError {
    /// A BC string could not be parsed.
    #[error("cannot parse boundary condition '{input}': {reason}")]
    Parse {
        /// The rejected text.
        input: String,
        /// What was wrong with it.
        reason: String,
    },
    /// A BC list has the wrong length for the field or mesh.
    #[error("{what}: expected {expected} entries, got {got}")]
    EntryCount {
        /// Which list.
        what: &'static str,
        /// Required length.
        expected: usize,
        /// Provided length.
        got: usize,
    },
    /// Only one face of an axis is periodic.
    #[error("component {component}: periodic condition on axis {axis} must be set on both faces")]
    PeriodicMismatch {
        /// Field component.
        component: usize,
        /// The unpaired axis.
        axis: usize,
    },
    /// A Dirichlet value opposite a periodic face.
    #[error("component {component}: Dirichlet condition on {boundary} conflicts with the periodic opposite face")]
    DirichletOnPeriodic {
        /// Field component.
        component: usize,
        /// The Dirichlet face.
        boundary: BoundaryId,
    },
    /// Two boundaries prescribe different values at a shared node.
    #[error("DOF {dof} has contradictory Dirichlet values {first} and {second}")]
    ConflictingDirichlet {
        /// The shared DOF.
        dof: usize,
        /// Value set first.
        first: f64,
        /// Value set second.
        second: f64,
    },
    /// A general affine constraint targets an already constrained DOF.
    #[error("DOF {dof} is already constrained")]
    DuplicateConstraint {
        /// The DOF.
        dof: usize,
    },
    /// A DOF index past the end of the vector.
    #[error("DOF {dof} out of range for {n_dofs} DOFs")]
    DofOutOfRange {
        /// The DOF.
        dof: usize,
        /// Vector length.
        n_dofs: usize,
    },
    /// Constraint chains loop back on themselves.
    #[error("constraint chain through DOF {dof} is cyclic")]
    Cycle {
        /// A DOF on the cycle.
        dof: usize,
    },
    /// Boundary lookup on the mesh failed.
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

impl ConstraintError {
    /// Classification for the driver.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Mesh(e) => e.kind(),
            Self::Parse { .. } | Self::EntryCount { .. } => ErrorKind::Configuration,
            _ => ErrorKind::InvalidBc,
        }
    }
}
