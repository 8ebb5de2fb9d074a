//! Error types for mesh construction and queries.

use pfield_core::ErrorKind;
use thiserror::Error;

/// Errors arising from mesh construction or boundary queries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeshError {
    /// Dimension outside `1..=3`.
    #[error("mesh dimension must be 1, 2 or 3, got {dim}")]
    InvalidDimension {
        /// The requested dimension.
        dim: usize,
    },
    /// A per-axis parameter list has the wrong number of entries.
    #[error("{what} has {got} entries but the mesh is {expected}-dimensional")]
    AxisCountMismatch {
        /// Which parameter.
        what: &'static str,
        /// Mesh dimension.
        expected: usize,
        /// Entries provided.
        got: usize,
    },
    /// An axis was given zero subdivisions.
    #[error("axis {axis} must have at least one subdivision")]
    EmptyAxis {
        /// The offending axis.
        axis: usize,
    },
    /// An axis length is not finite and positive.
    #[error("axis {axis} length must be finite and positive, got {value}")]
    InvalidLength {
        /// The offending axis.
        axis: usize,
        /// The rejected length.
        value: f64,
    },
    /// Partition count is zero or exceeds the cell layers on the slab axis.
    #[error("cannot split {layers} cell layers into {requested} partitions")]
    InvalidPartitionCount {
        /// Requested partition count.
        requested: usize,
        /// Cell layers along the partitioned axis.
        layers: usize,
    },
    /// A boundary id outside `0..2 * dim`.
    #[error("boundary id {id} does not exist on a mesh with {count} boundaries")]
    UnknownBoundary {
        /// The offending id.
        id: u8,
        /// Number of boundaries on the mesh.
        count: usize,
    },
    /// Quadrature order with no tabulated rule.
    #[error("no Gauss-Legendre rule with {points} points per axis (supported: 1-4)")]
    UnsupportedQuadrature {
        /// Requested points per axis.
        points: usize,
    },
}

impl MeshError {
    /// Classification for the driver.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}
