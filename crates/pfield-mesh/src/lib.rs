//! Mesh and finite-element collaborator for pfield.
//!
//! Provides a uniform hypercube mesh in one to three dimensions with
//! trilinear (Q1) elements, Gauss–Legendre tensor quadrature, precomputed
//! cell and face values, and slab partitioning for data-parallel assembly.
//!
//! # DOF numbering
//!
//! Node `(ix, iy, iz)` has index `ix + nx * (iy + ny * iz)`. A field with
//! `k` components stores component `c` of node `n` at `n * k + c`.
//!
//! # Boundary ids
//!
//! Boundary `2 * axis` is the low face of that axis and `2 * axis + 1` the
//! high face: 0 = x-min, 1 = x-max, 2 = y-min, 3 = y-max, 4 = z-min,
//! 5 = z-max.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod boundary;
pub mod element;
pub mod error;
pub mod mesh;
pub mod partition;
pub mod quadrature;

pub use boundary::BoundaryId;
pub use element::{CellValues, FaceValues};
pub use error::MeshError;
pub use mesh::{StructuredMesh, MAX_DIM};
pub use partition::Partition;
pub use quadrature::TensorQuadrature;
