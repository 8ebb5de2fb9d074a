//! Boundary conditions and affine constraints on DOF vectors.
//!
//! A [`ConstraintSet`] maps each constrained DOF to an affine relation
//! `u[s] = b + Σ w·u[m]` over unconstrained masters. Dirichlet values,
//! periodic identification and hanging-node style relations all take this
//! form. [`build_constraints`] derives a field's set from its declarative
//! [`FieldBc`]; Neumann data is not a constraint and is reported
//! separately through [`FieldBc::neumann_fluxes`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bc;
pub mod build;
pub mod error;
pub mod set;

pub use bc::{BcSpec, BoundaryCondition, FieldBc, NeumannFlux};
pub use build::build_constraints;
pub use error::ConstraintError;
pub use set::{AffineConstraint, ConstraintSet};
