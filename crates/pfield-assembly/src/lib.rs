//! Governing equations and matrix-free assembly for pfield.
//!
//! Each field is advanced by one [`Equation`], a stateless pointwise weak
//! form. The [`ResidualAssembler`] integrates it over the mesh cell by cell
//! without ever forming a matrix: the right-hand side
//!
//! ```text
//! r_i = ∫ f·φ_i + g:∇φ_i dx + ∫_Γ h·φ_i ds
//! ```
//!
//! from [`Equation::rhs`], and the action of the linearized operator on a
//! change vector from [`Equation::lhs`]. Explicit fields use `r` directly
//! as their update; implicit and time-independent fields solve
//! `LHS(Δu) = r` with [`conjugate_gradient`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod assembler;
pub mod context;
pub mod equation;
pub mod error;
pub mod pipeline;
pub mod point;
pub mod reduce;
pub mod solver;

pub use assembler::ResidualAssembler;
pub use context::AssemblyContext;
pub use equation::Equation;
pub use error::AssemblyError;
pub use pipeline::{validate_equations, EquationPlan, PipelineError};
pub use point::{PointValue, QuadPoint, Terms};
pub use solver::{conjugate_gradient, LinearSolveReport, LinearSolverConfig};
