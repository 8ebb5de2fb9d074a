//! pfield: a matrix-free finite-element engine for coupled phase-field
//! equations.
//!
//! This facade re-exports the sub-crates. Most programs only need the
//! [`prelude`] and a parameter file.
//!
//! # Quick start
//!
//! ```rust
//! use pfield::prelude::*;
//!
//! let params = r#"{
//!     "mesh": { "lengths": [1.0], "subdivisions": [16] },
//!     "time": { "dt": 0.001, "max_steps": 5 },
//!     "fields": [{
//!         "name": "u",
//!         "rank": "SCALAR",
//!         "pde_type": "EXPLICIT_TIME_DEPENDENT",
//!         "equation": { "model": "diffusion", "coefficient": 1.0 },
//!         "initial_condition": { "type": "ramp", "axis": 0, "from": 0.0, "to": 1.0 },
//!         "boundary_conditions": ["DIRICHLET: 0", "DIRICHLET: 1"]
//!     }],
//!     "output": { "checkpoint_on_exit": false }
//! }"#;
//! let ctx = RunContext::new(Some(1)).unwrap();
//! let mut sim = Simulation::new(SimulationConfig::from_json(params).unwrap()).unwrap();
//! sim.build_fields().unwrap();
//! sim.init(&ctx).unwrap();
//! let end = sim.solve(&ctx).unwrap();
//! assert_eq!(end.step, StepIndex(5));
//! // A linear profile is already steady.
//! let u = sim.values("u").unwrap();
//! assert!((u[8] - 0.5).abs() < 1e-12);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `pfield-core` | IDs, field definitions, time state, error kinds |
//! | [`mesh`] | `pfield-mesh` | Structured mesh, partitions, quadrature |
//! | [`constraint`] | `pfield-constraint` | Boundary conditions and affine constraints |
//! | [`assembly`] | `pfield-assembly` | `Equation` trait, assembler, CG |
//! | [`equations`] | `pfield-equations` | Reference models |
//! | [`checkpoint`] | `pfield-checkpoint` | Binary checkpoints |
//! | [`engine`] | `pfield-engine` | Registry, stepper, orchestrator |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and traits (`pfield-core`).
pub use pfield_core as types;

/// Structured meshes (`pfield-mesh`).
pub use pfield_mesh as mesh;

/// Boundary conditions and constraints (`pfield-constraint`).
pub use pfield_constraint as constraint;

/// Equations, assembly and linear solves (`pfield-assembly`).
///
/// Implement [`assembly::Equation`] to add a model.
pub use pfield_assembly as assembly;

/// Reference equations (`pfield-equations`).
pub use pfield_equations as equations;

/// Checkpoint/restart (`pfield-checkpoint`).
pub use pfield_checkpoint as checkpoint;

/// Registry, stepper and orchestrator (`pfield-engine`).
pub use pfield_engine as engine;

/// Common imports.
///
/// ```rust
/// use pfield::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use pfield_core::{
        ErrorKind, FieldDef, FieldId, FieldRank, FieldReader, FieldSet, PdeType, StepIndex,
        TimeState,
    };

    // Equations
    pub use pfield_assembly::{Equation, PointValue, QuadPoint, Terms};
    pub use pfield_equations::EquationSpec;

    // Boundary conditions
    pub use pfield_constraint::{BcSpec, BoundaryCondition};

    // Engine
    pub use pfield_engine::{
        FailurePolicy, InitialCondition, PostProcessor, RunContext, Simulation,
        SimulationConfig, SimulationError, StepMetrics,
    };
}
