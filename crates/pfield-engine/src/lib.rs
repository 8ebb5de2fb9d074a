//! Field registry, time stepper and orchestrator for pfield.
//!
//! A run is driven through [`Simulation`]:
//!
//! ```no_run
//! use pfield_engine::{RunContext, Simulation, SimulationConfig};
//!
//! # fn main() -> Result<(), pfield_engine::SimulationError> {
//! let config = SimulationConfig::from_path("parameters.json".as_ref())?;
//! let ctx = RunContext::new(config.threads)?;
//! let mut sim = Simulation::new(config)?;
//! sim.build_fields()?;
//! sim.init(&ctx)?;
//! let end = sim.solve(&ctx)?;
//! println!("reached t = {} after {} steps", end.time, end.step);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod context;
pub mod error;
pub mod initial;
pub mod metrics;
pub mod postprocess;
pub mod registry;
pub mod simulation;
pub mod stepper;

pub use config::{
    FailurePolicy, FieldConfig, MeshConfig, OutputConfig, SimulationConfig, SolverConfig,
    TimeConfig,
};
pub use context::RunContext;
pub use error::{ConfigError, RegistryError, SimulationError, StepError};
pub use initial::InitialCondition;
pub use metrics::StepMetrics;
pub use postprocess::{IntegratedFields, PostProcessor};
pub use registry::{Field, FieldRegistry};
pub use simulation::Simulation;
pub use stepper::{FieldBoundary, SolverState, StepReport, StepperState, TimeStepper};
