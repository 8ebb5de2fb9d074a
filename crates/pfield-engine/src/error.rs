//! Engine error types and their aggregation into [`SimulationError`].

use std::io;
use std::path::PathBuf;

use pfield_assembly::{AssemblyError, PipelineError};
use pfield_checkpoint::CheckpointError;
use pfield_constraint::ConstraintError;
use pfield_core::ErrorKind;
use pfield_equations::EquationError;
use pfield_mesh::MeshError;
use thiserror::Error;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while loading and validating parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The parameter file could not be read.
    #[error("cannot read parameter file {}: {source}", path.display())]
    Read {
        /// The file.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// The parameter file is not valid JSON or has unexpected keys.
    #[error("cannot parse parameters: {0}")]
    Parse(#[from] serde_json::Error),

    /// A required key is absent.
    #[error("missing required parameter '{0}'")]
    MissingKey(String),

    /// A key is present but its value is unusable.
    #[error("invalid parameter '{key}': {reason}")]
    Invalid {
        /// Dotted path of the key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The mesh description is invalid.
    #[error("mesh: {0}")]
    Mesh(#[from] MeshError),

    /// A field's equation could not be built.
    #[error("equation: {0}")]
    Equation(#[from] EquationError),

    /// The equation set failed validation.
    #[error("pipeline: {0}")]
    Pipeline(#[from] PipelineError),
}

impl ConfigError {
    pub(crate) fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

// ── RegistryError ──────────────────────────────────────────────────

/// Errors from field declaration, allocation and lookup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// A field was declared after `build_fields`.
    #[error("cannot declare field '{name}' after fields are built")]
    AlreadyBuilt {
        /// The late field.
        name: String,
    },

    /// Two fields share a name.
    #[error("field '{name}' declared twice")]
    DuplicateField {
        /// The repeated name.
        name: String,
    },

    /// No field has this name.
    #[error("unknown field '{name}'")]
    UnknownField {
        /// The requested name.
        name: String,
    },

    /// Values were requested before `build_fields`.
    #[error("fields have not been built")]
    NotBuilt,

    /// Reserving a field's vectors failed.
    #[error("cannot allocate {bytes} bytes for field '{field}'")]
    Allocation {
        /// The field being built.
        field: String,
        /// Requested size.
        bytes: usize,
    },
}

impl RegistryError {
    /// Classification for the driver.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Allocation { .. } => ErrorKind::Resource,
            Self::UnknownField { .. } => ErrorKind::Lookup,
            _ => ErrorKind::Configuration,
        }
    }
}

// ── StepError ──────────────────────────────────────────────────────

/// Failure of one time step.
#[derive(Debug, Error)]
pub enum StepError {
    /// Assembly of a field failed.
    #[error("assembling '{field}': {source}")]
    Assembly {
        /// The field being assembled.
        field: String,
        /// Underlying error.
        source: AssemblyError,
    },

    /// An update produced a non-finite value.
    #[error("field '{field}' has a non-finite value at DOF {dof}")]
    NonFinite {
        /// The updated field.
        field: String,
        /// First offending DOF.
        dof: usize,
    },

    /// Newton iteration reached its cap.
    #[error("'{field}' did not converge in {iterations} iterations (residual {residual:e})")]
    NonConvergence {
        /// The solved field.
        field: String,
        /// Iterations performed.
        iterations: usize,
        /// Final residual norm.
        residual: f64,
    },

    /// Step-size reduction did not rescue the step.
    #[error("step {step} failed after {retries} retries: {last}")]
    RetriesExhausted {
        /// The step that failed.
        step: u64,
        /// Retries attempted.
        retries: u32,
        /// Failure of the final attempt.
        last: Box<StepError>,
    },
}

impl StepError {
    /// Classification for the retry policy and the driver.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Assembly { source, .. } => source.kind(),
            Self::NonFinite { .. } => ErrorKind::Numerical,
            Self::NonConvergence { .. } => ErrorKind::Convergence,
            Self::RetriesExhausted { last, .. } => last.kind(),
        }
    }
}

// ── SimulationError ────────────────────────────────────────────────

/// Any failure surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Parameters are missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Field registry failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Boundary conditions of a field are contradictory.
    #[error("boundary conditions of '{field}': {source}")]
    Constraint {
        /// The field.
        field: String,
        /// Underlying error.
        source: ConstraintError,
    },

    /// A time step failed unrecoverably.
    #[error(transparent)]
    Step(#[from] StepError),

    /// A requested restore failed.
    #[error("checkpoint: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// A post-processor could not write its output.
    #[error("post-processor '{name}': {source}")]
    PostProcess {
        /// The post-processor.
        name: String,
        /// Underlying error.
        source: io::Error,
    },

    /// The worker thread pool could not be created.
    #[error("cannot start thread pool: {0}")]
    ThreadPool(String),
}

impl SimulationError {
    /// Classification of the root cause.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(ConfigError::Read { .. }) => ErrorKind::Io,
            Self::Config(_) => ErrorKind::Configuration,
            Self::Registry(e) => e.kind(),
            Self::Constraint { source, .. } => source.kind(),
            Self::Step(e) => e.kind(),
            Self::Checkpoint(e) => e.kind(),
            Self::PostProcess { .. } => ErrorKind::Io,
            Self::ThreadPool(_) => ErrorKind::Resource,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pfield_core::FieldId;

    #[test]
    fn step_errors_classify_through_retries() {
        let nan = StepError::Assembly {
            field: "u".into(),
            source: AssemblyError::NonFinite {
                equation: "nan".into(),
                field: FieldId(0),
                cell: 3,
            },
        };
        assert_eq!(nan.kind(), ErrorKind::Numerical);
        let exhausted = StepError::RetriesExhausted {
            step: 1,
            retries: 4,
            last: Box::new(nan),
        };
        assert_eq!(exhausted.kind(), ErrorKind::Numerical);
        assert!(exhausted.to_string().contains("after 4 retries"));
    }

    #[test]
    fn simulation_error_kinds() {
        let e = SimulationError::from(ConfigError::MissingKey("mesh.lengths".into()));
        assert_eq!(e.kind(), ErrorKind::Configuration);
        assert_eq!(e.to_string(), "missing required parameter 'mesh.lengths'");
        let e = SimulationError::from(RegistryError::Allocation {
            field: "u".into(),
            bytes: usize::MAX,
        });
        assert_eq!(e.kind(), ErrorKind::Resource);
    }
}
