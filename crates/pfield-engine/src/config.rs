//! Run parameters: the raw parameter file and its validated form.
//!
//! [`ParameterFile`] mirrors the JSON document key for key, with every
//! required key optional so absence can be reported by name.
//! [`ParameterFile::validate`] checks it in a fixed order and produces the
//! immutable [`SimulationConfig`] the rest of the engine reads.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use pfield_assembly::LinearSolverConfig;
use pfield_constraint::{BcSpec, BoundaryCondition};
use pfield_core::{FieldDef, FieldRank, PdeType};
use pfield_equations::EquationSpec;
use pfield_mesh::{StructuredMesh, MAX_DIM};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::initial::InitialCondition;

// ── Raw sections ───────────────────────────────────────────────────

/// The parameter file as written.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterFile {
    /// Domain and discretization.
    pub mesh: Option<MeshSection>,
    /// Step size and stopping criteria.
    pub time: Option<TimeSection>,
    /// Fields in declaration order.
    pub fields: Option<Vec<FieldSection>>,
    /// Nonlinear and linear solver controls.
    #[serde(default)]
    pub solver: SolverConfig,
    /// What to do when a step fails.
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Output and checkpoint cadence.
    #[serde(default)]
    pub output: OutputConfig,
    /// Worker threads; all available cores if absent.
    pub threads: Option<usize>,
}

/// `mesh` section.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeshSection {
    /// Domain extent per axis; its length sets the dimension.
    pub lengths: Option<Vec<f64>>,
    /// Cells per axis.
    pub subdivisions: Option<Vec<usize>>,
    /// Partitions along the last axis. Default: 1.
    pub partitions: Option<usize>,
    /// Gauss points per axis. Default: 2.
    pub quadrature_points: Option<usize>,
}

/// `time` section.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeSection {
    /// Initial step size.
    pub dt: Option<f64>,
    /// Stop once this time is reached.
    pub end_time: Option<f64>,
    /// Stop after this many steps.
    pub max_steps: Option<u64>,
}

/// One entry of `fields`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSection {
    /// Unique field name.
    pub name: Option<String>,
    /// `SCALAR` or `VECTOR`.
    pub rank: Option<String>,
    /// `EXPLICIT_TIME_DEPENDENT`, `IMPLICIT_TIME_DEPENDENT` or
    /// `TIME_INDEPENDENT`.
    pub pde_type: Option<String>,
    /// Governing equation; may instead be supplied programmatically.
    pub equation: Option<EquationSpec>,
    /// Initial value. Default: constant zero.
    #[serde(default)]
    pub initial_condition: InitialCondition,
    /// Boundary conditions. Default: zero derivative everywhere.
    pub boundary_conditions: Option<BcSpec>,
}

// ── Validated configuration ────────────────────────────────────────

/// Solver controls for implicit and time-independent fields.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// Newton stops once the residual norm falls below this. Default: 1e-8.
    pub nonlinear_tolerance: f64,
    /// Newton iteration cap. Default: 20.
    pub max_nonlinear_iterations: usize,
    /// CG stops at this residual relative to its right-hand side.
    /// Default: 1e-10.
    pub linear_tolerance: f64,
    /// CG iteration cap. Default: 1000.
    pub max_linear_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        let linear = LinearSolverConfig::default();
        Self {
            nonlinear_tolerance: 1e-8,
            max_nonlinear_iterations: 20,
            linear_tolerance: linear.tolerance,
            max_linear_iterations: linear.max_iterations,
        }
    }
}

impl SolverConfig {
    /// The CG settings.
    pub fn linear(&self) -> LinearSolverConfig {
        LinearSolverConfig {
            max_iterations: self.max_linear_iterations,
            tolerance: self.linear_tolerance,
        }
    }
}

/// Response to a failed step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Any failure ends the run.
    Abort,
    /// Multiply `dt` by `factor` and retry from the start of the step, up
    /// to `max_retries` times. The reduced `dt` is kept afterwards.
    HalveAndRetry {
        /// Retry limit. Default: 4.
        #[serde(default = "default_retries")]
        max_retries: u32,
        /// Step-size reduction factor in `(0, 1)`. Default: 0.5.
        #[serde(default = "default_factor")]
        factor: f64,
    },
}

fn default_retries() -> u32 {
    4
}

fn default_factor() -> f64 {
    0.5
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self::HalveAndRetry {
            max_retries: default_retries(),
            factor: default_factor(),
        }
    }
}

impl FailurePolicy {
    /// Retries allowed per step.
    pub fn max_retries(&self) -> u32 {
        match self {
            Self::Abort => 0,
            Self::HalveAndRetry { max_retries, .. } => *max_retries,
        }
    }
}

/// Output and checkpoint cadence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory for checkpoints and post-processing output. Default: `.`.
    pub directory: PathBuf,
    /// Run post-processors every this many steps; 0 disables. Default: 0.
    pub postprocess_every: u64,
    /// Save a checkpoint every this many steps; 0 disables. Default: 0.
    pub checkpoint_every: u64,
    /// Checkpoints retained on disk; 0 keeps all. Default: 2.
    pub keep_checkpoints: usize,
    /// Save a final checkpoint when the run ends. Default: true.
    pub checkpoint_on_exit: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            postprocess_every: 0,
            checkpoint_every: 0,
            keep_checkpoints: 2,
            checkpoint_on_exit: true,
        }
    }
}

/// Validated mesh parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshConfig {
    /// Domain extent per axis.
    pub lengths: Vec<f64>,
    /// Cells per axis.
    pub subdivisions: Vec<usize>,
    /// Partitions along the last axis.
    pub partitions: usize,
    /// Gauss points per axis.
    pub quadrature_points: usize,
}

impl MeshConfig {
    /// Spatial dimension.
    pub fn dim(&self) -> usize {
        self.lengths.len()
    }

    /// Construct the mesh.
    pub fn build(&self) -> Result<StructuredMesh, ConfigError> {
        Ok(StructuredMesh::new(
            &self.lengths,
            &self.subdivisions,
            self.partitions,
        )?)
    }
}

/// Validated time controls. At least one stopping criterion is set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeConfig {
    /// Initial step size.
    pub dt: f64,
    /// Stop at this time.
    pub end_time: Option<f64>,
    /// Stop after this many steps.
    pub max_steps: Option<u64>,
}

/// Validated field declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldConfig {
    /// Name, rank and PDE type.
    pub def: FieldDef,
    /// Equation from the parameter file, if given.
    pub equation: Option<EquationSpec>,
    /// Initial value.
    pub initial_condition: InitialCondition,
    /// Boundary conditions.
    pub boundary_conditions: BcSpec,
}

/// Immutable, validated run configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Mesh parameters.
    pub mesh: MeshConfig,
    /// Step size and stopping criteria.
    pub time: TimeConfig,
    /// Fields in declaration order.
    pub fields: Vec<FieldConfig>,
    /// Solver controls.
    pub solver: SolverConfig,
    /// Failure handling.
    pub failure_policy: FailurePolicy,
    /// Output cadence.
    pub output: OutputConfig,
    /// Worker threads.
    pub threads: Option<usize>,
}

impl SimulationConfig {
    /// Load and validate a parameter file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate parameters from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str::<ParameterFile>(text)?.validate()
    }

    /// Field definitions in declaration order.
    pub fn field_defs(&self) -> Vec<FieldDef> {
        self.fields.iter().map(|f| f.def.clone()).collect()
    }
}

// ── Validation ─────────────────────────────────────────────────────

fn require<T>(value: Option<T>, key: &str) -> Result<T, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingKey(key.to_string()))
}

fn positive(value: f64, key: &str) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::invalid(
            key,
            format!("must be finite and positive, got {value}"),
        ))
    }
}

impl ParameterFile {
    /// Validate every section.
    ///
    /// Checks, in order: mesh, time, fields, solver, failure policy,
    /// threads. The first problem found is returned.
    pub fn validate(self) -> Result<SimulationConfig, ConfigError> {
        // 1. Mesh.
        let mesh = require(self.mesh, "mesh")?;
        let lengths = require(mesh.lengths, "mesh.lengths")?;
        let subdivisions = require(mesh.subdivisions, "mesh.subdivisions")?;
        if lengths.is_empty() || lengths.len() > MAX_DIM {
            return Err(ConfigError::invalid(
                "mesh.lengths",
                format!("needs 1 to {MAX_DIM} entries, got {}", lengths.len()),
            ));
        }
        if subdivisions.len() != lengths.len() {
            return Err(ConfigError::invalid(
                "mesh.subdivisions",
                format!(
                    "has {} entries but mesh.lengths has {}",
                    subdivisions.len(),
                    lengths.len()
                ),
            ));
        }
        let quadrature_points = mesh.quadrature_points.unwrap_or(2);
        if !(1..=4).contains(&quadrature_points) {
            return Err(ConfigError::invalid(
                "mesh.quadrature_points",
                format!("must be between 1 and 4, got {quadrature_points}"),
            ));
        }
        let mesh = MeshConfig {
            lengths,
            subdivisions,
            partitions: mesh.partitions.unwrap_or(1),
            quadrature_points,
        };
        let dim = mesh.dim();

        // 2. Time.
        let time = require(self.time, "time")?;
        let dt = positive(require(time.dt, "time.dt")?, "time.dt")?;
        if time.end_time.is_none() && time.max_steps.is_none() {
            return Err(ConfigError::MissingKey(
                "time.end_time or time.max_steps".into(),
            ));
        }
        if let Some(end) = time.end_time {
            positive(end, "time.end_time")?;
        }
        let time = TimeConfig {
            dt,
            end_time: time.end_time,
            max_steps: time.max_steps,
        };

        // 3. Fields.
        let sections = require(self.fields, "fields")?;
        if sections.is_empty() {
            return Err(ConfigError::invalid("fields", "at least one field is required"));
        }
        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(sections.len());
        for (i, section) in sections.into_iter().enumerate() {
            let key = |k: &str| format!("fields[{i}].{k}");
            let name = require(section.name, &key("name"))?;
            if name.trim().is_empty() {
                return Err(ConfigError::invalid(key("name"), "must not be empty"));
            }
            if !seen.insert(name.clone()) {
                return Err(ConfigError::invalid(
                    key("name"),
                    format!("'{name}' is declared twice"),
                ));
            }
            let rank: FieldRank = require(section.rank, &key("rank"))?
                .parse()
                .map_err(|reason| ConfigError::invalid(key("rank"), reason))?;
            let pde_type: PdeType = require(section.pde_type, &key("pde_type"))?
                .parse()
                .map_err(|reason| ConfigError::invalid(key("pde_type"), reason))?;
            section
                .initial_condition
                .validate(&key("initial_condition"), dim)?;
            fields.push(FieldConfig {
                def: FieldDef::new(name, rank, pde_type),
                equation: section.equation,
                initial_condition: section.initial_condition,
                boundary_conditions: section
                    .boundary_conditions
                    .unwrap_or(BcSpec::Uniform(BoundaryCondition::ZeroDerivative)),
            });
        }

        // 4. Solver.
        let solver = self.solver;
        positive(solver.nonlinear_tolerance, "solver.nonlinear_tolerance")?;
        positive(solver.linear_tolerance, "solver.linear_tolerance")?;
        if solver.max_nonlinear_iterations == 0 {
            return Err(ConfigError::invalid(
                "solver.max_nonlinear_iterations",
                "must be at least 1",
            ));
        }
        if solver.max_linear_iterations == 0 {
            return Err(ConfigError::invalid(
                "solver.max_linear_iterations",
                "must be at least 1",
            ));
        }

        // 5. Failure policy.
        if let FailurePolicy::HalveAndRetry { factor, .. } = self.failure_policy {
            if !(factor > 0.0 && factor < 1.0) {
                return Err(ConfigError::invalid(
                    "failure_policy.factor",
                    format!("must lie in (0, 1), got {factor}"),
                ));
            }
        }

        // 6. Threads.
        if self.threads == Some(0) {
            return Err(ConfigError::invalid("threads", "must be at least 1"));
        }

        Ok(SimulationConfig {
            mesh,
            time,
            fields,
            solver,
            failure_policy: self.failure_policy,
            output: self.output,
            threads: self.threads,
        })
    }
}
