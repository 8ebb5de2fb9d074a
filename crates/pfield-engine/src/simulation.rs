//! The orchestrator.
//!
//! [`Simulation`] owns the mesh, the field registry, the stepper, the
//! post-processors and the checkpoint manager, and drives them through a
//! fixed lifecycle:
//!
//! ```text
//! new ─► [set_equation]* ─► [set_bcs] ─► build_fields ─► init ─► [restore] ─► solve
//! ```
//!
//! Everything that can be checked from the parameters alone is checked
//! before any field storage is allocated.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pfield_assembly::{validate_equations, Equation, ResidualAssembler};
use pfield_checkpoint::{CheckpointManager, CheckpointRecord, FieldBlock};
use pfield_constraint::build_constraints;
use pfield_core::{FieldId, TimeState};
use pfield_equations::BuildContext;
use pfield_mesh::StructuredMesh;
use tracing::{info, info_span, warn};

use crate::config::SimulationConfig;
use crate::context::RunContext;
use crate::error::{ConfigError, RegistryError, SimulationError, StepError};
use crate::postprocess::{IntegratedFields, PostProcessor};
use crate::registry::FieldRegistry;
use crate::stepper::{FieldBoundary, TimeStepper};

/// A configured phase-field simulation.
pub struct Simulation {
    config: SimulationConfig,
    mesh: Arc<StructuredMesh>,
    registry: FieldRegistry,
    /// `equations[f]` governs field `f` until `build_fields` hands them to
    /// the stepper.
    equations: Vec<Option<Box<dyn Equation>>>,
    boundaries: Option<Vec<FieldBoundary>>,
    stepper: Option<TimeStepper>,
    postprocessors: Vec<Box<dyn PostProcessor>>,
    checkpoints: CheckpointManager,
    initialized: bool,
    /// The initial state still has to be post-processed; cleared by a
    /// restore.
    initial_output: bool,
}

impl Simulation {
    /// Build the mesh, declare every field, and construct the equations
    /// named in the parameters.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        let mesh = Arc::new(config.mesh.build()?);
        let mut registry = FieldRegistry::new();
        for field in &config.fields {
            registry.declare_field(&field.def.name, field.def.rank, field.def.pde_type)?;
        }

        let lookup = |name: &str| registry.field_id(name).ok();
        let mut equations = Vec::with_capacity(config.fields.len());
        for (i, field) in config.fields.iter().enumerate() {
            let equation = match &field.equation {
                Some(spec) => {
                    let ctx = BuildContext {
                        field: FieldId(i as u32),
                        name: &field.def.name,
                        pde_type: field.def.pde_type,
                        components: field.def.rank.components(mesh.dim()),
                        dim: mesh.dim(),
                        min_spacing: mesh.min_spacing(),
                        lookup: &lookup,
                    };
                    Some(spec.build(&ctx).map_err(ConfigError::from)?)
                }
                None => None,
            };
            equations.push(equation);
        }

        let checkpoints = CheckpointManager::new(
            config.output.directory.clone(),
            config.output.keep_checkpoints,
        );
        info!(
            dim = mesh.dim(),
            nodes = mesh.n_nodes(),
            partitions = mesh.partitions().len(),
            fields = registry.len(),
            "simulation configured"
        );
        Ok(Self {
            config,
            mesh,
            registry,
            equations,
            boundaries: None,
            stepper: None,
            postprocessors: Vec::new(),
            checkpoints,
            initialized: false,
            initial_output: false,
        })
    }

    /// Parsed parameters.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The mesh.
    pub fn mesh(&self) -> &Arc<StructuredMesh> {
        &self.mesh
    }

    /// The fields.
    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// The stepper, once built.
    pub fn stepper(&self) -> Option<&TimeStepper> {
        self.stepper.as_ref()
    }

    /// Checkpoint location and retention.
    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    /// Current time state; the configured initial state before
    /// `build_fields`.
    pub fn time(&self) -> TimeState {
        match &self.stepper {
            Some(stepper) => stepper.time(),
            None => TimeState::initial(self.config.time.dt),
        }
    }

    /// Current values of the field called `name`.
    pub fn values(&self, name: &str) -> Option<&[f64]> {
        let id = self.registry.field_id(name).ok()?;
        self.registry.get(id).map(|f| f.values())
    }

    /// Install or replace the governing equation of `name`.
    ///
    /// `equation.field()` must be the id of `name`. Only allowed before
    /// `build_fields`.
    pub fn set_equation(
        &mut self,
        name: &str,
        equation: Box<dyn Equation>,
    ) -> Result<(), SimulationError> {
        if self.registry.is_built() {
            return Err(RegistryError::AlreadyBuilt { name: name.into() }.into());
        }
        let id = self.registry.field_id(name)?;
        if equation.field() != id {
            return Err(ConfigError::invalid(
                format!("fields.{name}.equation"),
                format!("'{}' governs field {}, not {id}", equation.name(), equation.field()),
            )
            .into());
        }
        if let Some(slot) = self.equations.get_mut(id.index()) {
            *slot = Some(equation);
        }
        Ok(())
    }

    /// Add a post-processor, run on the `output.postprocess_every` cadence.
    pub fn add_postprocessor(&mut self, postprocessor: Box<dyn PostProcessor>) {
        self.postprocessors.push(postprocessor);
    }

    /// Resolve every field's boundary conditions into constraints and
    /// boundary fluxes.
    pub fn set_bcs(&mut self) -> Result<(), SimulationError> {
        let mut boundaries = Vec::with_capacity(self.config.fields.len());
        for field in &self.config.fields {
            let name = &field.def.name;
            let components = field.def.rank.components(self.mesh.dim());
            let constraint_error = |source| SimulationError::Constraint {
                field: name.clone(),
                source,
            };
            let bc = field
                .boundary_conditions
                .resolve(components, self.mesh.n_boundaries())
                .map_err(constraint_error)?;
            let constraints = build_constraints(&self.mesh, &bc).map_err(constraint_error)?;
            boundaries.push(FieldBoundary {
                constraints,
                neumann: bc.neumann_fluxes(),
            });
        }
        self.boundaries = Some(boundaries);
        Ok(())
    }

    /// Validate the equation set, allocate field storage and build the
    /// stepper.
    pub fn build_fields(&mut self) -> Result<(), SimulationError> {
        if self.registry.is_built() {
            return Err(RegistryError::AlreadyBuilt {
                name: String::from("<build>"),
            }
            .into());
        }
        let _span = info_span!("build_fields").entered();
        if self.boundaries.is_none() {
            self.set_bcs()?;
        }
        let defs = self.registry.defs();
        let installed: Vec<&Box<dyn Equation>> = self.equations.iter().flatten().collect();
        let plan = validate_equations(&installed, &defs, self.config.time.dt)
            .map_err(ConfigError::from)?;

        let quadrature = self.config.mesh.quadrature_points;
        let assembler =
            ResidualAssembler::new(self.mesh.clone(), quadrature).map_err(ConfigError::from)?;
        self.registry.build_fields(self.mesh.clone())?;
        let equations: Vec<Box<dyn Equation>> =
            self.equations.iter_mut().flat_map(Option::take).collect();

        if self.config.output.postprocess_every > 0 {
            let mass = assembler
                .lumped_mass(1)
                .map_err(|source| StepError::Assembly {
                    field: String::from("integrated_fields"),
                    source,
                })?;
            let integrated = IntegratedFields::new(&self.config.output.directory, mass);
            self.postprocessors.insert(0, Box::new(integrated));
        }

        let boundaries = self.boundaries.take().unwrap_or_default();
        self.stepper = Some(TimeStepper::new(
            assembler,
            equations,
            plan,
            &self.registry,
            boundaries,
            &self.config,
        )?);
        info!(
            explicit = self.registry.iter().filter(|(_, f)| !f.def().pde_type.is_solved()).count(),
            dofs = self.registry.iter().map(|(_, f)| f.values().len()).sum::<usize>(),
            "fields built"
        );
        Ok(())
    }

    /// Apply initial conditions and constraints and solve time-independent
    /// fields.
    ///
    /// The initial state is post-processed when `solve` starts, unless a
    /// checkpoint is restored first.
    pub fn init(&mut self, ctx: &RunContext) -> Result<(), SimulationError> {
        let Some(stepper) = self.stepper.as_mut() else {
            return Err(RegistryError::NotBuilt.into());
        };
        for (i, field) in self.config.fields.iter().enumerate() {
            if let Some(f) = self.registry.get_mut(FieldId(i as u32)) {
                let components = f.components();
                field
                    .initial_condition
                    .fill(&self.mesh, components, f.values_mut());
            }
        }
        stepper.apply_constraints(&mut self.registry);
        self.registry.save_previous();
        let registry = &mut self.registry;
        ctx.install(|| stepper.solve_time_independent(registry))?;
        self.initialized = true;
        self.initial_output = self.config.output.postprocess_every > 0;
        info!("initial conditions applied");
        Ok(())
    }

    /// Replace field values and time state with those of a checkpoint.
    ///
    /// Field names and sizes must match this simulation exactly.
    /// Post-processors resume their output at the checkpoint time.
    pub fn restore(&mut self, path: &Path) -> Result<(), SimulationError> {
        let record = self.checkpoints.restore(path)?;
        self.load(record)
    }

    /// Restore the newest checkpoint in the output directory.
    pub fn restore_latest(&mut self) -> Result<(), SimulationError> {
        let record = self.checkpoints.restore_latest()?;
        self.load(record)
    }

    fn load(&mut self, record: CheckpointRecord) -> Result<(), SimulationError> {
        let Some(stepper) = self.stepper.as_mut() else {
            return Err(RegistryError::NotBuilt.into());
        };
        record.check_layout(
            self.registry
                .iter()
                .map(|(_, f)| (f.def().name.as_str(), f.values().len())),
        )?;
        for (i, block) in record.fields.iter().enumerate() {
            if let Some(f) = self.registry.get_mut(FieldId(i as u32)) {
                f.values_mut().copy_from_slice(&block.values);
            }
        }
        self.registry.save_previous();
        stepper.set_time(record.time);
        self.initialized = true;
        self.initial_output = false;
        for pp in &mut self.postprocessors {
            pp.resume(&record.time)
                .map_err(|source| SimulationError::PostProcess {
                    name: pp.name().to_string(),
                    source,
                })?;
        }
        info!(step = %record.time.step, time = record.time.time, "resumed from checkpoint");
        Ok(())
    }

    /// Write a checkpoint of the current state.
    pub fn save_checkpoint(&self) -> Result<PathBuf, SimulationError> {
        let record = CheckpointRecord {
            time: self.time(),
            fields: self
                .registry
                .iter()
                .map(|(_, f)| FieldBlock {
                    name: f.def().name.clone(),
                    values: f.values().to_vec(),
                })
                .collect(),
        };
        Ok(self.checkpoints.save(&record)?)
    }

    fn checkpoint_or_warn(&self) {
        if let Err(e) = self.save_checkpoint() {
            warn!(step = %self.time().step, error = %e, "checkpoint not written");
        }
    }

    fn postprocess(&mut self) -> Result<(), SimulationError> {
        let time = self.time();
        for pp in &mut self.postprocessors {
            pp.process(&time, &self.registry)
                .map_err(|source| SimulationError::PostProcess {
                    name: pp.name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Step until the end time or step limit, a termination request, or
    /// an unrecoverable failure.
    ///
    /// Post-processing and checkpoints follow the `output` cadence. A
    /// checkpoint that cannot be written is logged and the run goes on.
    pub fn solve(&mut self, ctx: &RunContext) -> Result<TimeState, SimulationError> {
        if self.stepper.is_none() {
            return Err(RegistryError::NotBuilt.into());
        }
        if !self.initialized {
            self.init(ctx)?;
        }
        let output = self.config.output.clone();
        let span = info_span!("solve", threads = ctx.threads());
        let _guard = span.enter();
        info!(start = self.time().time, step = %self.time().step, "time loop started");
        if self.initial_output {
            self.initial_output = false;
            self.postprocess()?;
        }

        loop {
            let Some(stepper) = self.stepper.as_mut() else {
                break;
            };
            if stepper.is_finished() {
                break;
            }
            if ctx.termination_requested() {
                info!(step = %stepper.time().step, "termination requested");
                stepper.terminate();
                break;
            }
            let registry = &mut self.registry;
            let report = ctx.install(|| stepper.step(registry))?;
            let step = report.time.step.0;
            if output.postprocess_every > 0 && step % output.postprocess_every == 0 {
                self.postprocess()?;
            }
            if output.checkpoint_every > 0 && step % output.checkpoint_every == 0 {
                self.checkpoint_or_warn();
            }
        }

        if output.checkpoint_on_exit {
            self.checkpoint_or_warn();
        }
        if let Some(stepper) = self.stepper.as_mut() {
            stepper.terminate();
        }
        let time = self.time();
        info!(time = time.time, step = %time.step, dt = time.dt, "time loop finished");
        Ok(time)
    }
}
