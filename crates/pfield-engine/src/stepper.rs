//! Time stepper: advances every field by one step.
//!
//! A step runs in two phases:
//!
//! 1. **Explicit.** Every explicit field's right-hand side is assembled
//!    against the start-of-step values, then all explicit fields are
//!    updated with `u += dt · M_L⁻¹ r(u)` using the lumped mass. Explicit
//!    fields never see each other's new values within a step.
//! 2. **Solved.** Implicit and time-independent fields are solved in
//!    declaration order by Newton iteration, each linear correction by
//!    conjugate gradients. Solved fields see explicit fields already
//!    advanced and solved fields earlier in the order.
//!
//! A failed attempt rolls every field back to the start of the step. The
//! [`FailurePolicy`] decides whether to retry with a smaller `dt`.

use std::time::Instant;

use pfield_assembly::{
    conjugate_gradient, reduce, AssemblyContext, AssemblyError, Equation, EquationPlan,
    LinearSolveReport, PipelineError, ResidualAssembler,
};
use pfield_constraint::{ConstraintSet, NeumannFlux};
use pfield_core::{FieldId, PdeType, TimeState};
use tracing::{debug, debug_span, trace, warn};

use crate::config::{FailurePolicy, SimulationConfig, SolverConfig};
use crate::error::{ConfigError, SimulationError, StepError};
use crate::metrics::StepMetrics;
use crate::registry::FieldRegistry;

// ── Boundary data ──────────────────────────────────────────────────

/// Constraints and boundary fluxes of one field.
#[derive(Clone, Debug, Default)]
pub struct FieldBoundary {
    /// Dirichlet and periodic constraints.
    pub constraints: ConstraintSet,
    /// Non-zero Neumann fluxes.
    pub neumann: Vec<NeumannFlux>,
}

// ── State ──────────────────────────────────────────────────────────

/// Lifecycle of the stepper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepperState {
    /// Built, no step taken yet.
    Initialized,
    /// A step is in progress.
    Stepping,
    /// The last step was accepted.
    ConvergedStep,
    /// The last step failed and the run cannot continue.
    StepFailed,
    /// The run has ended.
    Terminated,
}

/// Outcome of the last Newton solve of one field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SolverState {
    /// Newton iterations performed.
    pub iterations: usize,
    /// Residual norm before each iteration, and after the last.
    pub residual_history: Vec<f64>,
    /// Whether the tolerance was reached.
    pub converged: bool,
}

/// Result of one accepted step.
#[derive(Clone, Debug, PartialEq)]
pub struct StepReport {
    /// Time state after the step.
    pub time: TimeState,
    /// Size of the step taken.
    pub taken: f64,
    /// Timing and solver effort.
    pub metrics: StepMetrics,
}

// ── TimeStepper ────────────────────────────────────────────────────

/// Advances the fields of a [`FieldRegistry`] through time.
pub struct TimeStepper {
    assembler: ResidualAssembler,
    /// `equations[f]` governs field `f`.
    equations: Vec<Box<dyn Equation>>,
    plan: EquationPlan,
    boundaries: Vec<FieldBoundary>,
    /// Inverse condensed lumped mass; empty for solved fields.
    inverse_mass: Vec<Vec<f64>>,
    names: Vec<String>,
    pde_types: Vec<PdeType>,
    components: Vec<usize>,
    solver: SolverConfig,
    policy: FailurePolicy,
    time: TimeState,
    end_time: Option<f64>,
    max_steps: Option<u64>,
    state: StepperState,
    solver_states: Vec<Option<SolverState>>,
    last_metrics: StepMetrics,
}

impl TimeStepper {
    /// Assemble a stepper for the fields of a built registry.
    ///
    /// `equations` may come in any order; `plan` must have been validated
    /// against the same equations and the registry's fields.
    pub fn new(
        assembler: ResidualAssembler,
        equations: Vec<Box<dyn Equation>>,
        plan: EquationPlan,
        registry: &FieldRegistry,
        boundaries: Vec<FieldBoundary>,
        config: &SimulationConfig,
    ) -> Result<Self, SimulationError> {
        let defs = registry.defs();
        let components = registry.components();
        if boundaries.len() != defs.len() {
            return Err(ConfigError::invalid(
                "boundary_conditions",
                format!("{} sets for {} fields", boundaries.len(), defs.len()),
            )
            .into());
        }

        let mut slots: Vec<Option<Box<dyn Equation>>> = (0..defs.len()).map(|_| None).collect();
        for eq in equations {
            if let Some(slot) = slots.get_mut(eq.field().index()) {
                *slot = Some(eq);
            }
        }
        let equations = slots
            .into_iter()
            .zip(&defs)
            .map(|(slot, def)| {
                slot.ok_or_else(|| PipelineError::MissingEquation {
                    name: def.name.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(ConfigError::from)?;

        let mut inverse_mass = vec![Vec::new(); defs.len()];
        for &id in plan.explicit() {
            let i = id.index();
            let mut mass = assembler
                .lumped_mass(components[i])
                .map_err(|source| StepError::Assembly {
                    field: defs[i].name.clone(),
                    source,
                })?;
            let constraints = &boundaries[i].constraints;
            constraints.condense(&mut mass);
            inverse_mass[i] = mass
                .iter()
                .enumerate()
                .map(|(dof, &m)| {
                    if constraints.is_constrained(dof) || m == 0.0 {
                        0.0
                    } else {
                        1.0 / m
                    }
                })
                .collect();
        }

        Ok(Self {
            assembler,
            equations,
            plan,
            boundaries,
            inverse_mass,
            names: defs.iter().map(|d| d.name.clone()).collect(),
            pde_types: defs.iter().map(|d| d.pde_type).collect(),
            solver_states: vec![None; defs.len()],
            components,
            solver: config.solver,
            policy: config.failure_policy,
            time: TimeState::initial(config.time.dt),
            end_time: config.time.end_time,
            max_steps: config.time.max_steps,
            state: StepperState::Initialized,
            last_metrics: StepMetrics::default(),
        })
    }

    /// Current time state.
    pub fn time(&self) -> TimeState {
        self.time
    }

    /// Replace the time state, as on restart.
    pub fn set_time(&mut self, time: TimeState) {
        self.time = time;
    }

    /// Lifecycle state.
    pub fn state(&self) -> StepperState {
        self.state
    }

    /// Metrics of the last accepted step.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }

    /// Last Newton solve of `field`, if it is a solved field that has
    /// been solved at least once.
    pub fn solver_state(&self, field: FieldId) -> Option<&SolverState> {
        self.solver_states.get(field.index()).and_then(Option::as_ref)
    }

    /// Constraints of `field`.
    pub fn constraints(&self, field: FieldId) -> Option<&ConstraintSet> {
        self.boundaries.get(field.index()).map(|b| &b.constraints)
    }

    /// Whether the end time or the step limit has been reached.
    pub fn is_finished(&self) -> bool {
        if self.state == StepperState::Terminated {
            return true;
        }
        if self.max_steps.is_some_and(|max| self.time.step.0 >= max) {
            return true;
        }
        self.end_time
            .is_some_and(|end| self.time.time >= end - 1e-12 * end.abs().max(1.0))
    }

    /// Mark the run as ended.
    pub fn terminate(&mut self) {
        self.state = StepperState::Terminated;
    }

    /// Step size of the next attempt: `dt`, cut short to land on the end
    /// time.
    fn step_size(&self) -> f64 {
        match self.end_time {
            Some(end) if end - self.time.time < self.time.dt => end - self.time.time,
            _ => self.time.dt,
        }
    }

    /// Enforce every field's constraints on its current values.
    pub fn apply_constraints(&self, registry: &mut FieldRegistry) {
        for (i, boundary) in self.boundaries.iter().enumerate() {
            if let Some(field) = registry.get_mut(FieldId(i as u32)) {
                boundary.constraints.apply(field.values_mut());
            }
        }
    }

    /// Solve every time-independent field once, at the current time.
    ///
    /// Run before the first step so explicit fields reading them see
    /// consistent values.
    pub fn solve_time_independent(
        &mut self,
        registry: &mut FieldRegistry,
    ) -> Result<(), StepError> {
        let dt = self.time.dt;
        let mut metrics = StepMetrics::default();
        let solved = self.plan.solved().to_vec();
        for id in solved {
            if self.pde_types[id.index()] == PdeType::TimeIndependent {
                self.solve_field(id, registry, dt, &mut metrics)?;
            }
        }
        Ok(())
    }

    /// Advance all fields by one step.
    ///
    /// On failure every field is left at its start-of-step values. With
    /// [`FailurePolicy::HalveAndRetry`], a recoverable failure (non-finite
    /// values, non-convergence) passes through [`StepperState::StepFailed`]
    /// and the attempt is retried with its step size scaled by the factor.
    /// The configured `dt` never exceeds the last attempted size, so the
    /// reduction stays in effect for later steps.
    pub fn step(&mut self, registry: &mut FieldRegistry) -> Result<StepReport, StepError> {
        let start = Instant::now();
        let _span = debug_span!("step", step = self.time.step.0 + 1).entered();
        registry.save_previous();

        let mut metrics = StepMetrics::default();
        let mut retries = 0u32;
        let mut dt = self.step_size();
        loop {
            self.state = StepperState::Stepping;
            match self.attempt(registry, dt, &mut metrics) {
                Ok(()) => {
                    self.time = self.time.advanced(dt);
                    metrics.retries = retries;
                    metrics.total_us = start.elapsed().as_micros() as u64;
                    self.state = StepperState::ConvergedStep;
                    self.last_metrics = metrics.clone();
                    debug!(
                        step = %self.time.step,
                        time = self.time.time,
                        dt,
                        retries,
                        total_us = metrics.total_us,
                        "step accepted"
                    );
                    return Ok(StepReport {
                        time: self.time,
                        taken: dt,
                        metrics,
                    });
                }
                Err(e) => {
                    registry.restore_previous();
                    let step = self.time.step.0 + 1;
                    match self.policy {
                        FailurePolicy::HalveAndRetry {
                            max_retries,
                            factor,
                        } if e.kind().is_recoverable() && retries < max_retries => {
                            self.state = StepperState::StepFailed;
                            retries += 1;
                            dt *= factor;
                            self.time.dt = self.time.dt.min(dt);
                            warn!(
                                step,
                                retry = retries,
                                dt,
                                error = %e,
                                "step failed, retrying with smaller dt"
                            );
                        }
                        _ => {
                            self.state = StepperState::StepFailed;
                            return Err(if retries == 0 {
                                e
                            } else {
                                StepError::RetriesExhausted {
                                    step,
                                    retries,
                                    last: Box::new(e),
                                }
                            });
                        }
                    }
                }
            }
        }
    }

    fn attempt(
        &mut self,
        registry: &mut FieldRegistry,
        dt: f64,
        metrics: &mut StepMetrics,
    ) -> Result<(), StepError> {
        let explicit_start = Instant::now();
        let explicit = self.plan.explicit().to_vec();

        // All residuals first: explicit fields read the start-of-step state.
        for &id in &explicit {
            let field_start = Instant::now();
            let mut residual = registry.take_residual(id);
            let result = self.assemble(id, registry, dt, &mut residual);
            registry.put_residual(id, residual);
            result?;
            self.record_field(metrics, id, field_start);
        }
        for &id in &explicit {
            self.explicit_update(id, registry, dt)?;
        }
        metrics.explicit_us += explicit_start.elapsed().as_micros() as u64;

        let solve_start = Instant::now();
        let solved = self.plan.solved().to_vec();
        for id in solved {
            let field_start = Instant::now();
            self.solve_field(id, registry, dt, metrics)?;
            self.record_field(metrics, id, field_start);
        }
        metrics.solve_us += solve_start.elapsed().as_micros() as u64;
        Ok(())
    }

    fn record_field(&self, metrics: &mut StepMetrics, id: FieldId, start: Instant) {
        let us = start.elapsed().as_micros() as u64;
        let name = &self.names[id.index()];
        match metrics.field_us.iter_mut().find(|(n, _)| n == name) {
            Some((_, total)) => *total += us,
            None => metrics.field_us.push((name.clone(), us)),
        }
    }

    /// Assemble and condense the right-hand side of `id` into `out`.
    fn assemble(
        &self,
        id: FieldId,
        registry: &FieldRegistry,
        dt: f64,
        out: &mut [f64],
    ) -> Result<(), StepError> {
        let i = id.index();
        let previous = registry.previous_view();
        let ctx = AssemblyContext::new(registry, &previous, &self.components, self.time.time, dt);
        self.assembler
            .assemble_rhs(&*self.equations[i], &ctx, &self.boundaries[i].neumann, out)
            .map_err(|source| self.assembly_error(id, source))?;
        self.boundaries[i].constraints.condense(out);
        Ok(())
    }

    fn assembly_error(&self, id: FieldId, source: AssemblyError) -> StepError {
        StepError::Assembly {
            field: self.names[id.index()].clone(),
            source,
        }
    }

    fn explicit_update(
        &self,
        id: FieldId,
        registry: &mut FieldRegistry,
        dt: f64,
    ) -> Result<(), StepError> {
        let i = id.index();
        let Some(field) = registry.get_mut(id) else {
            return Ok(());
        };
        let (values, residual) = field.values_and_residual();
        for ((u, r), m) in values.iter_mut().zip(residual).zip(&self.inverse_mass[i]) {
            *u += dt * m * r;
        }
        self.boundaries[i].constraints.apply(values);
        self.check_finite(id, values)
    }

    fn check_finite(&self, id: FieldId, values: &[f64]) -> Result<(), StepError> {
        match values.iter().position(|v| !v.is_finite()) {
            Some(dof) => Err(StepError::NonFinite {
                field: self.names[id.index()].clone(),
                dof,
            }),
            None => Ok(()),
        }
    }

    fn solve_field(
        &mut self,
        id: FieldId,
        registry: &mut FieldRegistry,
        dt: f64,
        metrics: &mut StepMetrics,
    ) -> Result<(), StepError> {
        let mut residual = registry.take_residual(id);
        let result = self.newton(id, registry, dt, &mut residual, metrics);
        registry.put_residual(id, residual);
        let state = result?;
        if let Some(slot) = self.solver_states.get_mut(id.index()) {
            *slot = Some(state);
        }
        Ok(())
    }

    /// Newton iteration on `r(u) = 0` for one field.
    fn newton(
        &self,
        id: FieldId,
        registry: &mut FieldRegistry,
        dt: f64,
        residual: &mut [f64],
        metrics: &mut StepMetrics,
    ) -> Result<SolverState, StepError> {
        let i = id.index();
        let constraints = &self.boundaries[i].constraints;
        let mesh = self.assembler.mesh();
        let k = self.components[i];
        let mut history = Vec::new();
        let mut delta = vec![0.0; residual.len()];

        if let Some(field) = registry.get_mut(id) {
            constraints.apply(field.values_mut());
        }

        let mut iteration = 0;
        loop {
            self.assemble(id, registry, dt, residual)?;
            let norm = reduce::norm(mesh, k, residual);
            history.push(norm);
            if !norm.is_finite() {
                let dof = residual.iter().position(|v| !v.is_finite()).unwrap_or(0);
                return Err(StepError::NonFinite {
                    field: self.names[i].clone(),
                    dof,
                });
            }
            trace!(field = %self.names[i], iteration, residual = norm, "newton");
            if norm <= self.solver.nonlinear_tolerance {
                return Ok(SolverState {
                    iterations: iteration,
                    residual_history: history,
                    converged: true,
                });
            }
            if iteration == self.solver.max_nonlinear_iterations {
                return Err(StepError::NonConvergence {
                    field: self.names[i].clone(),
                    iterations: iteration,
                    residual: norm,
                });
            }

            delta.fill(0.0);
            let report = self.linear_solve(id, registry, dt, residual, &mut delta)?;
            metrics.linear_iterations += report.iterations;
            if !report.converged {
                debug!(
                    field = %self.names[i],
                    iterations = report.iterations,
                    residual = report.residual_norm,
                    "linear solve hit its iteration cap"
                );
            }
            constraints.apply_homogeneous(&mut delta);
            if let Some(field) = registry.get_mut(id) {
                let values = field.values_mut();
                for (u, d) in values.iter_mut().zip(&delta) {
                    *u += d;
                }
                constraints.apply(values);
            }
            iteration += 1;
            metrics.nonlinear_iterations += 1;
        }
    }

    /// Solve `J Δu = r` on the constrained subspace.
    ///
    /// Constrained rows are replaced by the identity, so their entries of
    /// `Δu` stay zero and the operator remains symmetric.
    fn linear_solve(
        &self,
        id: FieldId,
        registry: &FieldRegistry,
        dt: f64,
        rhs: &[f64],
        delta: &mut [f64],
    ) -> Result<LinearSolveReport, StepError> {
        let i = id.index();
        let eq = &*self.equations[i];
        let constraints = &self.boundaries[i].constraints;
        let mesh = self.assembler.mesh();
        let k = self.components[i];
        let previous = registry.previous_view();
        let ctx = AssemblyContext::new(registry, &previous, &self.components, self.time.time, dt);
        let mut direction = vec![0.0; rhs.len()];

        let apply = |v: &[f64], out: &mut [f64]| -> Result<(), AssemblyError> {
            direction.copy_from_slice(v);
            constraints.apply_homogeneous(&mut direction);
            self.assembler.apply_lhs(eq, &ctx, &direction, out)?;
            constraints.condense(out);
            for (dof, _) in constraints.iter() {
                out[dof] = v[dof];
            }
            Ok(())
        };
        let dot = |a: &[f64], b: &[f64]| reduce::dot(mesh, k, a, b);
        conjugate_gradient(apply, dot, rhs, delta, &self.solver.linear())
            .map_err(|source| self.assembly_error(id, source))
    }
}
