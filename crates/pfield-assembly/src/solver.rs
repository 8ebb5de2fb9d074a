//! Conjugate gradients for the linearized correction equation.

use crate::error::AssemblyError;
use tracing::trace;

/// Iteration cap and relative tolerance for one linear solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearSolverConfig {
    /// Maximum CG iterations.
    pub max_iterations: usize,
    /// Stop once `‖r‖ ≤ tolerance · ‖b‖`.
    pub tolerance: f64,
}

impl Default for LinearSolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-10,
        }
    }
}

/// Outcome of one linear solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearSolveReport {
    /// Iterations performed.
    pub iterations: usize,
    /// Final residual norm.
    pub residual_norm: f64,
    /// Whether the tolerance was met before the cap.
    pub converged: bool,
}

/// Solve `A x = b` for a symmetric positive definite operator given only
/// by its action.
///
/// `apply(v, out)` writes `A v` into `out`; `dot` is the global inner
/// product. `x` holds the initial guess on entry and the solution on exit.
/// Hitting the iteration cap is reported, not an error; a non-positive or
/// non-finite curvature `pᵀAp` is [`AssemblyError::Breakdown`].
pub fn conjugate_gradient<A, D>(
    mut apply: A,
    dot: D,
    b: &[f64],
    x: &mut [f64],
    config: &LinearSolverConfig,
) -> Result<LinearSolveReport, AssemblyError>
where
    A: FnMut(&[f64], &mut [f64]) -> Result<(), AssemblyError>,
    D: Fn(&[f64], &[f64]) -> f64,
{
    let n = b.len();
    let mut r = vec![0.0; n];
    apply(x, &mut r)?;
    for (ri, bi) in r.iter_mut().zip(b) {
        *ri = bi - *ri;
    }
    let target = config.tolerance * dot(b, b).sqrt();
    let mut rr = dot(&r, &r);
    if rr.sqrt() <= target {
        return Ok(LinearSolveReport {
            iterations: 0,
            residual_norm: rr.sqrt(),
            converged: true,
        });
    }

    let mut p = r.clone();
    let mut ap = vec![0.0; n];
    for iteration in 1..=config.max_iterations {
        apply(&p, &mut ap)?;
        let curvature = dot(&p, &ap);
        if !(curvature.is_finite() && curvature > 0.0) {
            return Err(AssemblyError::Breakdown {
                iteration,
                curvature,
            });
        }
        let alpha = rr / curvature;
        for i in 0..n {
            x[i] += alpha * p[i];
            r[i] -= alpha * ap[i];
        }
        let rr_next = dot(&r, &r);
        trace!(iteration, residual = rr_next.sqrt(), "cg");
        if rr_next.sqrt() <= target {
            return Ok(LinearSolveReport {
                iterations: iteration,
                residual_norm: rr_next.sqrt(),
                converged: true,
            });
        }
        let beta = rr_next / rr;
        rr = rr_next;
        for (pi, ri) in p.iter_mut().zip(&r) {
            *pi = ri + beta * *pi;
        }
    }
    Ok(LinearSolveReport {
        iterations: config.max_iterations,
        residual_norm: rr.sqrt(),
        converged: false,
    })
}
