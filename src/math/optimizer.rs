//! Nonlinear least squares on top of argmin's L-BFGS.
//!
//! Problems expose residuals `r(p)` and an analytic Jacobian. The solver
//! minimizes the scaled cost
//!
//! ```text
//! C(p) = Σ r_i(p)² / cost_scale
//! ```
//!
//! with gradient `2·Jᵀr / cost_scale`, so tolerances do not depend on the
//! magnitude of the observations. Box bounds are enforced by clamping, with the
//! gradient projected to zero where it would push past a bound.

use std::sync::atomic::{AtomicUsize, Ordering};

use argmin::core::{CostFunction, Executor, Gradient, State, TerminationReason, TerminationStatus};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::error::{GrainError, Result};

/// A least-squares problem with an analytic Jacobian.
pub trait LeastSquaresProblem {
    fn param_count(&self) -> usize;

    /// Residual vector `r(p)` (model minus observation).
    fn residuals(&self, params: &[f64]) -> Vec<f64>;

    /// Jacobian `∂r_i/∂p_j` (`residual_count × param_count`).
    fn jacobian(&self, params: &[f64]) -> DMatrix<f64>;

    /// Divisor applied to the sum of squares (typically `Σ y_i²`).
    fn cost_scale(&self) -> f64 {
        1.0
    }

    /// `(lower, upper)` per parameter.
    fn bounds(&self) -> Vec<(f64, f64)> {
        vec![(f64::NEG_INFINITY, f64::INFINITY); self.param_count()]
    }
}

/// Solver budget and tolerances.
#[derive(Debug, Clone, Copy)]
pub struct SolverOptions {
    /// Maximum number of L-BFGS iterations. `None` means `200 * (p + 1)`.
    pub max_iters: Option<u64>,
    /// Convergence tolerance on the gradient norm of the scaled cost.
    pub tol_grad: f64,
    /// Convergence tolerance on the change of the scaled cost between iterations.
    pub tol_cost: f64,
    /// Number of correction pairs kept by L-BFGS.
    pub memory: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iters: None,
            tol_grad: 1e-9,
            tol_cost: 1e-15,
            memory: 7,
        }
    }
}

impl SolverOptions {
    pub fn iteration_budget(&self, param_count: usize) -> u64 {
        self.max_iters.unwrap_or(200 * (param_count as u64 + 1))
    }
}

/// Outcome of a solve.
#[derive(Debug, Clone)]
pub struct Solution {
    pub params: Vec<f64>,
    /// Sum of squared residuals at `params` (unscaled).
    pub ssr: f64,
    pub iterations: u64,
    /// Cost evaluations spent by the solver.
    pub evaluations: usize,
    pub converged: bool,
    pub message: String,
}

/// Adapts a `LeastSquaresProblem` to argmin's cost/gradient traits.
struct ScaledCost<'a, P> {
    problem: &'a P,
    bounds: &'a [(f64, f64)],
    scale: f64,
    evaluations: &'a AtomicUsize,
}

fn clamp_params(params: &[f64], bounds: &[(f64, f64)]) -> Vec<f64> {
    params
        .iter()
        .zip(bounds)
        .map(|(&v, &(lo, hi))| v.clamp(lo, hi))
        .collect()
}

fn sum_of_squares(r: &[f64]) -> f64 {
    r.iter().map(|v| v * v).sum()
}

/// `2·Jᵀr / scale`, zeroed where it would push a bound-pinned parameter outward.
fn projected_gradient<P: LeastSquaresProblem>(
    problem: &P,
    params: &[f64],
    bounds: &[(f64, f64)],
    scale: f64,
) -> Vec<f64> {
    const EPS: f64 = 1e-12;
    let r = DVector::from_vec(problem.residuals(params));
    let j = problem.jacobian(params);
    let g = j.transpose() * r * (2.0 / scale);

    g.iter()
        .zip(params.iter().zip(bounds))
        .map(|(&g, (&x, &(lo, hi)))| {
            if (x <= lo + EPS && g > 0.0) || (x >= hi - EPS && g < 0.0) {
                0.0
            } else {
                g
            }
        })
        .collect()
}

impl<P: LeastSquaresProblem> CostFunction for ScaledCost<'_, P> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(
        &self,
        params: &Self::Param,
    ) -> std::result::Result<Self::Output, argmin::core::Error> {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        let x = clamp_params(params, self.bounds);
        let cost = sum_of_squares(&self.problem.residuals(&x)) / self.scale;
        if !cost.is_finite() {
            return Err(argmin::core::Error::msg(format!("non-finite cost at {x:?}")));
        }
        Ok(cost)
    }
}

impl<P: LeastSquaresProblem> Gradient for ScaledCost<'_, P> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(
        &self,
        params: &Self::Param,
    ) -> std::result::Result<Self::Gradient, argmin::core::Error> {
        let x = clamp_params(params, self.bounds);
        Ok(projected_gradient(self.problem, &x, self.bounds, self.scale))
    }
}

/// Minimize `Σ r_i²` from `initial`.
///
/// Non-convergence (iteration budget, line-search failure, a start where the
/// residuals are not finite or the gradient already vanishes with a non-zero
/// cost) is reported through `Solution::converged`; only malformed inputs are
/// errors.
pub fn minimize_least_squares<P: LeastSquaresProblem>(
    problem: &P,
    initial: &[f64],
    opts: &SolverOptions,
) -> Result<Solution> {
    let p = problem.param_count();
    let bounds = problem.bounds();
    if initial.len() != p || bounds.len() != p {
        return Err(GrainError::invalid(format!(
            "expected {p} initial parameters and bounds, got {} and {}",
            initial.len(),
            bounds.len()
        )));
    }
    let scale = match problem.cost_scale() {
        s if s.is_finite() && s > 0.0 => s,
        _ => 1.0,
    };

    let start = clamp_params(initial, &bounds);
    let ssr0 = sum_of_squares(&problem.residuals(&start));
    let early = |ssr: f64, converged: bool, message: &str| {
        debug!(ssr, converged, reason = message, "least-squares solve finished at start");
        Solution {
            params: start.clone(),
            ssr,
            iterations: 0,
            evaluations: 1,
            converged,
            message: message.to_string(),
        }
    };
    if !ssr0.is_finite() {
        return Ok(early(ssr0, false, "non-finite residuals at the initial guess"));
    }
    if ssr0 == 0.0 {
        return Ok(early(ssr0, true, "residuals vanish at the initial guess"));
    }
    let g0 = projected_gradient(problem, &start, &bounds, scale);
    if g0.iter().map(|g| g * g).sum::<f64>().sqrt() < opts.tol_grad {
        return Ok(early(ssr0, false, "gradient vanishes at the initial guess"));
    }

    let evaluations = AtomicUsize::new(0);
    let cost = ScaledCost {
        problem,
        bounds: &bounds,
        scale,
        evaluations: &evaluations,
    };

    let solver = LBFGS::new(MoreThuenteLineSearch::new(), opts.memory)
        .with_tolerance_grad(opts.tol_grad)
        .map_err(|e| GrainError::invalid(format!("invalid solver tolerance (grad): {e}")))?
        .with_tolerance_cost(opts.tol_cost)
        .map_err(|e| GrainError::invalid(format!("invalid solver tolerance (cost): {e}")))?;

    let max_iters = opts.iteration_budget(p);
    let run = Executor::new(cost, solver)
        .configure(|state| state.param(start.clone()).max_iters(max_iters))
        .run();

    let res = match run {
        Ok(res) => res,
        Err(e) => {
            let solution = Solution {
                params: start.clone(),
                ssr: ssr0,
                iterations: 0,
                evaluations: evaluations.load(Ordering::Relaxed),
                converged: false,
                message: format!("optimizer failed: {e}"),
            };
            debug!(reason = %solution.message, "least-squares solve aborted");
            return Ok(solution);
        }
    };

    let state = res.state();
    let params = match state.get_best_param() {
        Some(best) => clamp_params(best, &bounds),
        None => start.clone(),
    };
    let termination = state.get_termination_status();
    let converged = matches!(
        termination,
        TerminationStatus::Terminated(TerminationReason::SolverConverged)
            | TerminationStatus::Terminated(TerminationReason::TargetCostReached)
    );
    let solution = Solution {
        ssr: sum_of_squares(&problem.residuals(&params)),
        params,
        iterations: state.get_iter(),
        evaluations: evaluations.load(Ordering::Relaxed),
        converged,
        message: termination.to_string(),
    };
    debug!(
        iterations = solution.iterations,
        evaluations = solution.evaluations,
        ssr = solution.ssr,
        converged,
        reason = %solution.message,
        "least-squares solve finished"
    );
    Ok(solution)
}

/// Parameter covariance `(JᵀJ)⁻¹ · SSR/(n - p)`.
///
/// Returns `None` when there are no residual degrees of freedom or the normal
/// matrix is singular.
pub fn covariance(jacobian: &DMatrix<f64>, ssr: f64) -> Option<DMatrix<f64>> {
    let (n, p) = jacobian.shape();
    if n <= p {
        return None;
    }
    let jtj = jacobian.transpose() * jacobian;
    let inv = jtj.try_inverse()?;
    let cov = inv * (ssr / (n - p) as f64);
    if cov.iter().all(|v| v.is_finite()) {
        Some(cov)
    } else {
        None
    }
}
