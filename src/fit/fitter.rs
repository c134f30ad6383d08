//! Lognormal fit of an unfolded histogram.
//!
//! Given:
//! - class midpoints `d_i`
//! - 3D-equivalent class densities `f_i`
//! - an initial `(shape, scale)` guess
//!
//! we minimize `Σ (lognormal(d_i; shape, scale) - f_i)²` (L-BFGS, see `math::optimizer`)
//! and report one-sigma parameter errors from the residual-scaled covariance.
//!
//! The fitter is a pure function of its inputs (no solver state survives a call),
//! so the resolution sweep can run many fits in parallel.

use nalgebra::DMatrix;

use crate::domain::{LognormalFit, LognormalGuess};
use crate::error::{GrainError, Result};
use crate::math::{covariance, minimize_least_squares, LeastSquaresProblem, SolverOptions};
use crate::models::{lognormal_density, lognormal_gradient};

/// Range of `σ = ln(shape)` explored by the solver.
const SIGMA_BOUNDS: (f64, f64) = (1e-6, 20.0);
/// Range of `μ = ln(scale)` explored by the solver.
const MU_BOUNDS: (f64, f64) = (-700.0, 700.0);

/// Observed `(midpoint, density)` pairs against the lognormal model.
///
/// The solver works on `θ = (ln σ, μ)` so that `shape > 1` and `scale > 0`
/// hold everywhere it can step.
struct LognormalProblem<'a> {
    midpoints: &'a [f64],
    frequencies: &'a [f64],
}

fn to_theta(shape: f64, scale: f64) -> [f64; 2] {
    [shape.ln().ln(), scale.ln()]
}

fn from_theta(theta: &[f64]) -> (f64, f64) {
    (theta[0].exp().exp(), theta[1].exp())
}

/// `∂r/∂(shape, scale)` at the natural parameters.
fn natural_jacobian(midpoints: &[f64], shape: f64, scale: f64) -> DMatrix<f64> {
    let mut j = DMatrix::zeros(midpoints.len(), 2);
    for (i, &d) in midpoints.iter().enumerate() {
        let (ds, dm) = lognormal_gradient(d, shape, scale);
        j[(i, 0)] = ds;
        j[(i, 1)] = dm;
    }
    j
}

impl LeastSquaresProblem for LognormalProblem<'_> {
    fn param_count(&self) -> usize {
        2
    }

    fn residuals(&self, theta: &[f64]) -> Vec<f64> {
        let (shape, scale) = from_theta(theta);
        self.midpoints
            .iter()
            .zip(self.frequencies)
            .map(|(&d, &f)| lognormal_density(d, shape, scale) - f)
            .collect()
    }

    fn jacobian(&self, theta: &[f64]) -> DMatrix<f64> {
        let (shape, scale) = from_theta(theta);
        let sigma = theta[0].exp();
        let mut j = natural_jacobian(self.midpoints, shape, scale);
        // d shape / d ln σ = shape·σ, d scale / d μ = scale
        for i in 0..j.nrows() {
            j[(i, 0)] *= shape * sigma;
            j[(i, 1)] *= scale;
        }
        j
    }

    fn cost_scale(&self) -> f64 {
        self.frequencies.iter().map(|f| f * f).sum()
    }

    fn bounds(&self) -> Vec<(f64, f64)> {
        vec![(SIGMA_BOUNDS.0.ln(), SIGMA_BOUNDS.1.ln()), MU_BOUNDS]
    }
}

/// Fit a lognormal density to `(midpoints, frequencies)`.
///
/// Errors:
/// - `InvalidArgument` for mismatched/empty inputs, non-positive midpoints, or a
///   guess outside `shape > 1`, `scale > 0`
/// - `FitDidNotConverge` when the solver stops without meeting its tolerances
pub fn fit_lognormal(
    midpoints: &[f64],
    frequencies: &[f64],
    guess: LognormalGuess,
    opts: &SolverOptions,
) -> Result<LognormalFit> {
    if midpoints.len() != frequencies.len() {
        return Err(GrainError::invalid(format!(
            "midpoints ({}) and frequencies ({}) differ in length",
            midpoints.len(),
            frequencies.len()
        )));
    }
    if midpoints.is_empty() {
        return Err(GrainError::invalid("no classes to fit"));
    }
    if midpoints.iter().any(|d| !(d.is_finite() && *d > 0.0)) {
        return Err(GrainError::invalid("class midpoints must be finite and positive"));
    }
    if frequencies.iter().any(|f| !f.is_finite()) {
        return Err(GrainError::invalid("class frequencies must be finite"));
    }
    if !(guess.shape.is_finite() && guess.shape > 1.0) {
        return Err(GrainError::invalid(format!(
            "initial MSD guess must be > 1.0, got {}",
            guess.shape
        )));
    }
    if !(guess.scale.is_finite() && guess.scale > 0.0) {
        return Err(GrainError::invalid(format!(
            "initial geometric-mean guess must be > 0, got {}",
            guess.scale
        )));
    }

    let problem = LognormalProblem {
        midpoints,
        frequencies,
    };
    let solution =
        minimize_least_squares(&problem, &to_theta(guess.shape, guess.scale), opts)?;
    if !solution.converged {
        return Err(GrainError::FitDidNotConverge {
            num_classes: Some(midpoints.len()),
            reason: format!("{} after {} iterations", solution.message, solution.iterations),
        });
    }

    let (shape, scale) = from_theta(&solution.params);
    let jacobian = natural_jacobian(midpoints, shape, scale);
    let (shape_stderr, scale_stderr) = match covariance(&jacobian, solution.ssr) {
        Some(cov) => (cov[(0, 0)].max(0.0).sqrt(), cov[(1, 1)].max(0.0).sqrt()),
        None => (f64::INFINITY, f64::INFINITY),
    };

    Ok(LognormalFit {
        shape,
        scale,
        shape_stderr,
        scale_stderr,
        evaluations: solution.evaluations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn synthetic(shape: f64, scale: f64) -> (Vec<f64>, Vec<f64>) {
        let mids: Vec<f64> = (0..12).map(|i| 5.0 + 10.0 * i as f64).collect();
        let freqs = mids.iter().map(|&d| lognormal_density(d, shape, scale)).collect();
        (mids, freqs)
    }

    #[test]
    fn recovers_known_parameters() {
        let (mids, freqs) = synthetic(1.3, 40.0);
        let fit = fit_lognormal(&mids, &freqs, LognormalGuess::default(), &SolverOptions::default())
            .unwrap();
        assert_relative_eq!(fit.shape, 1.3, max_relative = 0.01);
        assert_relative_eq!(fit.scale, 40.0, max_relative = 0.01);
        assert!(fit.shape_stderr < 1e-4);
        assert!(fit.scale_stderr < 1e-3);
        assert!(fit.evaluations > 0);
    }

    #[test]
    fn noisy_data_reports_positive_errors() {
        let (mids, mut freqs) = synthetic(1.3, 40.0);
        for (i, f) in freqs.iter_mut().enumerate() {
            *f *= if i % 2 == 0 { 1.05 } else { 0.95 };
        }
        let fit = fit_lognormal(&mids, &freqs, LognormalGuess::default(), &SolverOptions::default())
            .unwrap();
        assert!(fit.shape_stderr > 0.0 && fit.shape_stderr.is_finite());
        assert!(fit.scale_stderr > 0.0 && fit.scale_stderr.is_finite());
        assert_relative_eq!(fit.shape, 1.3, max_relative = 0.05);
    }

    #[test]
    fn rejects_degenerate_guess() {
        let (mids, freqs) = synthetic(1.3, 40.0);
        let opts = SolverOptions::default();
        let bad_shape = LognormalGuess { shape: 1.0, scale: 35.0 };
        let bad_scale = LognormalGuess { shape: 1.2, scale: 0.0 };
        assert!(matches!(
            fit_lognormal(&mids, &freqs, bad_shape, &opts),
            Err(GrainError::InvalidArgument(_))
        ));
        assert!(matches!(
            fit_lognormal(&mids, &freqs, bad_scale, &opts),
            Err(GrainError::InvalidArgument(_))
        ));
    }

    #[test]
    fn exhausted_budget_propagates() {
        let (mids, freqs) = synthetic(1.3, 40.0);
        let opts = SolverOptions {
            max_iters: Some(1),
            ..SolverOptions::default()
        };
        let err = fit_lognormal(&mids, &freqs, LognormalGuess::default(), &opts).unwrap_err();
        assert!(matches!(
            err,
            GrainError::FitDidNotConverge {
                num_classes: Some(12),
                ..
            }
        ));
    }

    #[test]
    fn guess_far_from_the_data_does_not_pass_as_a_fit() {
        // Model density is zero at every midpoint: the cost is flat around the guess.
        let (mids, freqs) = synthetic(1.3, 40.0);
        let far = LognormalGuess {
            shape: 1.2,
            scale: 1e5,
        };
        let err = fit_lognormal(&mids, &freqs, far, &SolverOptions::default()).unwrap_err();
        match err {
            GrainError::FitDidNotConverge { reason, .. } => {
                assert!(reason.contains("gradient vanishes"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn theta_round_trips_natural_parameters() {
        let (shape, scale) = from_theta(&to_theta(1.25, 30.0));
        assert_relative_eq!(shape, 1.25, epsilon = 1e-12);
        assert_relative_eq!(scale, 30.0, epsilon = 1e-10);
    }

    #[test]
    fn mismatched_lengths_are_invalid() {
        let err = fit_lognormal(
            &[1.0, 2.0],
            &[0.5],
            LognormalGuess::default(),
            &SolverOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GrainError::InvalidArgument(_)));
    }
}
