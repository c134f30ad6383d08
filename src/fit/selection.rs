//! Optimal-resolution search (two-step method, Lopez-Sanchez & Llana-Funez 2016).
//!
//! For every candidate class count (ascending) we build the histogram, unfold
//! it and fit a lognormal with the same initial guess, recording the MSD
//! standard error. Selection rules:
//!
//! 1. Candidates whose fit did not converge are excluded (but kept for diagnostics)
//! 2. Choose the minimum MSD standard error
//! 3. Ties go to the smallest class count
//!
//! The chosen resolution is then recomputed to get the authoritative fit, and
//! the parameter errors are propagated into an uncertainty band over a dense
//! diameter grid.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{CurveGrid, LeftEdge, LognormalFit, LognormalGuess, UnfoldedHistogram};
use crate::error::{GrainError, Result};
use crate::fit::class_grid::{class_counts, diameter_grid};
use crate::fit::fitter::fit_lognormal;
use crate::math::SolverOptions;
use crate::models::lognormal_curve;
use crate::stereology::{build_histogram, unfold};

/// Keeps the band curves defined when `shape - σ` would reach 1.
const MIN_BAND_SHAPE: f64 = 1.0 + 1e-9;

/// Result of fitting one candidate class count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateOutcome {
    Fitted(LognormalFit),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepCandidate {
    pub num_classes: usize,
    pub outcome: CandidateOutcome,
}

impl SweepCandidate {
    pub fn shape_stderr(&self) -> Option<f64> {
        match &self.outcome {
            CandidateOutcome::Fitted(fit) => Some(fit.shape_stderr),
            CandidateOutcome::Failed(_) => None,
        }
    }
}

/// Output of the two-step method.
#[derive(Debug, Clone)]
pub struct ShapeEstimate {
    pub num_classes: usize,
    pub fit: LognormalFit,
    pub unfolded: UnfoldedHistogram,
    /// Every swept candidate, in ascending class-count order.
    pub candidates: Vec<SweepCandidate>,
    pub curve: CurveGrid,
}

/// Estimate the lognormal shape of the 3D distribution over the class range
/// `min_classes..=max_classes`.
pub fn estimate_shape(
    diameters: &[f64],
    min_classes: usize,
    max_classes: usize,
    guess: LognormalGuess,
    opts: &SolverOptions,
) -> Result<ShapeEstimate> {
    let counts = class_counts(min_classes, max_classes)?;
    let candidates = sweep_resolutions(diameters, &counts, guess, opts)?;

    let Some(best) = select_optimal(&candidates) else {
        return Err(GrainError::NoViableResolution { candidates });
    };
    let num_classes = candidates[best].num_classes;
    info!(num_classes, candidates = candidates.len(), "selected optimal number of classes");

    let (unfolded, fit) = fit_at(diameters, num_classes, guess, opts)?;
    let max_diameter = diameters.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let grid = diameter_grid(max_diameter)?;
    let curve = uncertainty_band(&grid, &fit);

    Ok(ShapeEstimate {
        num_classes,
        fit,
        unfolded,
        candidates,
        curve,
    })
}

/// Fit every candidate class count (parallel).
///
/// Non-convergence is recorded per candidate; any other failure (invalid
/// arguments, degenerate histograms) aborts the sweep.
pub fn sweep_resolutions(
    diameters: &[f64],
    counts: &[usize],
    guess: LognormalGuess,
    opts: &SolverOptions,
) -> Result<Vec<SweepCandidate>> {
    let results: Vec<Result<SweepCandidate>> = counts
        .par_iter()
        .map(|&num_classes| {
            let outcome = match fit_at(diameters, num_classes, guess, opts) {
                Ok((_, fit)) => {
                    debug!(num_classes, shape_stderr = fit.shape_stderr, "candidate fitted");
                    CandidateOutcome::Fitted(fit)
                }
                Err(GrainError::FitDidNotConverge { reason, .. }) => {
                    debug!(num_classes, %reason, "candidate did not converge");
                    CandidateOutcome::Failed(reason)
                }
                Err(e) => return Err(e),
            };
            Ok(SweepCandidate {
                num_classes,
                outcome,
            })
        })
        .collect();

    // Indexed collect keeps the ascending order; the first hard error wins.
    results.into_iter().collect()
}

/// Index of the candidate with the smallest MSD standard error.
///
/// Ties resolve to the lowest index (the smallest class count of an ascending
/// sweep), independently of the order in which candidates were evaluated.
pub fn select_optimal(candidates: &[SweepCandidate]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, c) in candidates.iter().enumerate() {
        let Some(err) = c.shape_stderr() else {
            continue;
        };
        if err.is_nan() {
            continue;
        }
        match best {
            Some((_, best_err)) if err >= best_err => {}
            _ => best = Some((idx, err)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Histogram → unfold → fit at one class count.
fn fit_at(
    diameters: &[f64],
    num_classes: usize,
    guess: LognormalGuess,
    opts: &SolverOptions,
) -> Result<(UnfoldedHistogram, LognormalFit)> {
    let hist = build_histogram(diameters, num_classes, LeftEdge::default())?;
    let unfolded = unfold(&hist)?;
    let fit = fit_lognormal(
        &unfolded.classes.midpoints,
        &unfolded.classes.frequencies,
        guess,
        opts,
    )
    .map_err(|e| match e {
        GrainError::FitDidNotConverge { reason, .. } => GrainError::FitDidNotConverge {
            num_classes: Some(num_classes),
            reason,
        },
        other => other,
    })?;
    Ok((unfolded, fit))
}

/// Best-fit curve plus the per-point standard deviation across the four
/// `(shape ± σ_shape, scale ± σ_scale)` curves.
pub fn uncertainty_band(grid: &[f64], fit: &LognormalFit) -> CurveGrid {
    let shape_hi = fit.shape + fit.shape_stderr;
    let shape_lo = (fit.shape - fit.shape_stderr).max(MIN_BAND_SHAPE);
    let scale_hi = fit.scale + fit.scale_stderr;
    let scale_lo = (fit.scale - fit.scale_stderr).max(f64::MIN_POSITIVE);

    let variants = [
        lognormal_curve(grid, shape_hi, scale_hi),
        lognormal_curve(grid, shape_lo, scale_lo),
        lognormal_curve(grid, shape_hi, scale_lo),
        lognormal_curve(grid, shape_lo, scale_hi),
    ];

    let fit_error = (0..grid.len())
        .map(|i| {
            let values = variants.iter().map(|v| v[i]);
            let mean = values.clone().sum::<f64>() / variants.len() as f64;
            let var = values.map(|v| (v - mean).powi(2)).sum::<f64>() / variants.len() as f64;
            var.sqrt()
        })
        .collect();

    CurveGrid {
        diameters: grid.to_vec(),
        best_fit: lognormal_curve(grid, fit.shape, fit.scale),
        fit_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fitted(num_classes: usize, shape_stderr: f64) -> SweepCandidate {
        SweepCandidate {
            num_classes,
            outcome: CandidateOutcome::Fitted(LognormalFit {
                shape: 1.2,
                scale: 30.0,
                shape_stderr,
                scale_stderr: 0.5,
                evaluations: 5,
            }),
        }
    }

    fn failed(num_classes: usize) -> SweepCandidate {
        SweepCandidate {
            num_classes,
            outcome: CandidateOutcome::Failed("evaluation budget exhausted".to_string()),
        }
    }

    /// Deterministic lognormal-looking sample (quantiles of LN(ln 30, ln 1.25)).
    fn sample() -> Vec<f64> {
        let z = [
            -2.0, -1.6, -1.3, -1.1, -0.9, -0.75, -0.6, -0.45, -0.3, -0.15, 0.0, 0.15, 0.3, 0.45,
            0.6, 0.75, 0.9, 1.1, 1.3, 1.6, 2.0,
        ];
        z.iter().map(|z| (30.0_f64.ln() + 1.25_f64.ln() * z).exp()).collect()
    }

    #[test]
    fn picks_minimum_shape_error() {
        let c = vec![fitted(10, 0.03), fitted(11, 0.01), fitted(12, 0.02)];
        assert_eq!(select_optimal(&c), Some(1));
    }

    #[test]
    fn ties_resolve_to_smallest_class_count() {
        let c = vec![fitted(10, 0.05), fitted(11, 0.02), fitted(12, 0.03), fitted(13, 0.02)];
        assert_eq!(select_optimal(&c), Some(1));
        assert_eq!(c[1].num_classes, 11);
    }

    #[test]
    fn failed_candidates_are_skipped() {
        let c = vec![failed(10), fitted(11, 0.2), failed(12)];
        assert_eq!(select_optimal(&c), Some(1));
        assert_eq!(select_optimal(&[failed(10), failed(11)]), None);
    }

    #[test]
    fn sweep_keeps_ascending_order() {
        let d = sample();
        let counts = class_counts(5, 9).unwrap();
        let c = sweep_resolutions(&d, &counts, LognormalGuess::default(), &SolverOptions::default())
            .unwrap();
        let got: Vec<usize> = c.iter().map(|c| c.num_classes).collect();
        assert_eq!(got, counts);
    }

    #[test]
    fn all_failures_are_reported_with_candidates() {
        let d = sample();
        let opts = SolverOptions {
            max_iters: Some(1),
            ..SolverOptions::default()
        };
        let err = estimate_shape(&d, 5, 8, LognormalGuess::default(), &opts).unwrap_err();
        match err {
            GrainError::NoViableResolution { candidates } => {
                assert_eq!(candidates.len(), 4);
                assert!(candidates.iter().all(|c| c.shape_stderr().is_none()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_range_is_not_swallowed() {
        let d = sample();
        let opts = SolverOptions::default();
        let err = estimate_shape(&d, 0, 3, LognormalGuess::default(), &opts).unwrap_err();
        assert!(matches!(err, GrainError::InvalidArgument(_)));
    }

    #[test]
    fn sub_grid_start_diameters_get_a_curve() {
        // Same population in millimetres: every diameter is below 0.1.
        let d: Vec<f64> = sample().iter().map(|d| d / 1000.0).collect();
        let max_d = d.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert!(max_d < 0.1);
        let guess = LognormalGuess {
            shape: 1.2,
            scale: 0.035,
        };
        let est = estimate_shape(&d, 5, 8, guess, &SolverOptions::default()).unwrap();
        let grid = &est.curve.diameters;
        assert!(grid[0] > 0.0 && grid[0] < max_d);
        assert_relative_eq!(*grid.last().unwrap(), max_d, epsilon = 1e-12);
        assert_relative_eq!(est.fit.scale, 0.03, max_relative = 0.3);
    }

    #[test]
    fn band_is_zero_without_parameter_errors() {
        let fit = LognormalFit {
            shape: 1.3,
            scale: 40.0,
            shape_stderr: 0.0,
            scale_stderr: 0.0,
            evaluations: 1,
        };
        let grid = [10.0, 40.0, 90.0];
        let band = uncertainty_band(&grid, &fit);
        assert_eq!(band.best_fit.len(), 3);
        for e in &band.fit_error {
            assert_relative_eq!(*e, 0.0, epsilon = 1e-15);
        }
    }

    #[test]
    fn band_grows_with_parameter_errors() {
        let grid = [20.0, 40.0, 60.0];
        let tight = LognormalFit {
            shape: 1.3,
            scale: 40.0,
            shape_stderr: 0.01,
            scale_stderr: 0.5,
            evaluations: 1,
        };
        let loose = LognormalFit {
            shape_stderr: 0.05,
            scale_stderr: 2.0,
            ..tight
        };
        let a = uncertainty_band(&grid, &tight);
        let b = uncertainty_band(&grid, &loose);
        assert!(b.fit_error[1] > a.fit_error[1]);
        assert!(a.fit_error.iter().all(|e| *e > 0.0));
    }

    #[test]
    fn band_survives_shape_error_reaching_one() {
        let fit = LognormalFit {
            shape: 1.05,
            scale: 40.0,
            shape_stderr: 0.2,
            scale_stderr: 1.0,
            evaluations: 1,
        };
        let band = uncertainty_band(&[30.0, 40.0, 50.0], &fit);
        assert!(band.fit_error.iter().all(|e| e.is_finite()));
    }
}
