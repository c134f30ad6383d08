//! Histogram builder for apparent diameters.
//!
//! Classes are equal-width over `[left_edge, max(sample)]`. Values below the
//! left edge are ignored and the last class is closed on the right, so the
//! sample maximum always lands in the top class.
//!
//! Frequencies are density-normalized (`Σ f_i · width = 1`) because the unfolding
//! and volume steps treat them as probability densities.

use crate::domain::{Histogram, LeftEdge};
use crate::error::{GrainError, Result};

/// Bin `diameters` into `num_bins` equal-width classes.
pub fn build_histogram(
    diameters: &[f64],
    num_bins: usize,
    left_edge: LeftEdge,
) -> Result<Histogram> {
    if num_bins == 0 {
        return Err(GrainError::invalid("number of bins must be higher than zero"));
    }
    if let LeftEdge::At(x) = left_edge {
        if !(x.is_finite() && x >= 0.0) {
            return Err(GrainError::invalid(format!(
                "left edge must be a non-negative scalar or 'min', got {x}"
            )));
        }
    }
    if diameters.is_empty() {
        return Err(GrainError::degenerate("diameter sample is empty"));
    }
    if let Some(bad) = diameters.iter().find(|d| !d.is_finite()) {
        return Err(GrainError::invalid(format!("non-finite diameter in sample: {bad}")));
    }

    let (min, max) = diameters
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &d| (lo.min(d), hi.max(d)));

    let lo = match left_edge {
        LeftEdge::At(x) => x,
        LeftEdge::SampleMin => min,
    };
    let width = (max - lo) / num_bins as f64;
    if !(width.is_finite() && width > 0.0) {
        return Err(GrainError::degenerate(format!(
            "zero-width classes: range [{lo}, {max}] cannot be split into {num_bins} bins"
        )));
    }

    let mut counts = vec![0usize; num_bins];
    let mut in_range = 0usize;
    for &d in diameters {
        if d < lo || d > max {
            continue;
        }
        let idx = (((d - lo) / width).floor() as usize).min(num_bins - 1);
        counts[idx] += 1;
        in_range += 1;
    }
    if in_range == 0 {
        return Err(GrainError::degenerate(format!(
            "no diameters fall inside [{lo}, {max}]"
        )));
    }

    let norm = in_range as f64 * width;
    let left_edges: Vec<f64> = (0..num_bins).map(|i| lo + i as f64 * width).collect();
    let midpoints = left_edges.iter().map(|e| e + width / 2.0).collect();
    let frequencies = counts.iter().map(|&c| c as f64 / norm).collect();

    Ok(Histogram {
        bin_width: width,
        left_edges,
        midpoints,
        frequencies,
    })
}
