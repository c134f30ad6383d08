//! Volume-weighted cumulative distribution of unfolded grain sizes.
//!
//! Each class contributes `width · (4/3)·π·mid³ · f3D` of volume. The running
//! sum is normalized to 100 at the last class.

use std::f64::consts::PI;

use crate::domain::{Histogram, VolumeCurve};
use crate::error::{GrainError, Result};

/// Build the cumulative volume curve for 3D-equivalent class frequencies.
pub fn volume_curve(unfolded: &Histogram) -> Result<VolumeCurve> {
    if unfolded.bin_count() == 0 {
        return Err(GrainError::degenerate("no classes to integrate"));
    }
    if let Some(f) = unfolded.frequencies.iter().find(|f| !(f.is_finite() && **f >= 0.0)) {
        return Err(GrainError::invalid(format!(
            "volume curve needs non-negative class frequencies, got {f}"
        )));
    }

    let volume_per_class: Vec<f64> = unfolded
        .midpoints
        .iter()
        .zip(&unfolded.frequencies)
        .map(|(&mid, &f)| unfolded.bin_width * (4.0 / 3.0) * PI * mid.powi(3) * f)
        .collect();

    let mut running = 0.0;
    let cumulative: Vec<f64> = volume_per_class
        .iter()
        .map(|v| {
            running += v;
            running
        })
        .collect();

    let total = running;
    if !(total.is_finite() && total > 0.0) {
        return Err(GrainError::degenerate("unfolded distribution has zero volume"));
    }

    Ok(VolumeCurve {
        midpoints: unfolded.midpoints.clone(),
        volume_per_class,
        cumulative_volume_pct: cumulative.iter().map(|c| 100.0 * c / total).collect(),
    })
}

/// Cumulative volume percentage occupied by grains up to `target` diameter.
///
/// The target is bracketed by the first midpoint strictly greater than it and
/// its predecessor, and interpolated along the local slope. Targets at or past
/// the last midpoint (or interpolating past 100) report 100.
pub fn volume_fraction_up_to(curve: &VolumeCurve, target: f64) -> Result<f64> {
    let x = &curve.midpoints;
    let y = &curve.cumulative_volume_pct;
    if x.is_empty() || x.len() != y.len() {
        return Err(GrainError::degenerate("volume curve is empty or malformed"));
    }
    if !target.is_finite() {
        return Err(GrainError::invalid(format!("volume target must be finite, got {target}")));
    }
    if target < x[0] {
        return Err(GrainError::invalid(format!(
            "volume target {target} is below the smallest class midpoint {:.3}",
            x[0]
        )));
    }

    let Some(idx) = x.iter().position(|&m| m > target) else {
        return Ok(100.0);
    };

    let angle = ((y[idx] - y[idx - 1]) / (x[idx] - x[idx - 1])).atan();
    let volume = y[idx - 1] + angle.tan() * (target - x[idx - 1]);
    Ok(volume.min(100.0))
}
