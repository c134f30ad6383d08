//! Grids used by the two-step method.
//!
//! - the inclusive range of candidate class counts swept for the optimal resolution
//! - the dense diameter grid on which the fitted curve and its band are evaluated

use crate::error::{GrainError, Result};
use crate::math::linspace;

/// Number of points in the curve evaluation grid.
pub const CURVE_GRID_POINTS: usize = 1000;

/// Smallest diameter of the curve evaluation grid.
pub const CURVE_GRID_START: f64 = 0.1;

/// Candidate class counts `min..=max`, ascending.
pub fn class_counts(min: usize, max: usize) -> Result<Vec<usize>> {
    if min == 0 {
        return Err(GrainError::invalid("class range must start at 1 or more"));
    }
    if max < min {
        return Err(GrainError::invalid(format!(
            "invalid class range: ({min}, {max}) (max must be >= min)"
        )));
    }
    Ok((min..=max).collect())
}

/// Evaluation grid from `CURVE_GRID_START` to the largest measured diameter.
///
/// Samples whose largest diameter does not exceed `CURVE_GRID_START` (e.g.
/// measured in millimetres) start at `max_diameter / CURVE_GRID_POINTS`.
pub fn diameter_grid(max_diameter: f64) -> Result<Vec<f64>> {
    if !(max_diameter.is_finite() && max_diameter > 0.0) {
        return Err(GrainError::invalid(format!(
            "largest diameter must be finite and positive, got {max_diameter}"
        )));
    }
    let start = if max_diameter > CURVE_GRID_START {
        CURVE_GRID_START
    } else {
        max_diameter / CURVE_GRID_POINTS as f64
    };
    linspace(start, max_diameter, CURVE_GRID_POINTS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_counts_are_inclusive_and_ascending() {
        assert_eq!(class_counts(10, 15).unwrap(), vec![10, 11, 12, 13, 14, 15]);
        assert_eq!(class_counts(7, 7).unwrap(), vec![7]);
        assert!(class_counts(0, 4).is_err());
        assert!(class_counts(9, 8).is_err());
    }

    #[test]
    fn diameter_grid_starts_at_fixed_offset() {
        let g = diameter_grid(50.0).unwrap();
        assert_eq!(g.len(), CURVE_GRID_POINTS);
        assert!((g[0] - CURVE_GRID_START).abs() < 1e-12);
        assert!((g[g.len() - 1] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn diameter_grid_follows_small_samples() {
        let g = diameter_grid(0.05).unwrap();
        assert_eq!(g.len(), CURVE_GRID_POINTS);
        assert!((g[0] - 0.05 / CURVE_GRID_POINTS as f64).abs() < 1e-15);
        assert!((g[g.len() - 1] - 0.05).abs() < 1e-15);
        assert!(diameter_grid(0.0).is_err());
        assert!(diameter_grid(f64::NAN).is_err());
    }
}
