//! Evenly spaced evaluation grids.

use crate::error::{GrainError, Result};

/// Generate `steps` evenly spaced points between `start` and `stop` (inclusive).
pub fn linspace(start: f64, stop: f64, steps: usize) -> Result<Vec<f64>> {
    if !(start.is_finite() && stop.is_finite() && stop > start) {
        return Err(GrainError::invalid(format!(
            "invalid grid range: start={start}, stop={stop} (must be finite and stop>start)"
        )));
    }
    if steps < 2 {
        return Err(GrainError::invalid("grid needs at least 2 points"));
    }

    let step = (stop - start) / (steps as f64 - 1.0);
    Ok((0..steps).map(|i| start + step * i as f64).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_includes_endpoints() {
        let v = linspace(0.1, 50.0, 1000).unwrap();
        assert_eq!(v.len(), 1000);
        assert!((v[0] - 0.1).abs() < 1e-12);
        assert!((v[v.len() - 1] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn linspace_rejects_empty_ranges() {
        assert!(linspace(1.0, 1.0, 10).is_err());
        assert!(linspace(0.0, 1.0, 1).is_err());
        assert!(linspace(0.0, f64::NAN, 10).is_err());
    }
}
