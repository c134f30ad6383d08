//! One-dimensional measures of apparent grain size.
//!
//! Number-weighted measures (mean, median, frequency peak) are computed on the
//! requested [`SizeScale`](crate::domain::SizeScale); the area-weighted mean
//! needs the sectional areas and is always reported in linear units.

use statrs::distribution::{Continuous, Normal};
use statrs::statistics::{Data, Median, Statistics};
use tracing::debug;

use crate::domain::{ApparentSize, Bandwidth, StatsConfig};
use crate::error::{GrainError, Result};
use crate::math::linspace;

/// Points at which the kernel density estimate is evaluated to find its peak.
pub const KDE_GRID_POINTS: usize = 2048;

/// Compute mean, median, frequency peak and (with areas) area-weighted mean.
pub fn apparent_stats(
    diameters: &[f64],
    areas: Option<&[f64]>,
    config: &StatsConfig,
) -> Result<ApparentSize> {
    validate_diameters(diameters)?;
    let values: Vec<f64> = diameters.iter().map(|&d| config.scale.apply(d)).collect();

    let mean = values.iter().mean();
    let median = Data::new(values.clone()).median();
    let bandwidth = kde_bandwidth(&values, config.bandwidth)?;
    let peak = kde_peak(&values, bandwidth)?;
    let area_weighted_mean = areas
        .map(|areas| area_weighted_mean(diameters, areas))
        .transpose()?;

    debug!(
        n = values.len(),
        scale = config.scale.label(),
        bandwidth,
        peak,
        "apparent grain size"
    );

    Ok(ApparentSize {
        scale: config.scale,
        count: values.len(),
        mean,
        median,
        peak,
        bandwidth,
        area_weighted_mean,
    })
}

/// `Σ(Aᵢ·dᵢ)/ΣAᵢ`.
pub fn area_weighted_mean(diameters: &[f64], areas: &[f64]) -> Result<f64> {
    if diameters.len() != areas.len() {
        return Err(GrainError::invalid(format!(
            "{} diameters but {} areas",
            diameters.len(),
            areas.len()
        )));
    }
    if areas.iter().any(|a| !a.is_finite() || *a < 0.0) {
        return Err(GrainError::invalid("areas must be finite and non-negative"));
    }
    let total: f64 = areas.iter().sum();
    if total <= 0.0 {
        return Err(GrainError::degenerate("sectional areas sum to zero"));
    }
    let weighted: f64 = diameters.iter().zip(areas).map(|(d, a)| d * a).sum();
    Ok(weighted / total)
}

/// Gaussian kernel bandwidth for `values`.
///
/// Silverman: `s·(3n/4)^(-1/5)`, Scott: `s·n^(-1/5)`, with `s` the sample
/// standard deviation.
pub fn kde_bandwidth(values: &[f64], rule: Bandwidth) -> Result<f64> {
    let n = values.len() as f64;
    let factor = match rule {
        Bandwidth::Fixed(h) => {
            if !(h.is_finite() && h > 0.0) {
                return Err(GrainError::invalid(format!("bandwidth must be > 0, got {h}")));
            }
            return Ok(h);
        }
        Bandwidth::Silverman => (0.75 * n).powf(-0.2),
        Bandwidth::Scott => n.powf(-0.2),
    };
    if values.len() < 2 {
        return Err(GrainError::degenerate(
            "at least two measurements are needed to estimate a bandwidth",
        ));
    }
    let std_dev = values.iter().std_dev();
    if !(std_dev.is_finite() && std_dev > 0.0) {
        return Err(GrainError::degenerate(
            "measurements have no spread; pass a fixed bandwidth",
        ));
    }
    Ok(std_dev * factor)
}

/// Location of the maximum of the Gaussian KDE, searched over
/// [`KDE_GRID_POINTS`] points between the smallest and largest value.
pub fn kde_peak(values: &[f64], bandwidth: f64) -> Result<f64> {
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(lo.is_finite() && hi.is_finite()) {
        return Err(GrainError::invalid("values must be finite"));
    }
    if lo == hi {
        return Ok(lo);
    }

    let kernel = Normal::new(0.0, 1.0).map_err(|e| GrainError::invalid(e.to_string()))?;
    let density = |x: f64| -> f64 {
        values
            .iter()
            .map(|v| kernel.pdf((x - v) / bandwidth))
            .sum::<f64>()
    };

    let mut best = (lo, f64::NEG_INFINITY);
    for x in linspace(lo, hi, KDE_GRID_POINTS)? {
        let f = density(x);
        if f > best.1 {
            best = (x, f);
        }
    }
    Ok(best.0)
}

fn validate_diameters(diameters: &[f64]) -> Result<()> {
    if diameters.is_empty() {
        return Err(GrainError::degenerate("no diameters to summarize"));
    }
    if let Some(bad) = diameters.iter().find(|d| !(d.is_finite() && **d > 0.0)) {
        return Err(GrainError::invalid(format!(
            "diameters must be finite and positive, got {bad}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SizeScale;

    const SYMMETRIC: [f64; 8] = [8.0, 9.0, 9.5, 10.0, 10.0, 10.5, 11.0, 12.0];

    #[test]
    fn linear_mean_and_median() {
        let stats = apparent_stats(&[1.0, 2.0, 3.0, 4.0], None, &StatsConfig::default()).unwrap();
        assert_eq!(stats.count, 4);
        assert!((stats.mean - 2.5).abs() < 1e-12);
        assert!((stats.median - 2.5).abs() < 1e-12);
        assert!(stats.area_weighted_mean.is_none());
    }

    #[test]
    fn log_scale_is_applied_before_averaging() {
        let d: Vec<f64> = [1.0f64, 2.0, 3.0].iter().map(|x| x.exp()).collect();
        let config = StatsConfig {
            scale: SizeScale::Log,
            ..StatsConfig::default()
        };
        let stats = apparent_stats(&d, None, &config).unwrap();
        assert!((stats.mean - 2.0).abs() < 1e-12);
        assert!((stats.median - 2.0).abs() < 1e-12);
        assert_eq!(stats.scale, SizeScale::Log);
    }

    #[test]
    fn area_weighted_mean_favours_large_sections() {
        let awm = area_weighted_mean(&[1.0, 2.0], &[1.0, 3.0]).unwrap();
        assert!((awm - 1.75).abs() < 1e-12);

        let stats =
            apparent_stats(&[1.0, 2.0], Some(&[1.0, 3.0][..]), &StatsConfig::default()).unwrap();
        assert_eq!(stats.area_weighted_mean, Some(awm));
    }

    #[test]
    fn area_weighted_mean_rejects_mismatched_lengths() {
        let err = area_weighted_mean(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert!(matches!(err, GrainError::InvalidArgument(_)));
        let err = area_weighted_mean(&[1.0], &[0.0]).unwrap_err();
        assert!(matches!(err, GrainError::DegenerateInput(_)));
    }

    #[test]
    fn bandwidth_rules() {
        let s = SYMMETRIC.iter().std_dev();
        let n = SYMMETRIC.len() as f64;
        let silverman = kde_bandwidth(&SYMMETRIC, Bandwidth::Silverman).unwrap();
        let scott = kde_bandwidth(&SYMMETRIC, Bandwidth::Scott).unwrap();
        assert!((silverman - s * (0.75 * n).powf(-0.2)).abs() < 1e-12);
        assert!((scott - s * n.powf(-0.2)).abs() < 1e-12);
        assert!(silverman > scott);
        assert_eq!(kde_bandwidth(&SYMMETRIC, Bandwidth::Fixed(0.5)).unwrap(), 0.5);
    }

    #[test]
    fn identical_values_need_a_fixed_bandwidth() {
        let same = [3.0; 5];
        let err = kde_bandwidth(&same, Bandwidth::Silverman).unwrap_err();
        assert!(matches!(err, GrainError::DegenerateInput(_)));

        let config = StatsConfig {
            bandwidth: Bandwidth::Fixed(0.1),
            ..StatsConfig::default()
        };
        let stats = apparent_stats(&same, None, &config).unwrap();
        assert_eq!(stats.peak, 3.0);
    }

    #[test]
    fn peak_of_symmetric_sample_is_its_centre() {
        let stats = apparent_stats(&SYMMETRIC, None, &StatsConfig::default()).unwrap();
        assert!((stats.peak - 10.0).abs() < 0.01, "peak = {}", stats.peak);
    }

    #[test]
    fn peak_follows_the_dense_cluster() {
        let mut d = vec![5.0, 5.1, 5.2, 4.9, 5.05, 4.95];
        d.extend([20.0, 30.0]);
        let config = StatsConfig {
            bandwidth: Bandwidth::Fixed(0.5),
            ..StatsConfig::default()
        };
        let stats = apparent_stats(&d, None, &config).unwrap();
        assert!((stats.peak - 5.0).abs() < 0.2, "peak = {}", stats.peak);
        assert!(stats.mean > stats.peak);
    }

    #[test]
    fn rejects_empty_and_non_positive_diameters() {
        let err = apparent_stats(&[], None, &StatsConfig::default()).unwrap_err();
        assert!(matches!(err, GrainError::DegenerateInput(_)));
        let err = apparent_stats(&[1.0, 0.0], None, &StatsConfig::default()).unwrap_err();
        assert!(matches!(err, GrainError::InvalidArgument(_)));
    }
}
