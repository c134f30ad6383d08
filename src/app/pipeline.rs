//! Shared pipelines behind the `gst` commands.
//!
//! Keeping this in one place avoids duplicating the core workflows:
//! - Saltykov: histogram -> unfold -> volume curve -> volume fraction
//! - shape: resolution sweep -> selection -> authoritative fit -> uncertainty band
//! - stats: apparent mean, median, frequency peak and area-weighted mean
//!
//! The CLI handlers can then focus on presentation and exports.

use tracing::info;

use crate::domain::{
    ApparentSize, Histogram, InputConfig, SaltykovConfig, ShapeConfig, StatsConfig,
    UnfoldedHistogram, VolumeCurve,
};
use crate::error::Result;
use crate::fit::{estimate_shape, ShapeEstimate};
use crate::io::{area_to_diameter, extract_column};
use crate::math::SolverOptions;
use crate::stereology::{
    apparent_stats, build_histogram, unfold, volume_curve, volume_fraction_up_to,
};

/// All computed outputs of a single Saltykov run.
#[derive(Debug, Clone)]
pub struct SaltykovOutput {
    pub sample_size: usize,
    pub histogram: Histogram,
    pub unfolded: UnfoldedHistogram,
    pub volume: VolumeCurve,
    pub calc_vol: Option<f64>,
    pub volume_fraction: Option<f64>,
}

/// Diameters read from a measurement file, with the sectional areas they
/// were converted from (if the column held areas).
#[derive(Debug, Clone)]
pub struct Measurements {
    pub diameters: Vec<f64>,
    pub areas: Option<Vec<f64>>,
}

/// Read the measurement column, keeping the areas when it holds them.
pub fn load_measurements(input: &InputConfig) -> Result<Measurements> {
    let values = extract_column(&input.path, &input.column)?;
    if input.areas {
        let diameters = area_to_diameter(&values, input.boundary_width)?;
        Ok(Measurements {
            diameters,
            areas: Some(values),
        })
    } else {
        Ok(Measurements {
            diameters: values,
            areas: None,
        })
    }
}

/// Read the measurement column and, for areas, convert to diameters.
pub fn load_diameters(input: &InputConfig) -> Result<Vec<f64>> {
    load_measurements(input).map(|m| m.diameters)
}

/// Apparent grain-size measures of the loaded sample.
pub fn run_stats(measurements: &Measurements, config: &StatsConfig) -> Result<ApparentSize> {
    let stats = apparent_stats(
        &measurements.diameters,
        measurements.areas.as_deref(),
        config,
    )?;
    info!(
        n = stats.count,
        mean = stats.mean,
        median = stats.median,
        peak = stats.peak,
        "apparent grain size done"
    );
    Ok(stats)
}

/// Execute the Saltykov pipeline.
pub fn run_saltykov(diameters: &[f64], config: &SaltykovConfig) -> Result<SaltykovOutput> {
    let histogram = build_histogram(diameters, config.num_bins, config.left_edge)?;
    let unfolded = unfold(&histogram)?;
    let volume = volume_curve(&unfolded.classes)?;
    let volume_fraction = config
        .calc_vol
        .map(|target| volume_fraction_up_to(&volume, target))
        .transpose()?;

    info!(
        n = diameters.len(),
        classes = histogram.bin_count(),
        bin_width = histogram.bin_width,
        clamped = unfolded.clamped_classes,
        "Saltykov unfolding done"
    );

    Ok(SaltykovOutput {
        sample_size: diameters.len(),
        histogram,
        unfolded,
        volume,
        calc_vol: config.calc_vol,
        volume_fraction,
    })
}

/// Execute the two-step pipeline with the default solver budget.
pub fn run_shape(diameters: &[f64], config: &ShapeConfig) -> Result<ShapeEstimate> {
    run_shape_with(diameters, config, &SolverOptions::default())
}

/// Execute the two-step pipeline with an explicit solver budget.
pub fn run_shape_with(
    diameters: &[f64],
    config: &ShapeConfig,
    opts: &SolverOptions,
) -> Result<ShapeEstimate> {
    let estimate = estimate_shape(
        diameters,
        config.min_classes,
        config.max_classes,
        config.initial_guess,
        opts,
    )?;
    info!(
        num_classes = estimate.num_classes,
        shape = estimate.fit.shape,
        scale = estimate.fit.scale,
        "two-step estimate done"
    );
    Ok(estimate)
}
