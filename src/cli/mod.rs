//! Command-line parsing for the grain-size tools.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! stereology/fitting code: flags are turned into plain config structs by
//! `app` before any numeric work happens.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{Bandwidth, LeftEdge, SizeScale};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "gst",
    version,
    about = "Grain size tools: Saltykov unfolding and two-step lognormal shape estimation"
)]
pub struct Cli {
    /// Log verbosity written to stderr (error, warn, info, debug, trace).
    #[arg(long, global = true, env = "GST_LOG_LEVEL", default_value = "warn")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Unfold apparent diameters with the Saltykov method and print the 3D classes.
    Saltykov(SaltykovArgs),
    /// Two-step method: optimal number of classes + lognormal fit of the unfolded population.
    Shape(ShapeArgs),
    /// Write a synthetic lognormal diameter sample to CSV.
    Synth(SynthArgs),
    /// Apparent grain size: mean, median, frequency peak and area-weighted mean.
    Stats(StatsArgs),
    /// Print a summary of a curve JSON written by `gst shape --export-curve`.
    Inspect(InspectArgs),
}

/// Where the measurements come from.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// Measurement file (.csv comma separated, .txt tab separated).
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Column holding the measurements.
    #[arg(short, long, default_value = "diameters")]
    pub column: String,

    /// The column holds sectional areas; convert them to equivalent circular diameters.
    #[arg(long)]
    pub areas: bool,

    /// Grain-boundary width added to each converted diameter (with --areas).
    #[arg(long, requires = "areas")]
    pub boundary_width: Option<f64>,
}

#[derive(Debug, Args, Clone)]
pub struct SaltykovArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Number of classes.
    #[arg(short = 'n', long, default_value_t = 10)]
    pub numbins: usize,

    /// Left edge of the first class: a non-negative number, or `min` for the sample minimum.
    #[arg(long, default_value_t = LeftEdge::default())]
    pub left_edge: LeftEdge,

    /// Report the volume fraction occupied by grains up to this diameter.
    #[arg(long, value_name = "DIAMETER")]
    pub calc_vol: Option<f64>,

    /// Export midpoints, 3D frequencies and cumulative volume (.csv or .txt).
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct ShapeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Smallest number of classes in the resolution sweep.
    #[arg(long, env = "GST_MIN_CLASSES", default_value_t = 10)]
    pub min_classes: usize,

    /// Largest number of classes in the resolution sweep (inclusive).
    #[arg(long, env = "GST_MAX_CLASSES", default_value_t = 20)]
    pub max_classes: usize,

    /// Initial MSD guess (> 1).
    #[arg(long, env = "GST_SHAPE_GUESS", default_value_t = 1.2)]
    pub shape_guess: f64,

    /// Initial geometric-mean guess (> 0).
    #[arg(long, env = "GST_SCALE_GUESS", default_value_t = 35.0)]
    pub scale_guess: f64,

    /// Export the fit, unfolded classes and uncertainty band to JSON.
    #[arg(long = "export-curve", value_name = "JSON")]
    pub export_curve: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct StatsArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Scale on which the measures are computed.
    #[arg(long, value_enum, default_value_t = SizeScale::Linear)]
    pub scale: SizeScale,

    /// KDE bandwidth: `silverman`, `scott`, or a positive number.
    #[arg(long, default_value_t = Bandwidth::Silverman)]
    pub bandwidth: Bandwidth,
}

#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    /// Number of diameters to draw.
    #[arg(short = 'n', long, default_value_t = 500)]
    pub count: usize,

    /// Multiplicative standard deviation (MSD) of the population.
    #[arg(long, default_value_t = 1.3)]
    pub shape: f64,

    /// Median (geometric mean) diameter.
    #[arg(long, default_value_t = 40.0)]
    pub median: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output CSV (single `diameters` column).
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,
}

/// Options for inspecting a saved curve.
#[derive(Debug, Args, Clone)]
pub struct InspectArgs {
    /// Curve JSON file produced by `gst shape --export-curve`.
    #[arg(long, value_name = "JSON")]
    pub curve: PathBuf,
}
