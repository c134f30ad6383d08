//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed by value between the stereology, fit and report stages
//! - exported to CSV/JSON for the plotting collaborator
//! - reloaded later for comparisons

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Where the first histogram class starts.
///
/// `At(x)` fixes the left edge at a non-negative scalar (0 by default, which is
/// what the Saltykov routine and the two-step sweep use); `SampleMin` starts the
/// range at the smallest measured diameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeftEdge {
    At(f64),
    SampleMin,
}

impl Default for LeftEdge {
    fn default() -> Self {
        LeftEdge::At(0.0)
    }
}

impl FromStr for LeftEdge {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("min") {
            return Ok(LeftEdge::SampleMin);
        }
        s.parse::<f64>()
            .map(LeftEdge::At)
            .map_err(|_| format!("expected a non-negative number or 'min', got '{s}'"))
    }
}

impl fmt::Display for LeftEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeftEdge::At(x) => write!(f, "{x}"),
            LeftEdge::SampleMin => write!(f, "min"),
        }
    }
}

/// Equal-width, density-normalized histogram of diameters.
///
/// Invariant: `left_edges`, `midpoints` and `frequencies` all have `bin_count()`
/// entries and `Σ frequencies[i] * bin_width ≈ 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub bin_width: f64,
    pub left_edges: Vec<f64>,
    pub midpoints: Vec<f64>,
    pub frequencies: Vec<f64>,
}

impl Histogram {
    pub fn bin_count(&self) -> usize {
        self.frequencies.len()
    }

    /// All `bin_count() + 1` class boundaries, left to right.
    pub fn edges(&self) -> Vec<f64> {
        let mut edges = self.left_edges.clone();
        if let Some(&last) = self.left_edges.last() {
            edges.push(last + self.bin_width);
        }
        edges
    }

    /// `Σ frequencies[i] * bin_width` (1 for a well-formed density).
    pub fn integral(&self) -> f64 {
        self.frequencies.iter().sum::<f64>() * self.bin_width
    }
}

/// 3D-equivalent class frequencies produced by stereological unfolding.
///
/// `classes` has the same geometry as the input histogram. Negative artifacts
/// are clamped to zero before renormalization; the number of affected classes
/// and the density mass removed (in units of the input integral) are kept so
/// the clamping stays observable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnfoldedHistogram {
    pub classes: Histogram,
    pub clamped_classes: usize,
    pub clamped_mass: f64,
}

/// Volume-weighted cumulative distribution of an unfolded histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeCurve {
    pub midpoints: Vec<f64>,
    pub volume_per_class: Vec<f64>,
    /// Running volume sum normalized to 100 at the last class.
    pub cumulative_volume_pct: Vec<f64>,
}

/// Initial `(shape, scale)` for the lognormal fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LognormalGuess {
    /// MSD; must be > 1.
    pub shape: f64,
    /// Geometric mean (median); must be > 0.
    pub scale: f64,
}

impl Default for LognormalGuess {
    fn default() -> Self {
        Self {
            shape: 1.2,
            scale: 35.0,
        }
    }
}

/// Fitted lognormal parameters with one-sigma errors from the fit covariance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LognormalFit {
    pub shape: f64,
    pub scale: f64,
    pub shape_stderr: f64,
    pub scale_stderr: f64,
    /// Model evaluations spent by the solver.
    pub evaluations: usize,
}

/// Where diameters come from on the command line.
#[derive(Debug, Clone)]
pub struct InputConfig {
    pub path: PathBuf,
    pub column: String,
    /// Treat the column as sectional areas and convert them to ECD.
    pub areas: bool,
    /// Grain-boundary width added to each converted diameter.
    pub boundary_width: Option<f64>,
}

/// Configuration of a single Saltykov run.
#[derive(Debug, Clone)]
pub struct SaltykovConfig {
    pub num_bins: usize,
    pub left_edge: LeftEdge,
    /// Report the volume fraction occupied by grains up to this diameter.
    pub calc_vol: Option<f64>,
    pub export_table: Option<PathBuf>,
}

impl Default for SaltykovConfig {
    fn default() -> Self {
        Self {
            num_bins: 10,
            left_edge: LeftEdge::default(),
            calc_vol: None,
            export_table: None,
        }
    }
}

/// Configuration of the two-step (optimal resolution + lognormal) method.
#[derive(Debug, Clone)]
pub struct ShapeConfig {
    pub min_classes: usize,
    pub max_classes: usize,
    pub initial_guess: LognormalGuess,
    pub export_curve: Option<PathBuf>,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            min_classes: 10,
            max_classes: 20,
            initial_guess: LognormalGuess::default(),
            export_curve: None,
        }
    }
}

/// Dense evaluation grid with best-fit curve and uncertainty band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveGrid {
    pub diameters: Vec<f64>,
    pub best_fit: Vec<f64>,
    /// Per-point standard deviation across the four `(shape ± σ, scale ± σ)` curves.
    pub fit_error: Vec<f64>,
}

/// A saved two-step result (JSON), everything a plotting tool needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveFile {
    pub tool: String,
    pub num_classes: usize,
    pub fit: LognormalFit,
    pub midpoints: Vec<f64>,
    pub frequencies: Vec<f64>,
    pub grid: CurveGrid,
}

/// Scale on which apparent grain-size measures are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SizeScale {
    /// Diameters as measured.
    #[default]
    #[value(alias = "lin")]
    Linear,
    /// Natural logarithm of the diameters.
    Log,
    Log10,
    /// Square root of the diameters.
    Sqrt,
}

impl SizeScale {
    pub fn apply(self, d: f64) -> f64 {
        match self {
            SizeScale::Linear => d,
            SizeScale::Log => d.ln(),
            SizeScale::Log10 => d.log10(),
            SizeScale::Sqrt => d.sqrt(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SizeScale::Linear => "linear",
            SizeScale::Log => "ln",
            SizeScale::Log10 => "log10",
            SizeScale::Sqrt => "sqrt",
        }
    }
}

/// Kernel bandwidth rule for the frequency-peak estimate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bandwidth {
    #[default]
    Silverman,
    Scott,
    Fixed(f64),
}

impl FromStr for Bandwidth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("silverman") {
            return Ok(Bandwidth::Silverman);
        }
        if s.eq_ignore_ascii_case("scott") {
            return Ok(Bandwidth::Scott);
        }
        match s.parse::<f64>() {
            Ok(h) if h.is_finite() && h > 0.0 => Ok(Bandwidth::Fixed(h)),
            _ => Err(format!(
                "expected 'silverman', 'scott' or a positive number, got '{s}'"
            )),
        }
    }
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bandwidth::Silverman => write!(f, "silverman"),
            Bandwidth::Scott => write!(f, "scott"),
            Bandwidth::Fixed(h) => write!(f, "{h}"),
        }
    }
}

/// Configuration of the apparent grain-size summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsConfig {
    pub scale: SizeScale,
    pub bandwidth: Bandwidth,
}

/// One-dimensional measures of apparent grain size.
///
/// `mean`, `median`, `peak` and `bandwidth` are expressed on `scale`; the
/// area-weighted mean is always in linear units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApparentSize {
    pub scale: SizeScale,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Location of the maximum of a Gaussian kernel density estimate.
    pub peak: f64,
    pub bandwidth: f64,
    /// `Σ(Aᵢ·dᵢ)/ΣAᵢ`, when sectional areas are known.
    pub area_weighted_mean: Option<f64>,
}
