//! Two-parameter lognormal density at linear scale.
//!
//! ```text
//! f(d) = 1 / (d · ln(s) · sqrt(2π)) · exp(-(ln d - ln m)² / (2 ln(s)²))
//! ```
//!
//! with `s` the multiplicative standard deviation (MSD, shape, `> 1`) and `m` the
//! geometric mean (scale, `> 0`).
//!
//! The fitter relies on two primitive operations:
//! - evaluate `f(d)` (residuals, curves)
//! - evaluate `∂f/∂s` and `∂f/∂m` (Jacobian rows)

use std::f64::consts::PI;

/// Lognormal density at diameter `d`.
pub fn lognormal_density(d: f64, shape: f64, scale: f64) -> f64 {
    let sigma = shape.ln();
    let z = (d.ln() - scale.ln()) / sigma;
    (-0.5 * z * z).exp() / (d * sigma * (2.0 * PI).sqrt())
}

/// Partial derivatives `(∂f/∂shape, ∂f/∂scale)` at diameter `d`.
///
/// With `σ = ln s`, `μ = ln m` and `z = (ln d - μ)/σ`:
/// `∂f/∂σ = f (z² - 1)/σ` and `∂f/∂μ = f z/σ`; the chain rule adds `1/s` and `1/m`.
pub fn lognormal_gradient(d: f64, shape: f64, scale: f64) -> (f64, f64) {
    let sigma = shape.ln();
    let z = (d.ln() - scale.ln()) / sigma;
    let f = lognormal_density(d, shape, scale);
    (f * (z * z - 1.0) / (sigma * shape), f * z / (sigma * scale))
}

/// Evaluate the density over a grid of diameters.
pub fn lognormal_curve(grid: &[f64], shape: f64, scale: f64) -> Vec<f64> {
    grid.iter().map(|&d| lognormal_density(d, shape, scale)).collect()
}
