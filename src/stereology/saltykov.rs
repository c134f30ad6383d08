//! Scheil–Schwartz–Saltykov unfolding.
//!
//! A sphere of diameter `D` cut by a random plane produces a section whose
//! diameter falls in `[d1, d2)` with probability (Wicksell)
//!
//! ```text
//! P(D; d1, d2) = (sqrt(R² - r1²) - sqrt(R² - r2²)) / R,    R = D/2, r = d/2
//! ```
//!
//! Unfolding walks the classes from the coarsest down: whatever is observed in
//! class `i` must come from spheres of class `i`, and those spheres also leak
//! sections into every smaller class. Their predicted contribution is removed
//! before the next (smaller) class is resolved.
//!
//! References: Saltykov (1967); Sahagian and Proussevitch (1998).

use tracing::{debug, warn};

use crate::domain::{Histogram, UnfoldedHistogram};
use crate::error::{GrainError, Result};

/// Probability that a sphere of diameter `sphere_d` is sectioned with an
/// apparent diameter between `d1` and `d2` (`d1 < d2 <= sphere_d`).
pub fn wicksell_probability(sphere_d: f64, d1: f64, d2: f64) -> f64 {
    let r = sphere_d / 2.0;
    let (r1, r2) = (d1 / 2.0, d2 / 2.0);
    ((r * r - r1 * r1).max(0.0).sqrt() - (r * r - r2 * r2).max(0.0).sqrt()) / r
}

/// Geometric unfolding coefficients for one histogram layout.
///
/// `diagonal[i]` is the probability that spheres sized at the upper edge of
/// class `i` appear in class `i` itself; `leak[i][k]` (`k < i`) is the
/// probability that spheres sized at the midpoint of class `i` appear in
/// class `k`. The coefficients depend only on the class geometry, never on the
/// measured frequencies, and are scale-free: with the left edge at 0 they are
/// a function of the bin count alone.
#[derive(Debug, Clone, PartialEq)]
pub struct UnfoldingMatrix {
    diagonal: Vec<f64>,
    leak: Vec<Vec<f64>>,
}

impl UnfoldingMatrix {
    pub fn new(edges: &[f64], midpoints: &[f64]) -> Result<Self> {
        let n = midpoints.len();
        if n == 0 || edges.len() != n + 1 {
            return Err(GrainError::invalid(format!(
                "unfolding needs n+1 edges for n classes (got {} edges, {} classes)",
                edges.len(),
                n
            )));
        }

        let diagonal: Vec<f64> = (0..n)
            .map(|i| wicksell_probability(edges[i + 1], edges[i], edges[i + 1]))
            .collect();
        let leak = (0..n)
            .map(|i| {
                (0..i)
                    .map(|k| wicksell_probability(midpoints[i], edges[k], edges[k + 1]))
                    .collect()
            })
            .collect();

        Ok(Self { diagonal, leak })
    }

    pub fn for_histogram(hist: &Histogram) -> Result<Self> {
        Self::new(&hist.edges(), &hist.midpoints)
    }

    pub fn class_count(&self) -> usize {
        self.diagonal.len()
    }

    /// Self-probability of class `i`, `None` past the last class.
    pub fn diagonal(&self, i: usize) -> Option<f64> {
        self.diagonal.get(i).copied()
    }

    /// Leak from class `from` into the smaller class `into`; `None` unless `into < from`.
    pub fn leak(&self, from: usize, into: usize) -> Option<f64> {
        self.leak.get(from)?.get(into).copied()
    }
}

/// Unfold a 2D apparent-diameter histogram into 3D-equivalent class densities.
pub fn unfold(hist: &Histogram) -> Result<UnfoldedHistogram> {
    let matrix = UnfoldingMatrix::for_histogram(hist)?;
    unfold_with(hist, &matrix)
}

/// Same as [`unfold`] with a precomputed coefficient matrix.
pub fn unfold_with(hist: &Histogram, matrix: &UnfoldingMatrix) -> Result<UnfoldedHistogram> {
    let n = hist.bin_count();
    if matrix.class_count() != n {
        return Err(GrainError::invalid(format!(
            "unfolding matrix has {} classes, histogram has {n}",
            matrix.class_count()
        )));
    }

    let mut freq = hist.frequencies.clone();
    for i in (1..n).rev() {
        // Empty (or already over-subtracted) classes contribute nothing below.
        if freq[i] <= 0.0 {
            continue;
        }
        let spheres = freq[i] / matrix.diagonal[i];
        for (k, leak) in matrix.leak[i].iter().enumerate().rev() {
            freq[k] -= leak * spheres;
        }
    }

    let mut clamped_classes = 0usize;
    let mut clamped_density = 0.0;
    for f in freq.iter_mut() {
        if *f < 0.0 {
            clamped_classes += 1;
            clamped_density -= *f;
            *f = 0.0;
        }
    }
    let clamped_mass = clamped_density * hist.bin_width;
    if clamped_classes > 0 {
        warn!(
            classes = n,
            clamped_classes,
            clamped_mass,
            "unfolding produced negative class frequencies; clamped to zero"
        );
    }

    let total: f64 = freq.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(GrainError::degenerate(
            "unfolded distribution has no positive mass",
        ));
    }
    let norm = total * hist.bin_width;
    let frequencies: Vec<f64> = freq.iter().map(|f| f / norm).collect();
    debug!(classes = n, clamped_classes, "unfolded histogram");

    Ok(UnfoldedHistogram {
        classes: Histogram {
            bin_width: hist.bin_width,
            left_edges: hist.left_edges.clone(),
            midpoints: hist.midpoints.clone(),
            frequencies,
        },
        clamped_classes,
        clamped_mass,
    })
}
