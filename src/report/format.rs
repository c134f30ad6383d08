//! Plain-text summaries for the `gst` commands.

use crate::app::pipeline::SaltykovOutput;
use crate::domain::{ApparentSize, CurveFile};
use crate::fit::{CandidateOutcome, ShapeEstimate, SweepCandidate};

/// Multiplier applied to one-sigma errors in the printed summaries (≈99.7%).
pub const REPORT_SIGMA_FACTOR: f64 = 3.0;

/// Summary of a Saltykov run.
pub fn format_saltykov_summary(out: &SaltykovOutput) -> String {
    let classes = &out.unfolded.classes;
    let mut s = String::new();

    s.push_str("=== gst - Saltykov unfolding ===\n");
    s.push_str(&format!(
        "Sample: n={} | classes={} | bin size={:.2}\n",
        out.sample_size,
        classes.bin_count(),
        classes.bin_width
    ));
    if out.unfolded.clamped_classes > 0 {
        s.push_str(&format!(
            "Clamped classes: {} (removed density mass {:.4})\n",
            out.unfolded.clamped_classes, out.unfolded.clamped_mass
        ));
    }

    if let (Some(target), Some(volume)) = (out.calc_vol, out.volume_fraction) {
        if volume < 100.0 {
            s.push_str(&format!("Volume fraction (up to {target} microns) = {volume:.2} %\n"));
        } else {
            s.push_str(&format!("Volume fraction (up to {target} microns) = 100 %\n"));
        }
    }

    s.push('\n');
    s.push_str(&format!("{:>12} {:>12} {:>12}\n", "mid_point", "freq3D", "cum_vol%"));
    s.push_str(&format!("{:->12} {:->12} {:->12}\n", "", "", ""));
    for i in 0..classes.bin_count() {
        s.push_str(&format!(
            "{:>12.3} {:>12.4} {:>12.2}\n",
            classes.midpoints[i], classes.frequencies[i], out.volume.cumulative_volume_pct[i]
        ));
    }
    s
}

/// Apparent grain-size measures.
pub fn format_stats_summary(stats: &ApparentSize) -> String {
    let mut s = String::new();
    s.push_str("=== gst - apparent grain size ===\n");
    s.push_str(&format!(
        "Sample: n={} | scale={}\n",
        stats.count,
        stats.scale.label()
    ));
    s.push_str(&format!("Mean = {:.2}\n", stats.mean));
    s.push_str(&format!("Median = {:.2}\n", stats.median));
    s.push_str(&format!(
        "Frequency peak (KDE) = {:.2} (bandwidth {:.2})\n",
        stats.peak, stats.bandwidth
    ));
    if let Some(awm) = stats.area_weighted_mean {
        s.push_str(&format!("Area-weighted mean = {awm:.2}\n"));
    }
    s
}

/// Summary of a two-step run: optimal resolution, parameters, sweep table.
pub fn format_shape_summary(estimate: &ShapeEstimate) -> String {
    let fit = &estimate.fit;
    let mut s = String::new();

    s.push_str("=== gst - two-step lognormal shape ===\n");
    s.push_str("OPTIMAL VALUES\n");
    s.push_str(&format!("Number of classes: {}\n", estimate.num_classes));
    s.push_str(&format!(
        "MSD (shape) = {:.2} ± {:.2}\n",
        fit.shape,
        REPORT_SIGMA_FACTOR * fit.shape_stderr
    ));
    s.push_str(&format!(
        "Geometric mean (scale) = {:.2} ± {:.2}\n",
        fit.scale,
        REPORT_SIGMA_FACTOR * fit.scale_stderr
    ));
    if estimate.unfolded.clamped_classes > 0 {
        s.push_str(&format!(
            "Clamped classes at optimum: {}\n",
            estimate.unfolded.clamped_classes
        ));
    }

    s.push_str("\nResolution sweep:\n");
    s.push_str(&format_sweep(&estimate.candidates, Some(estimate.num_classes)));
    s
}

/// Sweep table; `chosen` marks the selected class count.
pub fn format_sweep(candidates: &[SweepCandidate], chosen: Option<usize>) -> String {
    let mut s = String::new();
    for c in candidates {
        let mark = if Some(c.num_classes) == chosen { "*" } else { " " };
        match &c.outcome {
            CandidateOutcome::Fitted(fit) => s.push_str(&format!(
                "{mark} classes={:<4} MSD={:.4} σ={:.6}\n",
                c.num_classes, fit.shape, fit.shape_stderr
            )),
            CandidateOutcome::Failed(reason) => s.push_str(&format!(
                "{mark} classes={:<4} (failed) {reason}\n",
                c.num_classes
            )),
        }
    }
    s
}

/// Summary of a saved curve file.
pub fn format_curve_file(curve: &CurveFile) -> String {
    let peak = curve
        .grid
        .diameters
        .iter()
        .zip(&curve.grid.best_fit)
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(d, _)| *d);

    let mut s = String::new();
    s.push_str(&format!("=== {} curve ===\n", curve.tool));
    s.push_str(&format!("Number of classes: {}\n", curve.num_classes));
    s.push_str(&format!(
        "MSD (shape) = {:.2} ± {:.2}\n",
        curve.fit.shape,
        REPORT_SIGMA_FACTOR * curve.fit.shape_stderr
    ));
    s.push_str(&format!(
        "Geometric mean (scale) = {:.2} ± {:.2}\n",
        curve.fit.scale,
        REPORT_SIGMA_FACTOR * curve.fit.scale_stderr
    ));
    s.push_str(&format!("Grid points: {}\n", curve.grid.diameters.len()));
    if let Some(peak) = peak {
        s.push_str(&format!("Fitted mode ≈ {peak:.2} microns\n"));
    }
    s
}
