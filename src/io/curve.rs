//! Read/write two-step curve JSON files.
//!
//! Curve JSON is the "portable" representation of a two-step result:
//! - the chosen number of classes and fitted parameters (with errors)
//! - the unfolded class midpoints/frequencies at that resolution
//! - a precomputed grid with best fit and uncertainty band for plotting
//!
//! The schema is defined by `domain::CurveFile`.

use std::fs::File;
use std::path::Path;

use crate::domain::CurveFile;
use crate::error::Result;
use crate::fit::ShapeEstimate;

impl CurveFile {
    pub fn from_estimate(estimate: &ShapeEstimate) -> Self {
        CurveFile {
            tool: "gst".to_string(),
            num_classes: estimate.num_classes,
            fit: estimate.fit,
            midpoints: estimate.unfolded.classes.midpoints.clone(),
            frequencies: estimate.unfolded.classes.frequencies.clone(),
            grid: estimate.curve.clone(),
        }
    }
}

/// Write a curve JSON file.
pub fn write_curve_json(path: &Path, estimate: &ShapeEstimate) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &CurveFile::from_estimate(estimate))?;
    Ok(())
}

/// Read a curve JSON file.
pub fn read_curve_json(path: &Path) -> Result<CurveFile> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}
