//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - histogram geometry and unfolding outputs (`Histogram`, `UnfoldedHistogram`, `VolumeCurve`)
//! - lognormal fit inputs/outputs (`LognormalGuess`, `LognormalFit`)
//! - run configuration (`InputConfig`, `SaltykovConfig`, `ShapeConfig`)
//! - apparent grain-size measures (`SizeScale`, `Bandwidth`, `StatsConfig`, `ApparentSize`)
//! - the exported curve schema (`CurveFile`)

pub mod types;

pub use types::*;
