//! Two-step shape estimation.
//!
//! Responsibilities:
//!
//! - fit a lognormal density to one unfolded histogram (`fitter`)
//! - sweep candidate class counts in parallel and pick the optimal one (`selection`)
//! - provide the class-count and diameter grids (`class_grid`)

pub mod class_grid;
pub mod fitter;
pub mod selection;

pub use class_grid::*;
pub use fitter::*;
pub use selection::*;
