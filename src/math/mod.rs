//! Mathematical utilities: nonlinear least squares and evaluation grids.

pub mod grid;
pub mod optimizer;

pub use grid::*;
pub use optimizer::*;
