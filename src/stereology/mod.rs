//! Stereology: from apparent (2D) section diameters to 3D-equivalent classes.
//!
//! Responsibilities:
//!
//! - bin apparent diameters into a density histogram (`histogram`)
//! - unfold it with the Saltykov method (`saltykov`)
//! - integrate the unfolded classes into a volume curve (`volume`)
//! - summarize the apparent diameters themselves (`apparent`)

pub mod apparent;
pub mod histogram;
pub mod saltykov;
pub mod volume;

pub use apparent::*;
pub use histogram::*;
pub use saltykov::*;
pub use volume::*;
