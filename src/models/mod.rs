//! Grain-size distribution models.
//!
//! Models are implemented as small, pure functions so that fitting/search code can
//! stay generic.

pub mod lognormal;

pub use lognormal::*;
