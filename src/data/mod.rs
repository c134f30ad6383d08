//! Synthetic grain populations for demos and tests.

pub mod sample;

pub use sample::*;
