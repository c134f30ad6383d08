//! Input/output helpers.
//!
//! - column extraction + area conversion (`ingest`)
//! - Saltykov table export (`export`)
//! - two-step curve JSON read/write (`curve`)

pub mod curve;
pub mod export;
pub mod ingest;

pub use curve::*;
pub use export::*;
pub use ingest::*;
