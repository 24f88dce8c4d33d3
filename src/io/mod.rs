//! Input/output helpers.
//!
//! - measurement-directory ingest + validation (`ingest`)
//! - aggregated results export (CSV) (`export`)
//! - fits JSON read/write (`curve`)

pub mod curve;
pub mod export;
pub mod ingest;

pub use curve::*;
pub use export::*;
pub use ingest::*;
