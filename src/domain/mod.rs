//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw and aggregated observation types (`Observation`, `WavelengthSeries`)
//! - fit outputs (`FitResult`, `CurveModel`, `WavelengthFit`, etc.)
//! - typed per-group / per-wavelength diagnostics (`RunDiagnostics`)

pub mod types;

pub use types::*;
