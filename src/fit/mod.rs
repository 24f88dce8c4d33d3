//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - fit a single model kind to an aggregated wavelength series (`fitter`)
//! - fit both models, compare R², and build the smooth rendering grid
//!   (`selection`)

pub mod fitter;
pub mod selection;

pub use fitter::*;
pub use selection::*;
