//! Model evaluation for the linear and quadratic calibration fits.
//!
//! The fitter relies on two primitive operations:
//! - build a design row for a given concentration (for OLS)
//! - predict voltage(c) given coefficients (for residuals/plots)
//!
//! Both models are plain polynomials in concentration; coefficients are stored
//! intercept first, so the quadratic reads `voltage = β0 + β1·c + β2·c²`.

use crate::domain::ModelKind;

/// Fill a design row for the given model kind.
///
/// The row includes the constant term first (intercept).
///
/// # Panics
/// Panics if `out` does not have length `model.coeff_len()`. Callers should
/// size the array correctly.
pub fn fill_design_row(model: ModelKind, c: f64, out: &mut [f64]) {
    match model {
        ModelKind::Linear => {
            out[0] = 1.0;
            out[1] = c;
        }
        ModelKind::Quadratic => {
            out[0] = 1.0;
            out[1] = c;
            out[2] = c * c;
        }
    }
}

/// Predict `voltage(c)` for the given model kind.
pub fn predict(model: ModelKind, c: f64, coeffs: &[f64]) -> f64 {
    match model {
        ModelKind::Linear => coeffs[0] + coeffs[1] * c,
        ModelKind::Quadratic => coeffs[0] + coeffs[1] * c + coeffs[2] * c * c,
    }
}
