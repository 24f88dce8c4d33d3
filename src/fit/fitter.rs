//! Low-level fitting of one model kind to one wavelength series.
//!
//! Given the aggregated (concentration, voltage) pairs we solve an ordinary
//! least squares problem over the model's polynomial design matrix and score
//! the result with the coefficient of determination, evaluated at the same
//! observed concentrations.

use nalgebra::{DMatrix, DVector};

use crate::domain::{CurveModel, FitQuality, FitResult, FitSkipReason, ModelKind, WavelengthSeries};
use crate::math::solve_least_squares;
use crate::models::{fill_design_row, predict};

/// Tolerance under which a sum of squares is treated as zero when computing R².
const SS_EPS: f64 = 1e-12;

/// Fit a single model kind to a series.
///
/// A series with fewer distinct concentrations than the model has coefficients
/// is underdetermined and reported as a skip, never solved.
pub fn fit_model(model: ModelKind, series: &WavelengthSeries) -> Result<FitResult, FitSkipReason> {
    let n = series.points.len();
    let p = model.coeff_len();
    if n < model.min_points() {
        return Err(FitSkipReason::InsufficientPoints { needed: p, got: n });
    }

    let mut x = DMatrix::<f64>::zeros(n, p);
    let mut y = DVector::<f64>::zeros(n);
    let mut row = vec![0.0; p];
    for (i, point) in series.points.iter().enumerate() {
        fill_design_row(model, point.concentration, &mut row);
        for (j, value) in row.iter().enumerate() {
            x[(i, j)] = *value;
        }
        y[i] = point.voltage;
    }

    let beta = solve_least_squares(&x, &y).ok_or(FitSkipReason::Singular)?;
    let coeffs: Vec<f64> = beta.iter().copied().collect();

    let fitted: Vec<f64> = series
        .points
        .iter()
        .map(|point| predict(model, point.concentration, &coeffs))
        .collect();
    let quality = fit_quality(&series.voltages(), &fitted);

    Ok(FitResult {
        model: CurveModel {
            name: model,
            display_name: model.display_name().to_string(),
            coeffs,
        },
        quality,
        fitted,
    })
}

/// SSE and R² of fitted values against observations.
///
/// When the observations have (numerically) zero variance the usual ratio is
/// undefined; we report 1.0 for a (numerically) exact fit and 0.0 otherwise,
/// matching the reference scorer.
pub fn fit_quality(observed: &[f64], fitted: &[f64]) -> FitQuality {
    debug_assert_eq!(observed.len(), fitted.len());

    let n = observed.len();
    let mean = observed.iter().sum::<f64>() / n as f64;

    let sse: f64 = observed
        .iter()
        .zip(fitted.iter())
        .map(|(y, f)| (y - f) * (y - f))
        .sum();
    let tss: f64 = observed.iter().map(|y| (y - mean) * (y - mean)).sum();

    let r2 = if tss <= SS_EPS {
        if sse <= SS_EPS { 1.0 } else { 0.0 }
    } else {
        1.0 - sse / tss
    };

    FitQuality { sse, r2, n }
}
