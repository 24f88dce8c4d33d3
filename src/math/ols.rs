//! Least squares solver.
//!
//! Both calibration models are linear in their coefficients, so each fit is a
//! single ordinary least squares solve over a polynomial design matrix:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! Implementation choices:
//! - We use SVD to solve the least-squares problem robustly even when the
//!   design matrix is tall (more rows than columns).
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - Concentration values can span a couple of decades, so the quadratic
//!   column can dwarf the intercept column; SVD with a relaxed tolerance
//!   handles the resulting spread in singular values.
//! - Parameter dimension is tiny (2–3 columns), so SVD performance is a
//!   non-issue at this scale.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_line() {
        // Fit y = 5 + x on x = [0, 10, 20]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 10.0, 1.0, 20.0]);
        let y = DVector::from_row_slice(&[5.0, 15.0, 25.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 5.0).abs() < 1e-10);
        assert!((beta[1] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn least_squares_solves_overdetermined_parabola() {
        // y = 2 + 0.5 c + 0.25 c^2 sampled at five concentrations.
        let cs = [0.0, 5.0, 10.0, 20.0, 40.0];
        let mut rows = Vec::with_capacity(cs.len() * 3);
        let mut ys = Vec::with_capacity(cs.len());
        for &c in &cs {
            rows.extend_from_slice(&[1.0, c, c * c]);
            ys.push(2.0 + 0.5 * c + 0.25 * c * c);
        }
        let x = DMatrix::from_row_slice(cs.len(), 3, &rows);
        let y = DVector::from_row_slice(&ys);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-8);
        assert!((beta[1] - 0.5).abs() < 1e-8);
        assert!((beta[2] - 0.25).abs() < 1e-8);
    }
}
