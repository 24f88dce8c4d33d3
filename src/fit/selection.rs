//! Per-wavelength model fitting and comparison.
//!
//! Each wavelength gets every requested model fitted independently; models
//! whose preconditions fail are recorded as typed skips rather than errors.
//! The wavelength as a whole fails only when *no* model could be fitted, and
//! that failure never propagates to sibling wavelengths.

use crate::domain::{
    AnalysisConfig, CurveGrid, FitResult, ModelKind, ModelSpec, WavelengthFailure, WavelengthFit,
    WavelengthSeries,
};
use crate::fit::fitter::fit_model;
use crate::models::predict;

/// Parsimony margin for the model comparison: the quadratic model must improve
/// R² by more than this to be preferred over the linear model.
pub const MIN_R2_GAIN: f64 = 0.01;

/// Fit the requested models to one wavelength series and compare them.
pub fn fit_series(
    series: &WavelengthSeries,
    config: &AnalysisConfig,
) -> Result<WavelengthFit, WavelengthFailure> {
    let model_kinds: Vec<ModelKind> = match config.model_spec {
        ModelSpec::Linear => vec![ModelKind::Linear],
        ModelSpec::Quadratic => vec![ModelKind::Quadratic],
        ModelSpec::Both => vec![ModelKind::Linear, ModelKind::Quadratic],
    };

    let mut fits = Vec::new();
    let mut skipped = Vec::new();
    for kind in model_kinds {
        match fit_model(kind, series) {
            Ok(fit) => fits.push(fit),
            Err(reason) => skipped.push((kind, reason)),
        }
    }

    if fits.is_empty() {
        return Err(WavelengthFailure {
            wavelength: series.wavelength,
            skipped,
        });
    }

    let preferred = select_preferred(&fits);
    let smooth = fits
        .iter()
        .find(|f| f.model.name == ModelKind::Quadratic)
        .map(|f| smooth_grid(f, series, config.grid_points));

    Ok(WavelengthFit {
        series: series.clone(),
        fits,
        skipped,
        preferred,
        smooth,
    })
}

/// Pick the preferred model: highest R², with ties (within `MIN_R2_GAIN`)
/// resolved toward the simpler model.
///
/// We iterate in order of increasing complexity and pick the first fit that is
/// close enough to the best score.
fn select_preferred(fits: &[FitResult]) -> ModelKind {
    let mut best = &fits[0];
    for f in &fits[1..] {
        if f.quality.r2 > best.quality.r2 {
            best = f;
        }
    }
    let best_r2 = best.quality.r2;

    let order = [ModelKind::Linear, ModelKind::Quadratic];
    for kind in order {
        if let Some(f) = fits.iter().find(|f| f.model.name == kind) {
            if f.quality.r2 >= best_r2 - MIN_R2_GAIN {
                return kind;
            }
        }
    }

    best.model.name
}

/// Evaluate a fit on a dense, evenly spaced concentration range spanning the
/// observed series, for rendering a smooth curve.
pub fn smooth_grid(fit: &FitResult, series: &WavelengthSeries, points: usize) -> CurveGrid {
    let n = points.max(2);
    let mut c0 = f64::INFINITY;
    let mut c1 = f64::NEG_INFINITY;
    for point in &series.points {
        c0 = c0.min(point.concentration);
        c1 = c1.max(point.concentration);
    }

    let mut concentration = Vec::with_capacity(n);
    let mut voltage = Vec::with_capacity(n);
    for i in 0..n {
        let u = i as f64 / (n as f64 - 1.0);
        let c = c0 + u * (c1 - c0);
        concentration.push(c);
        voltage.push(predict(fit.model.name, c, &fit.model.coeffs));
    }

    CurveGrid {
        concentration,
        voltage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitSkipReason, SeriesPoint};
    use std::path::PathBuf;

    fn base_config() -> AnalysisConfig {
        AnalysisConfig {
            data_dir: PathBuf::from("data"),
            out_dir: PathBuf::from("out"),
            prefix: "sensor".to_string(),
            replicate_cap: 150,
            grid_points: 500,
            model_spec: ModelSpec::Both,
            plot: false,
            plot_width: 1000,
            plot_height: 600,
            export_results: None,
            export_fits: None,
        }
    }

    fn series_of(pairs: &[(f64, f64)]) -> WavelengthSeries {
        WavelengthSeries {
            wavelength: 1550.0,
            points: pairs
                .iter()
                .map(|&(concentration, voltage)| SeriesPoint {
                    concentration,
                    voltage,
                    raw: 1,
                    kept: 1,
                })
                .collect(),
        }
    }

    #[test]
    fn linear_preferred_when_scores_tie() {
        // Exact line: both models reach R² = 1, the simpler one wins.
        let series = series_of(&[(0.0, 5.0), (10.0, 15.0), (20.0, 25.0)]);
        let fit = fit_series(&series, &base_config()).unwrap();

        assert_eq!(fit.preferred, ModelKind::Linear);
        assert_eq!(fit.fits.len(), 2);
        assert!(fit.skipped.is_empty());
        assert!(fit.smooth.is_some());
    }

    #[test]
    fn quadratic_preferred_on_curved_data() {
        let series = series_of(&[(0.0, 0.0), (10.0, 100.0), (20.0, 400.0), (30.0, 900.0)]);
        let fit = fit_series(&series, &base_config()).unwrap();

        assert_eq!(fit.preferred, ModelKind::Quadratic);
        let lin = fit.fit(ModelKind::Linear).unwrap();
        let quad = fit.fit(ModelKind::Quadratic).unwrap();
        assert!(quad.quality.r2 > lin.quality.r2 + MIN_R2_GAIN);
    }

    #[test]
    fn single_concentration_fails_the_wavelength_with_typed_reasons() {
        let series = series_of(&[(40.0, 12.0)]);
        let failure = fit_series(&series, &base_config()).unwrap_err();

        assert_eq!(failure.wavelength, 1550.0);
        assert_eq!(
            failure.skipped,
            vec![
                (
                    ModelKind::Linear,
                    FitSkipReason::InsufficientPoints { needed: 2, got: 1 }
                ),
                (
                    ModelKind::Quadratic,
                    FitSkipReason::InsufficientPoints { needed: 3, got: 1 }
                ),
            ]
        );
    }

    #[test]
    fn two_concentrations_fit_linear_only() {
        let series = series_of(&[(0.0, 1.0), (40.0, 9.0)]);
        let fit = fit_series(&series, &base_config()).unwrap();

        assert_eq!(fit.preferred, ModelKind::Linear);
        assert!(fit.fit(ModelKind::Quadratic).is_none());
        assert!(fit.smooth.is_none());
        assert_eq!(
            fit.skipped,
            vec![(
                ModelKind::Quadratic,
                FitSkipReason::InsufficientPoints { needed: 3, got: 2 }
            )]
        );
    }

    #[test]
    fn model_spec_restricts_attempted_models() {
        let series = series_of(&[(0.0, 5.0), (10.0, 15.0), (20.0, 25.0)]);
        let mut config = base_config();
        config.model_spec = ModelSpec::Linear;
        let fit = fit_series(&series, &config).unwrap();

        assert_eq!(fit.fits.len(), 1);
        assert_eq!(fit.fits[0].model.name, ModelKind::Linear);
        assert!(fit.smooth.is_none());
    }

    #[test]
    fn smooth_grid_spans_the_observed_range() {
        let series = series_of(&[(0.0, 0.0), (10.0, 100.0), (20.0, 400.0), (5.0, 25.0)]);
        let fit = fit_series(&series, &base_config()).unwrap();
        let grid = fit.smooth.as_ref().unwrap();

        assert_eq!(grid.concentration.len(), 500);
        assert!((grid.concentration[0] - 0.0).abs() < 1e-12);
        assert!((grid.concentration[499] - 20.0).abs() < 1e-12);
        let quad = fit.fit(ModelKind::Quadratic).unwrap();
        let mid = grid.concentration[250];
        assert!(
            (grid.voltage[250] - predict(ModelKind::Quadratic, mid, &quad.model.coeffs)).abs()
                < 1e-12
        );
    }
}
