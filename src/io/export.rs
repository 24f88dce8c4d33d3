//! Export aggregated points and fitted values to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream
//! scripts: one row per (wavelength, concentration) point, with the
//! per-model fitted voltages and scores alongside the observed aggregate.

use std::path::Path;

use crate::domain::{ModelKind, WavelengthFit};
use crate::error::{AppError, EXIT_USAGE};

/// Write per-point results for all fitted wavelengths to a CSV file.
pub fn write_results_csv(path: &Path, fits: &[WavelengthFit]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| {
        AppError::new(
            EXIT_USAGE,
            format!("Failed to create export CSV '{}': {e}", path.display()),
        )
    })?;

    writer
        .write_record([
            "wavelength_nm",
            "concentration_mg_dl",
            "readings_raw",
            "readings_kept",
            "avg_voltage_uv",
            "linear_fit_uv",
            "linear_r2",
            "quadratic_fit_uv",
            "quadratic_r2",
            "preferred_model",
        ])
        .map_err(|e| export_err(path, e))?;

    for fit in fits {
        let linear = fit.fit(ModelKind::Linear);
        let quadratic = fit.fit(ModelKind::Quadratic);

        for (i, point) in fit.series.points.iter().enumerate() {
            writer
                .write_record([
                    format!("{}", fit.wavelength()),
                    format!("{}", point.concentration),
                    point.raw.to_string(),
                    point.kept.to_string(),
                    format!("{:.4}", point.voltage),
                    fitted_cell(linear, i),
                    r2_cell(linear),
                    fitted_cell(quadratic, i),
                    r2_cell(quadratic),
                    fit.preferred.display_name().to_ascii_lowercase(),
                ])
                .map_err(|e| export_err(path, e))?;
        }
    }

    writer.flush().map_err(|e| export_err(path, e))?;
    Ok(())
}

fn fitted_cell(fit: Option<&crate::domain::FitResult>, i: usize) -> String {
    fit.and_then(|f| f.fitted.get(i))
        .map(|v| format!("{v:.4}"))
        .unwrap_or_default()
}

fn r2_cell(fit: Option<&crate::domain::FitResult>) -> String {
    fit.map(|f| format!("{:.6}", f.quality.r2)).unwrap_or_default()
}

fn export_err(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::new(
        EXIT_USAGE,
        format!("Failed to write export CSV '{}': {e}", path.display()),
    )
}
