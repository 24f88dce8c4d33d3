//! Read/write fits JSON files.
//!
//! Fits JSON is the "portable" representation of a run's fitted curves:
//! per-wavelength series, model coefficients, R² scores, and the precomputed
//! smooth grid for quick re-plotting without re-ingesting the raw data.
//!
//! The schema is defined by `domain::FitsFile`.

use std::fs::File;
use std::path::Path;

use crate::domain::{FitsFile, WavelengthFit};
use crate::error::{AppError, EXIT_USAGE};

/// Write a fits JSON file.
pub fn write_fits_json(
    path: &Path,
    fits: &[WavelengthFit],
    replicate_cap: usize,
) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(
            EXIT_USAGE,
            format!("Failed to create fits JSON '{}': {e}", path.display()),
        )
    })?;

    let fits_file = FitsFile {
        tool: "analyte".to_string(),
        generated: chrono::Local::now().to_rfc3339(),
        replicate_cap,
        fits: fits.to_vec(),
    };

    serde_json::to_writer_pretty(file, &fits_file)
        .map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to write fits JSON: {e}")))?;

    Ok(())
}

/// Read a fits JSON file.
pub fn read_fits_json(path: &Path) -> Result<FitsFile, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(
            EXIT_USAGE,
            format!("Failed to open fits JSON '{}': {e}", path.display()),
        )
    })?;
    let fits_file: FitsFile = serde_json::from_reader(file)
        .map_err(|e| AppError::new(EXIT_USAGE, format!("Invalid fits JSON: {e}")))?;
    Ok(fits_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CurveModel, FitQuality, FitResult, ModelKind, SeriesPoint, WavelengthSeries,
    };

    #[test]
    fn fits_json_round_trips() {
        let fit = WavelengthFit {
            series: WavelengthSeries {
                wavelength: 940.0,
                points: vec![SeriesPoint {
                    concentration: 40.0,
                    voltage: 120.5,
                    raw: 150,
                    kept: 148,
                }],
            },
            fits: vec![FitResult {
                model: CurveModel {
                    name: ModelKind::Linear,
                    display_name: "Linear".to_string(),
                    coeffs: vec![5.0, 1.0],
                },
                quality: FitQuality {
                    sse: 0.0,
                    r2: 1.0,
                    n: 1,
                },
                fitted: vec![120.5],
            }],
            skipped: vec![],
            preferred: ModelKind::Linear,
            smooth: None,
        };

        let dir = std::env::temp_dir().join(format!("analyte_fits_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("fits.json");

        write_fits_json(&path, std::slice::from_ref(&fit), 150).unwrap();
        let loaded = read_fits_json(&path).unwrap();

        assert_eq!(loaded.tool, "analyte");
        assert_eq!(loaded.replicate_cap, 150);
        assert_eq!(loaded.fits.len(), 1);
        assert_eq!(loaded.fits[0].series.wavelength, 940.0);
        assert_eq!(loaded.fits[0].preferred, ModelKind::Linear);

        std::fs::remove_dir_all(&dir).ok();
    }
}
