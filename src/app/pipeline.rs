//! Shared analysis pipeline used by the CLI front-end.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! ingest -> group aggregation -> per-wavelength fit -> diagnostics
//!
//! The front-end can then focus on presentation (summary, charts, exports).

use rayon::prelude::*;

use crate::aggregate::build_series;
use crate::domain::{AnalysisConfig, RunDiagnostics, WavelengthFailure, WavelengthFit};
use crate::error::AppError;
use crate::fit::fit_series;
use crate::io::ingest::{IngestedData, load_observations};

/// All computed outputs of a single `analyte fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedData,
    pub fits: Vec<WavelengthFit>,
    pub diagnostics: RunDiagnostics,
}

/// Execute the full analysis pipeline and return the computed outputs.
pub fn run_analysis(config: &AnalysisConfig) -> Result<RunOutput, AppError> {
    // 1) Ingest + clean the measurement files. The only fatal data condition
    //    lives here: nothing valid left after cleaning.
    let ingest = load_observations(config)?;

    // 2) Reduce each (wavelength, concentration) group to its representative
    //    value.
    let (series, skipped_groups) = build_series(&ingest.observations, config.replicate_cap);
    for group in &skipped_groups {
        log::warn!(
            "skipping {} nm @ {} mg/dL: {}",
            crate::domain::wavelength_label(group.wavelength),
            group.concentration,
            group.reason
        );
    }

    // 3) Fit models per wavelength. Wavelengths are independent and share no
    //    mutable state, so they fan out across threads; a failed wavelength
    //    only produces a diagnostic.
    let outcomes: Vec<Result<WavelengthFit, WavelengthFailure>> =
        series.par_iter().map(|s| fit_series(s, config)).collect();

    let mut fits = Vec::new();
    let mut failed_wavelengths = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(fit) => fits.push(fit),
            Err(failure) => {
                log::warn!(
                    "no model could be fitted for wavelength {} nm",
                    crate::domain::wavelength_label(failure.wavelength)
                );
                failed_wavelengths.push(failure);
            }
        }
    }

    Ok(RunOutput {
        ingest,
        fits,
        diagnostics: RunDiagnostics {
            skipped_groups,
            failed_wavelengths,
        },
    })
}
