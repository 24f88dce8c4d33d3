//! Run summary formatting.

use crate::domain::{AnalysisConfig, ModelSpec, RunDiagnostics, WavelengthFit, wavelength_label};
use crate::io::ingest::IngestedData;

/// Format the full run summary: dataset stats, per-wavelength model
/// comparison, and the diagnostics the caller should know about.
pub fn format_run_summary(
    ingest: &IngestedData,
    fits: &[WavelengthFit],
    diagnostics: &RunDiagnostics,
    config: &AnalysisConfig,
) -> String {
    let mut out = String::new();

    out.push_str("=== analyte - Sensor Calibration Curve Fit ===\n");
    out.push_str(&format!(
        "Data: {} ({} file(s), {} row(s) read, {} used)\n",
        config.data_dir.display(),
        ingest.files_read,
        ingest.rows_read,
        ingest.rows_used,
    ));
    out.push_str(&format!(
        "Wavelengths: {} | Concentrations: {} | conc=[{:.2}, {:.2}] mg/dL | voltage=[{:.2}, {:.2}] uV\n",
        ingest.stats.n_wavelengths,
        ingest.stats.n_concentrations,
        ingest.stats.concentration_min,
        ingest.stats.concentration_max,
        ingest.stats.voltage_min,
        ingest.stats.voltage_max,
    ));
    out.push_str(&format!(
        "Replicate cap: {} | Models: {}\n",
        config.replicate_cap,
        model_spec_label(config.model_spec),
    ));

    for fit in fits {
        out.push_str(&format!(
            "\nWavelength {} nm ({} point(s)):\n",
            fit.series.label(),
            fit.series.points.len()
        ));
        for result in &fit.fits {
            let chosen = if result.model.name == fit.preferred { "*" } else { " " };
            out.push_str(&format!(
                "{chosen} {:<10} R²={:.4} SSE={:.4} coeffs={}\n",
                result.model.display_name,
                result.quality.r2,
                result.quality.sse,
                fmt_vec(&result.model.coeffs),
            ));
        }
        for (kind, reason) in &fit.skipped {
            out.push_str(&format!("  (skipped {}) {reason}\n", kind.display_name()));
        }
    }

    out.push_str("\nDiagnostics:\n");
    if diagnostics.is_clean() && ingest.row_errors.is_empty() && ingest.file_errors.is_empty() {
        out.push_str("- none\n");
        return out;
    }

    for error in &ingest.file_errors {
        out.push_str(&format!("- skipped file {}: {}\n", error.file, error.message));
    }
    if !ingest.row_errors.is_empty() {
        out.push_str(&format!(
            "- dropped {} row(s) with missing or non-numeric values\n",
            ingest.row_errors.len()
        ));
    }
    for group in &diagnostics.skipped_groups {
        out.push_str(&format!(
            "- skipped group: {} nm @ {} mg/dL ({})\n",
            wavelength_label(group.wavelength),
            group.concentration,
            group.reason,
        ));
    }
    for failure in &diagnostics.failed_wavelengths {
        let reasons: Vec<String> = failure
            .skipped
            .iter()
            .map(|(kind, reason)| format!("{}: {reason}", kind.display_name()))
            .collect();
        out.push_str(&format!(
            "- no fit for wavelength {} nm ({})\n",
            wavelength_label(failure.wavelength),
            reasons.join("; "),
        ));
    }

    out
}

fn model_spec_label(spec: ModelSpec) -> &'static str {
    match spec {
        ModelSpec::Both => "linear + quadratic",
        ModelSpec::Linear => "linear",
        ModelSpec::Quadratic => "quadratic",
    }
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}
