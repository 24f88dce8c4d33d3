//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during aggregation and fitting
//! - exported to JSON/CSV
//! - reloaded later for re-plotting

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which regression model(s) to fit per wavelength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelSpec {
    /// Fit and compare both models (the default).
    Both,
    Linear,
    Quadratic,
}

/// Concrete fitted model kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Linear,
    Quadratic,
}

impl ModelKind {
    /// Human-readable label for terminal output and chart legends.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Linear => "Linear",
            ModelKind::Quadratic => "Quadratic",
        }
    }

    /// Number of polynomial coefficients (intercept first).
    pub fn coeff_len(self) -> usize {
        match self {
            ModelKind::Linear => 2,
            ModelKind::Quadratic => 3,
        }
    }

    /// Minimum number of distinct concentrations for a well-posed OLS fit.
    ///
    /// With fewer points than coefficients the design matrix is rank-deficient
    /// and the fit is abandoned rather than attempted.
    pub fn min_points(self) -> usize {
        self.coeff_len()
    }
}

/// One raw sensor reading after ingest coercion.
///
/// Produced by the ingestion layer; by the time an `Observation` reaches the
/// aggregator all three fields are finite numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Optical channel wavelength, in nm.
    pub wavelength: f64,
    /// Analyte concentration for the trial, in mg/dL.
    pub concentration: f64,
    /// Measured voltage, in microvolts.
    pub voltage: f64,
}

/// One aggregated point of a wavelength series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub concentration: f64,
    /// Outlier-trimmed mean voltage for the (wavelength, concentration) group.
    pub voltage: f64,
    /// Raw readings observed for the group.
    pub raw: usize,
    /// Readings that survived the replicate cap and the IQR fences.
    pub kept: usize,
}

/// Aggregated series for one wavelength: one point per distinct concentration,
/// in the order concentrations were first encountered in the input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WavelengthSeries {
    pub wavelength: f64,
    pub points: Vec<SeriesPoint>,
}

impl WavelengthSeries {
    pub fn concentrations(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.concentration).collect()
    }

    pub fn voltages(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.voltage).collect()
    }

    /// Label used in chart captions and output file names (`940`, `1412.5`).
    pub fn label(&self) -> String {
        wavelength_label(self.wavelength)
    }
}

/// Format a wavelength for labels: integral values without a decimal point.
pub fn wavelength_label(nm: f64) -> String {
    if nm.fract() == 0.0 {
        format!("{nm:.0}")
    } else {
        format!("{nm}")
    }
}

/// Fitted model parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveModel {
    pub name: ModelKind,
    pub display_name: String,
    /// Polynomial coefficients, intercept first.
    pub coeffs: Vec<f64>,
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitQuality {
    pub sse: f64,
    /// Coefficient of determination, evaluated at the observed points.
    pub r2: f64,
    pub n: usize,
}

/// Fit output for a single model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    pub model: CurveModel,
    pub quality: FitQuality,
    /// Predicted voltages aligned to the series' observed concentrations.
    pub fitted: Vec<f64>,
}

/// Densely sampled curve for rendering a smooth fitted line.
///
/// Purely a rendering aid: R² is always computed at the observed points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveGrid {
    pub concentration: Vec<f64>,
    pub voltage: Vec<f64>,
}

/// Why a model was not fitted for a wavelength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitSkipReason {
    /// Fewer distinct concentrations than the model has coefficients.
    InsufficientPoints { needed: usize, got: usize },
    /// The least-squares system was too ill-conditioned to solve.
    Singular,
}

impl std::fmt::Display for FitSkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitSkipReason::InsufficientPoints { needed, got } => {
                write!(f, "insufficient points: need {needed} distinct concentrations, got {got}")
            }
            FitSkipReason::Singular => write!(f, "singular least-squares system"),
        }
    }
}

/// Fit + comparison output for one wavelength.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WavelengthFit {
    pub series: WavelengthSeries,
    /// Fits for all models that could be attempted.
    pub fits: Vec<FitResult>,
    /// Models that were skipped and why.
    pub skipped: Vec<(ModelKind, FitSkipReason)>,
    /// The better-scoring model per the comparison rule.
    pub preferred: ModelKind,
    /// Smooth quadratic curve for rendering (absent when quadratic was skipped).
    pub smooth: Option<CurveGrid>,
}

impl WavelengthFit {
    pub fn wavelength(&self) -> f64 {
        self.series.wavelength
    }

    pub fn fit(&self, kind: ModelKind) -> Option<&FitResult> {
        self.fits.iter().find(|f| f.model.name == kind)
    }
}

/// A wavelength for which no model could be fitted.
///
/// Isolated failure domain: sibling wavelengths are unaffected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WavelengthFailure {
    pub wavelength: f64,
    pub skipped: Vec<(ModelKind, FitSkipReason)>,
}

/// Why a (wavelength, concentration) pair produced no series point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupSkipReason {
    /// No readings were observed for the pair.
    Empty,
    /// Every retained reading fell outside the IQR fences.
    AllOutliers,
}

impl std::fmt::Display for GroupSkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupSkipReason::Empty => write!(f, "no readings"),
            GroupSkipReason::AllOutliers => write!(f, "all readings rejected as outliers"),
        }
    }
}

/// A skipped (wavelength, concentration) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedGroup {
    pub wavelength: f64,
    pub concentration: f64,
    pub reason: GroupSkipReason,
}

/// Per-run diagnostics: which subsets of the input produced no output and why.
///
/// Returned to the caller alongside the fits so tests can assert on failure
/// reasons without parsing text output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub skipped_groups: Vec<SkippedGroup>,
    pub failed_wavelengths: Vec<WavelengthFailure>,
}

impl RunDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.skipped_groups.is_empty() && self.failed_wavelengths.is_empty()
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub data_dir: PathBuf,
    pub out_dir: PathBuf,
    /// Output file name prefix (`<prefix>_<wavelength>nm.png`).
    pub prefix: String,

    /// Replicate cap: only the top `replicate_cap` readings (by value) of a
    /// group are candidates for aggregation.
    pub replicate_cap: usize,
    /// Number of synthetic concentrations for the smooth quadratic curve.
    pub grid_points: usize,
    pub model_spec: ModelSpec,

    pub plot: bool,
    pub plot_width: u32,
    pub plot_height: u32,

    pub export_results: Option<PathBuf>,
    pub export_fits: Option<PathBuf>,
}

/// A saved fits file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitsFile {
    pub tool: String,
    pub generated: String,
    pub replicate_cap: usize,
    pub fits: Vec<WavelengthFit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wavelength_label_drops_trailing_zero() {
        assert_eq!(wavelength_label(940.0), "940");
        assert_eq!(wavelength_label(1412.5), "1412.5");
    }

    #[test]
    fn model_kind_minimum_points_match_coefficients() {
        assert_eq!(ModelKind::Linear.min_points(), 2);
        assert_eq!(ModelKind::Quadratic.min_points(), 3);
    }
}
