//! Synthetic sensor-reading generation.
//!
//! Produces replicate voltage readings per (wavelength, concentration)
//! condition from a smooth response surface plus Gaussian noise, with
//! occasional saturation spikes so the aggregation's outlier rejection has
//! something to do. Deterministic for a given seed, so generated datasets are
//! reproducible across runs and machines.

use std::path::{Path, PathBuf};

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::Observation;
use crate::error::{AppError, EXIT_INTERNAL, EXIT_USAGE};

/// Wavelengths of the lab's sensing channels, in nm.
pub const DEFAULT_WAVELENGTHS: [f64; 4] = [940.0, 1410.0, 1550.0, 1610.0];

/// Concentration ladder used by the bench protocol, in mg/dL.
pub const DEFAULT_CONCENTRATIONS: [f64; 6] = [0.0, 20.0, 40.0, 60.0, 80.0, 100.0];

/// Standard deviation of the per-reading Gaussian noise, in uV.
const NOISE_SIGMA: f64 = 4.0;

#[derive(Debug, Clone)]
pub struct SampleSpec {
    pub wavelengths: Vec<f64>,
    pub concentrations: Vec<f64>,
    /// Readings per wavelength per file.
    pub replicates: usize,
    /// Files written per concentration.
    pub files_per_concentration: usize,
    pub seed: u64,
    /// Probability of a saturation spike per reading.
    pub spike_prob: f64,
    /// Voltage multiplier applied to spiked readings.
    pub spike_scale: f64,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            wavelengths: DEFAULT_WAVELENGTHS.to_vec(),
            concentrations: DEFAULT_CONCENTRATIONS.to_vec(),
            replicates: 60,
            files_per_concentration: 3,
            seed: 42,
            spike_prob: 0.02,
            spike_scale: 5.0,
        }
    }
}

fn validate(spec: &SampleSpec) -> Result<(), AppError> {
    if spec.wavelengths.is_empty() || spec.concentrations.is_empty() {
        return Err(AppError::new(
            EXIT_USAGE,
            "Sample generation needs at least one wavelength and one concentration.",
        ));
    }
    if spec.replicates == 0 || spec.files_per_concentration == 0 {
        return Err(AppError::new(
            EXIT_USAGE,
            "Replicates and files per concentration must be > 0.",
        ));
    }
    if !(0.0..1.0).contains(&spec.spike_prob) {
        return Err(AppError::new(EXIT_USAGE, "Spike probability must be in [0, 1)."));
    }
    if !(spec.spike_scale.is_finite() && spec.spike_scale > 0.0) {
        return Err(AppError::new(EXIT_USAGE, "Spike scale must be finite and > 0."));
    }
    Ok(())
}

/// Noise-free response surface: a gently curved voltage vs concentration
/// relationship whose level and sensitivity vary per channel.
fn response(wavelength: f64, concentration: f64) -> f64 {
    let level = 400.0 + 0.35 * wavelength;
    let slope = 6.0 + 1.5e-3 * wavelength;
    let curvature = -0.012;
    level + slope * concentration + curvature * concentration * concentration
}

fn sample_voltage(
    rng: &mut StdRng,
    noise: &Normal<f64>,
    wavelength: f64,
    concentration: f64,
    spec: &SampleSpec,
) -> f64 {
    let mut voltage = response(wavelength, concentration) + noise.sample(rng);
    let roll: f64 = rng.gen_range(0.0..1.0);
    if roll < spec.spike_prob {
        voltage *= spec.spike_scale;
    }
    voltage
}

/// Generate a flat table of synthetic readings (for tests and dry runs).
pub fn generate_readings(spec: &SampleSpec) -> Result<Vec<Observation>, AppError> {
    validate(spec)?;

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let noise = Normal::new(0.0, NOISE_SIGMA)
        .map_err(|e| AppError::new(EXIT_INTERNAL, format!("Noise distribution error: {e}")))?;

    let per_group = spec.replicates * spec.files_per_concentration;
    let mut observations =
        Vec::with_capacity(spec.wavelengths.len() * spec.concentrations.len() * per_group);
    for &concentration in &spec.concentrations {
        for &wavelength in &spec.wavelengths {
            for _ in 0..per_group {
                observations.push(Observation {
                    wavelength,
                    concentration,
                    voltage: sample_voltage(&mut rng, &noise, wavelength, concentration, spec),
                });
            }
        }
    }
    Ok(observations)
}

/// Write the synthetic dataset as measurement CSV files in the ingest naming
/// convention (`<cell>_<concentration>g_<index>.csv`). Returns the paths
/// written.
pub fn write_sample_files(
    out_dir: &Path,
    cell: &str,
    spec: &SampleSpec,
) -> Result<Vec<PathBuf>, AppError> {
    validate(spec)?;

    std::fs::create_dir_all(out_dir).map_err(|e| {
        AppError::new(
            EXIT_USAGE,
            format!("Failed to create sample directory '{}': {e}", out_dir.display()),
        )
    })?;

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let noise = Normal::new(0.0, NOISE_SIGMA)
        .map_err(|e| AppError::new(EXIT_INTERNAL, format!("Noise distribution error: {e}")))?;

    let mut paths = Vec::new();
    for &concentration in &spec.concentrations {
        for index in 1..=spec.files_per_concentration {
            let name = format!("{cell}_{}g_{index}.csv", concentration_token(concentration));
            let path = out_dir.join(&name);
            let mut writer = csv::Writer::from_path(&path).map_err(|e| {
                AppError::new(EXIT_USAGE, format!("Failed to create '{}': {e}", path.display()))
            })?;

            writer
                .write_record(["Wavelength", "Voltage_uV"])
                .map_err(|e| write_err(&path, e))?;
            for &wavelength in &spec.wavelengths {
                for _ in 0..spec.replicates {
                    let voltage = sample_voltage(&mut rng, &noise, wavelength, concentration, spec);
                    writer
                        .write_record([format!("{wavelength}"), format!("{voltage:.3}")])
                        .map_err(|e| write_err(&path, e))?;
                }
            }
            writer.flush().map_err(|e| write_err(&path, e))?;
            paths.push(path);
        }
    }

    Ok(paths)
}

/// File-name token for a concentration: integral values without a decimal
/// point (`40`, not `40.0`).
fn concentration_token(concentration: f64) -> String {
    crate::domain::wavelength_label(concentration)
}

fn write_err(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::new(
        EXIT_USAGE,
        format!("Failed to write '{}': {e}", path.display()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_spec() -> SampleSpec {
        SampleSpec {
            wavelengths: vec![940.0, 1550.0],
            concentrations: vec![0.0, 40.0],
            replicates: 10,
            files_per_concentration: 2,
            seed: 7,
            spike_prob: 0.05,
            spike_scale: 5.0,
        }
    }

    #[test]
    fn generation_is_deterministic_for_a_seed() {
        let a = generate_readings(&small_spec()).unwrap();
        let b = generate_readings(&small_spec()).unwrap();
        assert_eq!(a.len(), 2 * 2 * 10 * 2);
        assert_eq!(a, b);
    }

    #[test]
    fn every_condition_is_covered() {
        let readings = generate_readings(&small_spec()).unwrap();
        for &wavelength in &[940.0, 1550.0] {
            for &concentration in &[0.0, 40.0] {
                let n = readings
                    .iter()
                    .filter(|o| o.wavelength == wavelength && o.concentration == concentration)
                    .count();
                assert_eq!(n, 20);
            }
        }
    }

    #[test]
    fn invalid_specs_are_rejected() {
        let mut spec = small_spec();
        spec.replicates = 0;
        assert!(generate_readings(&spec).is_err());

        let mut spec = small_spec();
        spec.spike_prob = 1.0;
        assert!(generate_readings(&spec).is_err());
    }

    #[test]
    fn sample_files_follow_the_ingest_naming_convention() {
        let dir = std::env::temp_dir().join(format!("analyte_sample_{}", std::process::id()));
        std::fs::remove_dir_all(&dir).ok();

        let paths = write_sample_files(&dir, "1Mohm", &small_spec()).unwrap();
        assert_eq!(paths.len(), 4);
        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&"1Mohm_0g_1.csv".to_string()));
        assert!(names.contains(&"1Mohm_40g_2.csv".to_string()));
        for name in &names {
            assert!(crate::io::ingest::concentration_from_name(name).is_some());
        }

        std::fs::remove_dir_all(&dir).ok();
    }
}
