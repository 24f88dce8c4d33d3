//! Measurement-directory ingest and normalization.
//!
//! This module turns a directory of per-trial CSV exports into a clean, flat
//! table of `Observation`s that are safe to aggregate.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2/3)
//! - **File- and row-level isolation** (skip bad files/rows, but report what
//!   happened)
//! - **Deterministic behavior** (files are processed in name order)
//! - **Separation of concerns**: no aggregation or fitting logic here
//!
//! The analyte concentration is not a column: per the lab's export
//! convention it is encoded in the file name as the second `_`-separated
//! token with a trailing unit letter, e.g. `1Mohm_40g_1.csv` holds the 40
//! mg/dL trials. Editor temp/lock files (`~$…`, dotfiles) are ignored.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{AnalysisConfig, Observation};
use crate::error::{AppError, EXIT_NO_DATA, EXIT_USAGE};

/// Summary stats about the observations actually used downstream.
#[derive(Debug, Clone)]
pub struct DatasetStats {
    pub n_observations: usize,
    pub n_wavelengths: usize,
    pub n_concentrations: usize,
    pub concentration_min: f64,
    pub concentration_max: f64,
    pub voltage_min: f64,
    pub voltage_max: f64,
}

/// A file-level error (unparsable name, missing columns, unreadable).
#[derive(Debug, Clone)]
pub struct FileError {
    pub file: String,
    pub message: String,
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub file: String,
    pub line: usize,
    pub message: String,
}

/// Ingest output: clean observations + stats + file/row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub observations: Vec<Observation>,
    pub stats: DatasetStats,
    pub file_errors: Vec<FileError>,
    pub row_errors: Vec<RowError>,
    pub files_read: usize,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load and normalize every measurement file under the configured directory.
pub fn load_observations(config: &AnalysisConfig) -> Result<IngestedData, AppError> {
    let dir = &config.data_dir;
    let entries = std::fs::read_dir(dir).map_err(|e| {
        AppError::new(
            EXIT_USAGE,
            format!("Failed to read data directory '{}': {e}", dir.display()),
        )
    })?;

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter(|name| is_measurement_file(name))
        .collect();
    names.sort();

    if names.is_empty() {
        return Err(AppError::new(
            EXIT_NO_DATA,
            format!("No measurement CSV files found in '{}'.", dir.display()),
        ));
    }
    log::info!("found {} measurement file(s) in {}", names.len(), dir.display());

    let mut observations = Vec::new();
    let mut file_errors = Vec::new();
    let mut row_errors = Vec::new();
    let mut files_read = 0usize;
    let mut rows_read = 0usize;

    for name in &names {
        let path = dir.join(name);
        match ingest_file(&path, name, &mut observations, &mut row_errors, &mut rows_read) {
            Ok(used) => {
                files_read += 1;
                log::info!("processed {name}: {used} row(s) used");
            }
            Err(message) => {
                log::warn!("skipping {name}: {message}");
                file_errors.push(FileError {
                    file: name.clone(),
                    message,
                });
            }
        }
    }

    let rows_used = observations.len();
    if rows_used == 0 {
        return Err(AppError::new(
            EXIT_NO_DATA,
            "No valid observations remain after cleaning.",
        ));
    }
    if !row_errors.is_empty() {
        log::warn!("dropped {} row(s) with missing or non-numeric values", row_errors.len());
    }

    let stats = compute_stats(&observations);

    Ok(IngestedData {
        observations,
        stats,
        file_errors,
        row_errors,
        files_read,
        rows_read,
        rows_used,
    })
}

/// Ingest a single file; returns the number of rows used, or a file-level
/// error message. Row-level problems go to `row_errors` and do not fail the
/// file.
fn ingest_file(
    path: &Path,
    name: &str,
    observations: &mut Vec<Observation>,
    row_errors: &mut Vec<RowError>,
    rows_read: &mut usize,
) -> Result<usize, String> {
    let concentration = concentration_from_name(name)
        .ok_or_else(|| "file name does not encode a concentration".to_string())?;

    let file = File::open(path).map_err(|e| format!("failed to open: {e}"))?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| format!("failed to read headers: {e}"))?
        .clone();
    let header_map = build_header_map(&headers);

    let wavelength_idx = *header_map
        .get("wavelength")
        .ok_or_else(|| "missing required column 'Wavelength'".to_string())?;
    let voltage_idx = *header_map
        .get("voltage_uv")
        .ok_or_else(|| "missing required column 'Voltage_uV'".to_string())?;

    let mut used = 0usize;
    for (idx, result) in reader.records().enumerate() {
        // +2 because records() starts after the header row and CSV line
        // numbers are 1-based.
        let line = idx + 2;
        *rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    file: name.to_string(),
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let wavelength = match parse_numeric_field(&record, wavelength_idx, "Wavelength") {
            Ok(v) => v,
            Err(message) => {
                row_errors.push(RowError {
                    file: name.to_string(),
                    line,
                    message,
                });
                continue;
            }
        };
        let voltage = match parse_numeric_field(&record, voltage_idx, "Voltage_uV") {
            Ok(v) => v,
            Err(message) => {
                row_errors.push(RowError {
                    file: name.to_string(),
                    line,
                    message,
                });
                continue;
            }
        };

        observations.push(Observation {
            wavelength,
            concentration,
            voltage,
        });
        used += 1;
    }

    Ok(used)
}

/// Measurement files are CSVs that are neither editor temp/lock files (`~$…`)
/// nor hidden files.
fn is_measurement_file(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".csv") && !name.starts_with("~$") && !name.starts_with('.')
}

/// Extract the concentration from a file name such as `1Mohm_40g_1.csv`:
/// second `_`-separated token, trailing unit letters stripped.
pub fn concentration_from_name(name: &str) -> Option<f64> {
    let stem = name.strip_suffix(".csv").unwrap_or(name);
    let token = stem.split('_').nth(1)?;
    let digits = token.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    if digits.is_empty() {
        return None;
    }
    let value: f64 = digits.parse().ok()?;
    value.is_finite().then_some(value)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

/// Spreadsheet exports sometimes emit UTF-8 CSVs with a BOM prefix on the
/// first header (e.g. "﻿Wavelength"). If we don't strip it, schema validation
/// will incorrectly report missing columns.
fn normalize_header_name(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn parse_numeric_field(record: &StringRecord, idx: usize, column: &str) -> Result<f64, String> {
    let raw = record
        .get(idx)
        .ok_or_else(|| format!("missing value in column '{column}'"))?;
    if raw.is_empty() {
        return Err(format!("missing value in column '{column}'"));
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("non-numeric value '{raw}' in column '{column}'"))?;
    if !value.is_finite() {
        return Err(format!("non-finite value '{raw}' in column '{column}'"));
    }
    Ok(value)
}

fn compute_stats(observations: &[Observation]) -> DatasetStats {
    let mut wavelengths: Vec<f64> = Vec::new();
    let mut concentrations: Vec<f64> = Vec::new();
    let mut concentration_min = f64::INFINITY;
    let mut concentration_max = f64::NEG_INFINITY;
    let mut voltage_min = f64::INFINITY;
    let mut voltage_max = f64::NEG_INFINITY;

    for obs in observations {
        if !wavelengths.contains(&obs.wavelength) {
            wavelengths.push(obs.wavelength);
        }
        if !concentrations.contains(&obs.concentration) {
            concentrations.push(obs.concentration);
        }
        concentration_min = concentration_min.min(obs.concentration);
        concentration_max = concentration_max.max(obs.concentration);
        voltage_min = voltage_min.min(obs.voltage);
        voltage_max = voltage_max.max(obs.voltage);
    }

    DatasetStats {
        n_observations: observations.len(),
        n_wavelengths: wavelengths.len(),
        n_concentrations: concentrations.len(),
        concentration_min,
        concentration_max,
        voltage_min,
        voltage_max,
    }
}
