//! Command-line parsing for the sensor calibration curve fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the aggregation/fitting code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::ModelSpec;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "analyte", version, about = "Sensor calibration curve fitter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest a directory of measurement CSVs, fit calibration curves per
    /// wavelength, print diagnostics, and render/export the results.
    Fit(FitArgs),
    /// Generate a synthetic measurement dataset for trying the pipeline.
    Sample(SampleArgs),
    /// Re-render charts from a previously exported fits JSON.
    Plot(PlotArgs),
}

/// Options for the fitting pipeline.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Directory containing the measurement CSV files.
    ///
    /// Falls back to the `ANALYTE_DATA_DIR` environment variable (also read
    /// from `.env`).
    #[arg(value_name = "DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output directory for rendered charts.
    #[arg(short = 'o', long, default_value = "plots")]
    pub out: PathBuf,

    /// Output file name prefix (`<prefix>_<wavelength>nm.png`).
    #[arg(long, default_value = "sensor")]
    pub prefix: String,

    /// Replicate cap: only the top-N readings of a group enter aggregation.
    #[arg(long, default_value_t = crate::aggregate::REPLICATE_CAP)]
    pub replicate_cap: usize,

    /// Points in the dense range used to draw the smooth quadratic curve.
    #[arg(long, default_value_t = 500)]
    pub grid_points: usize,

    /// Which model(s) to fit.
    #[arg(long, value_enum, default_value_t = ModelSpec::Both)]
    pub model: ModelSpec,

    /// Render PNG charts (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable chart rendering.
    #[arg(long)]
    pub no_plot: bool,

    /// Chart width (pixels).
    #[arg(long, default_value_t = 1000)]
    pub width: u32,

    /// Chart height (pixels).
    #[arg(long, default_value_t = 600)]
    pub height: u32,

    /// Export aggregated points + fitted values to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export fitted curves (series + coefficients + grids) to JSON.
    #[arg(long = "export-fits")]
    pub export_fits: Option<PathBuf>,
}

/// Options for synthetic dataset generation.
#[derive(Debug, Parser)]
pub struct SampleArgs {
    /// Directory to write the sample CSV files into.
    #[arg(value_name = "OUT_DIR", default_value = "sample_data")]
    pub out_dir: PathBuf,

    /// Random seed (generation is deterministic per seed).
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Readings per wavelength per file.
    #[arg(long, default_value_t = 60)]
    pub replicates: usize,

    /// Files per concentration.
    #[arg(long, default_value_t = 3)]
    pub files: usize,

    /// Probability of a saturation spike per reading.
    #[arg(long, default_value_t = 0.02)]
    pub spike_prob: f64,

    /// Voltage multiplier applied to spiked readings.
    #[arg(long, default_value_t = 5.0)]
    pub spike_scale: f64,

    /// Sensing-cell label used in the file names.
    #[arg(long, default_value = "1Mohm")]
    pub cell: String,
}

/// Options for re-plotting a saved fits file.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Fits JSON produced by `analyte fit --export-fits`.
    #[arg(long, value_name = "JSON")]
    pub fits: PathBuf,

    /// Output directory for rendered charts.
    #[arg(short = 'o', long, default_value = "plots")]
    pub out: PathBuf,

    /// Output file name prefix.
    #[arg(long, default_value = "sensor")]
    pub prefix: String,

    /// Chart width (pixels).
    #[arg(long, default_value_t = 1000)]
    pub width: u32,

    /// Chart height (pixels).
    #[arg(long, default_value_t = 600)]
    pub height: u32,
}
