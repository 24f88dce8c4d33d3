//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - runs ingest + aggregation + curve fitting
//! - prints the run summary
//! - renders charts and writes optional exports

use std::fs::create_dir_all;
use std::path::PathBuf;

use clap::Parser;

use crate::cli::{Command, FitArgs, PlotArgs, SampleArgs};
use crate::domain::AnalysisConfig;
use crate::error::{AppError, EXIT_USAGE};

pub mod pipeline;

/// Entry point for the `analyte` binary.
pub fn run() -> Result<(), AppError> {
    // Load `.env` before reading any environment fallback.
    dotenvy::dotenv().ok();
    init_logging();

    // We want `analyte` and `analyte ./data` to behave like `analyte fit ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of
    // the argv list before parsing. This preserves a clean clap structure
    // while retaining the expected UX.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Sample(args) => handle_sample(args),
        Command::Plot(args) => handle_plot(args),
    }
}

fn init_logging() {
    // `RUST_LOG` still overrides; default to info so per-group aggregation
    // diagnostics are visible, the way researchers expect from batch runs.
    let env = env_logger::Env::default().default_filter_or("info");
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = analysis_config_from_args(&args)?;
    let run = pipeline::run_analysis(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.ingest, &run.fits, &run.diagnostics, &config)
    );

    if config.plot {
        create_dir_all(&config.out_dir).map_err(|e| {
            AppError::new(
                EXIT_USAGE,
                format!("Failed to create output directory '{}': {e}", config.out_dir.display()),
            )
        })?;
        for fit in &run.fits {
            let path = config
                .out_dir
                .join(format!("{}_{}nm.png", config.prefix, fit.series.label()));
            crate::plot::render_wavelength_chart(&path, fit, config.plot_width, config.plot_height)?;
            log::info!("wrote {}", path.display());
        }
    }

    if let Some(path) = &config.export_results {
        crate::io::export::write_results_csv(path, &run.fits)?;
        log::info!("wrote {}", path.display());
    }
    if let Some(path) = &config.export_fits {
        crate::io::curve::write_fits_json(path, &run.fits, config.replicate_cap)?;
        log::info!("wrote {}", path.display());
    }

    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let spec = crate::data::SampleSpec {
        replicates: args.replicates,
        files_per_concentration: args.files,
        seed: args.seed,
        spike_prob: args.spike_prob,
        spike_scale: args.spike_scale,
        ..crate::data::SampleSpec::default()
    };

    let paths = crate::data::write_sample_files(&args.out_dir, &args.cell, &spec)?;
    println!(
        "Wrote {} sample file(s) to {}",
        paths.len(),
        args.out_dir.display()
    );
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let fits_file = crate::io::curve::read_fits_json(&args.fits)?;

    create_dir_all(&args.out).map_err(|e| {
        AppError::new(
            EXIT_USAGE,
            format!("Failed to create output directory '{}': {e}", args.out.display()),
        )
    })?;

    for fit in &fits_file.fits {
        let path = args
            .out
            .join(format!("{}_{}nm.png", args.prefix, fit.series.label()));
        crate::plot::render_wavelength_chart(&path, fit, args.width, args.height)?;
        log::info!("wrote {}", path.display());
    }

    println!(
        "Rendered {} chart(s) from {} to {}",
        fits_file.fits.len(),
        args.fits.display(),
        args.out.display()
    );
    Ok(())
}

pub fn analysis_config_from_args(args: &FitArgs) -> Result<AnalysisConfig, AppError> {
    let data_dir = args
        .data_dir
        .clone()
        .or_else(|| std::env::var("ANALYTE_DATA_DIR").ok().map(PathBuf::from))
        .ok_or_else(|| {
            AppError::new(
                EXIT_USAGE,
                "No data directory given (pass DATA_DIR or set ANALYTE_DATA_DIR).",
            )
        })?;

    if args.replicate_cap == 0 {
        return Err(AppError::new(EXIT_USAGE, "Replicate cap must be > 0."));
    }
    if args.grid_points < 2 {
        return Err(AppError::new(EXIT_USAGE, "Grid points must be >= 2."));
    }

    Ok(AnalysisConfig {
        data_dir,
        out_dir: args.out.clone(),
        prefix: args.prefix.clone(),
        replicate_cap: args.replicate_cap,
        grid_points: args.grid_points,
        model_spec: args.model,
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_results: args.export.clone(),
        export_fits: args.export_fits.clone(),
    })
}

/// Rewrite argv so `analyte` defaults to `analyte fit`.
///
/// Rules:
/// - `analyte`                      -> `analyte fit`
/// - `analyte ./data`               -> `analyte fit ./data`
/// - `analyte --no-plot ...`        -> `analyte fit --no-plot ...`
/// - `analyte --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("fit".to_string());
        return argv;
    };

    let is_top_level_help_or_version =
        matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "fit" | "sample" | "plot");
    if is_subcommand {
        return argv;
    }

    // Anything else is treated as `fit` input: a flag or the DATA_DIR
    // positional.
    argv.insert(1, "fit".to_string());
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_defaults_to_fit() {
        assert_eq!(rewrite_args(args(&["analyte"])), args(&["analyte", "fit"]));
        assert_eq!(
            rewrite_args(args(&["analyte", "./data"])),
            args(&["analyte", "fit", "./data"])
        );
        assert_eq!(
            rewrite_args(args(&["analyte", "--no-plot"])),
            args(&["analyte", "fit", "--no-plot"])
        );
    }

    #[test]
    fn subcommands_and_help_pass_through() {
        assert_eq!(
            rewrite_args(args(&["analyte", "sample"])),
            args(&["analyte", "sample"])
        );
        assert_eq!(
            rewrite_args(args(&["analyte", "--help"])),
            args(&["analyte", "--help"])
        );
    }

    #[test]
    fn config_validation_rejects_bad_knobs() {
        let mut fit_args = crate::cli::FitArgs::parse_from(["fit", "./data"]);
        fit_args.replicate_cap = 0;
        let err = analysis_config_from_args(&fit_args).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_USAGE);

        let mut fit_args = crate::cli::FitArgs::parse_from(["fit", "./data"]);
        fit_args.grid_points = 1;
        let err = analysis_config_from_args(&fit_args).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_USAGE);
    }
}
