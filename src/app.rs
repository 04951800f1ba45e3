//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - runs the fit pipeline
//! - prints summaries/plots
//! - writes optional exports

use std::fs::File;
use std::io::BufWriter;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, FitArgs, SampleArgs};
use crate::domain::{Family, FitConfig, SampleConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `evfit` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is the normal case.
    dotenvy::dotenv().ok();

    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing: `evfit` and `evfit --csv x.csv` mean `evfit fit ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    init_logging(cli.verbose);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Sample(args) => handle_sample(args),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // Ignore a second init (tests may call `run` paths more than once).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .compact()
        .try_init();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args)?;
    let run = pipeline::run_fit(&config)?;

    for (i, series) in [&run.energy, &run.time_of_day].into_iter().enumerate() {
        if i > 0 {
            println!();
        }
        print!("{}", crate::report::format_series_summary(series, config.top_n, config.show_params));
        if config.plot {
            println!();
            print!("{}", crate::plot::render_fit_plot(series, config.plot_width, config.plot_height));
        }
    }

    if let Some(path) = &config.export {
        let report = crate::io::export::build_report_file(
            &config.csv_path,
            run.data.rows_read,
            config.aligned,
            config.metric,
            &[&run.energy, &run.time_of_day],
        );
        crate::io::export::write_report_json(path, &report)?;
    }

    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = SampleConfig {
        out: args.out,
        rows: args.rows,
        seed: args.seed,
        missing_prob: args.missing_prob,
        stations: args.stations,
    };
    let file = File::create(&config.out)
        .map_err(|e| AppError::input(format!("Failed to create sample CSV '{}': {e}", config.out.display())))?;
    let stats = crate::data::write_sample(BufWriter::new(file), &config)?;

    println!(
        "Wrote {} sessions ({} without energy) to {}",
        stats.rows,
        stats.missing_energy,
        config.out.display()
    );
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> Result<FitConfig, AppError> {
    if !(args.timeout.is_finite() && args.timeout > 0.0) {
        return Err(AppError::input("--timeout must be a positive number of seconds."));
    }
    let timeout = Duration::try_from_secs_f64(args.timeout)
        .map_err(|e| AppError::input(format!("--timeout {} is out of range: {e}", args.timeout)))?;
    if args.bins == 0 {
        return Err(AppError::input("--bins must be > 0."));
    }
    if args.max_iter == 0 {
        return Err(AppError::input("--max-iter must be > 0."));
    }

    // Keep the first occurrence of each family, in the order given.
    let mut families: Vec<Family> = Vec::with_capacity(args.distributions.len());
    for &family in &args.distributions {
        if !families.contains(&family) {
            families.push(family);
        }
    }

    Ok(FitConfig {
        csv_path: args.csv.clone(),
        time_column: args.time_column.clone(),
        energy_column: args.energy_column.clone(),
        families,
        bins: args.bins,
        max_iter: args.max_iter,
        timeout,
        metric: args.sort_by,
        aligned: args.aligned,
        top_n: args.top,
        show_params: args.params,
        plot: args.plot,
        plot_width: args.width,
        plot_height: args.height,
        export: args.export.clone(),
    })
}

/// Rewrite argv so `evfit` defaults to `evfit fit`.
///
/// Rules:
/// - `evfit`                         -> `evfit fit`
/// - `evfit --csv x.csv ...`         -> `evfit fit --csv x.csv ...`
/// - `evfit -v ...`                  -> `evfit fit -v ...` (global flag, still counted)
/// - `evfit --help/--version/-h`     -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("fit".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "fit" | "sample");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "fit flags".
    if arg1.starts_with('-') {
        argv.insert(1, "fit".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}
