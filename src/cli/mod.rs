//! Command-line parsing for the EV charging distribution fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting/math code. Most `fit` options can also be set
//! through `EVFIT_*` environment variables (or a `.env` file); flags win.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::domain::{DEFAULT_FAMILIES, Family, Metric};
use crate::io::ingest::{DEFAULT_ENERGY_COLUMN, DEFAULT_TIME_COLUMN};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "evfit", version, about = "Fit probability distributions to EV charging sessions")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit candidate distributions to session energy and start time of day.
    Fit(FitArgs),
    /// Write a synthetic charging-session CSV.
    Sample(SampleArgs),
}

/// Options for fitting.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Charging-session CSV.
    #[arg(long, value_name = "PATH", env = "EVFIT_CSV", default_value = "EVChargingStationUsage.csv")]
    pub csv: PathBuf,

    /// Column holding the session start timestamp.
    #[arg(long, env = "EVFIT_TIME_COLUMN", default_value = DEFAULT_TIME_COLUMN)]
    pub time_column: String,

    /// Column holding the delivered energy in kWh.
    #[arg(long, env = "EVFIT_ENERGY_COLUMN", default_value = DEFAULT_ENERGY_COLUMN)]
    pub energy_column: String,

    /// Candidate distributions (comma separated).
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        env = "EVFIT_DISTRIBUTIONS",
        default_values_t = DEFAULT_FAMILIES
    )]
    pub distributions: Vec<Family>,

    /// Histogram bins used for density-based scores.
    #[arg(long, env = "EVFIT_BINS", default_value_t = 100)]
    pub bins: usize,

    /// Show the top-N fits per series.
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// Score used to rank fits (lower is better).
    #[arg(long, value_enum, env = "EVFIT_SORT_BY", default_value_t = Metric::SumsquareError)]
    pub sort_by: Metric,

    /// Simplex iteration budget per family.
    #[arg(long, env = "EVFIT_MAX_ITER", default_value_t = 2000)]
    pub max_iter: usize,

    /// Per-family fit timeout in seconds.
    #[arg(long, value_name = "SECS", env = "EVFIT_TIMEOUT", default_value_t = 30.0)]
    pub timeout: f64,

    /// Derive the time-of-day series only from rows with a usable energy value.
    #[arg(long)]
    pub aligned: bool,

    /// Print the fitted parameters of the best family per series.
    #[arg(long)]
    pub params: bool,

    /// Render an ASCII histogram with the best fit overlaid.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export the full report (histograms, every fit, failures) to JSON.
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,
}

/// Options for synthetic data generation.
#[derive(Debug, Parser, Clone)]
pub struct SampleArgs {
    /// Output CSV path.
    #[arg(long, value_name = "PATH")]
    pub out: PathBuf,

    /// Number of sessions to generate.
    #[arg(short = 'n', long, default_value_t = 5000)]
    pub rows: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Probability that a session's energy cell is left blank.
    #[arg(long, default_value_t = 0.02)]
    pub missing_prob: f64,

    /// Number of distinct station names.
    #[arg(long, default_value_t = 8)]
    pub stations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_defaults_cover_every_family() {
        let cli = Cli::try_parse_from(["evfit", "fit"]).unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.distributions, DEFAULT_FAMILIES.to_vec());
        assert_eq!(args.sort_by, Metric::SumsquareError);
        assert_eq!(args.top, 5);
        assert_eq!(args.bins, 100);
        assert!(!args.aligned);
    }

    #[test]
    fn distributions_are_comma_separated() {
        let cli = Cli::try_parse_from(["evfit", "-vv", "fit", "--distributions", "norm,weibull_max", "--sort-by", "kl_div"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.distributions, vec![Family::Norm, Family::WeibullMax]);
        assert_eq!(args.sort_by, Metric::KlDiv);
    }

    #[test]
    fn unknown_distribution_is_rejected() {
        assert!(Cli::try_parse_from(["evfit", "fit", "--distributions", "cauchy"]).is_err());
    }
}
