//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON
//! - printed by the reporter without reaching back into the fitter

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Candidate distribution families.
///
/// Every family is a location/scale family with zero, one or two shape
/// parameters. Names match the identifiers users pass on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Family {
    #[serde(rename = "gamma")]
    #[value(name = "gamma")]
    Gamma,
    #[serde(rename = "lognorm")]
    #[value(name = "lognorm")]
    LogNorm,
    #[serde(rename = "beta")]
    #[value(name = "beta")]
    Beta,
    #[serde(rename = "expon")]
    #[value(name = "expon")]
    Expon,
    #[serde(rename = "norm")]
    #[value(name = "norm")]
    Norm,
    #[serde(rename = "weibull_min")]
    #[value(name = "weibull_min")]
    WeibullMin,
    #[serde(rename = "weibull_max")]
    #[value(name = "weibull_max")]
    WeibullMax,
}

/// The candidate list used when the caller does not pick one.
pub const DEFAULT_FAMILIES: [Family; 7] = Family::ALL;

impl Family {
    pub const ALL: [Family; 7] = [
        Family::Gamma,
        Family::LogNorm,
        Family::Beta,
        Family::Expon,
        Family::Norm,
        Family::WeibullMin,
        Family::WeibullMax,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Family::Gamma => "gamma",
            Family::LogNorm => "lognorm",
            Family::Beta => "beta",
            Family::Expon => "expon",
            Family::Norm => "norm",
            Family::WeibullMin => "weibull_min",
            Family::WeibullMax => "weibull_max",
        }
    }

    /// Names of the shape parameters, in the order they are stored.
    pub fn shape_names(self) -> &'static [&'static str] {
        match self {
            Family::Gamma => &["a"],
            Family::LogNorm => &["s"],
            Family::Beta => &["a", "b"],
            Family::Expon | Family::Norm => &[],
            Family::WeibullMin | Family::WeibullMax => &["c"],
        }
    }

    /// Total parameter count for information criteria (shapes + loc + scale).
    pub fn param_count(self) -> usize {
        self.shape_names().len() + 2
    }

    /// Families whose maximum-likelihood estimate has a closed form.
    pub fn is_closed_form(self) -> bool {
        matches!(self, Family::Expon | Family::Norm)
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Goodness-of-fit metric used to rank families (lower is better).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[value(name = "sumsquare_error")]
    SumsquareError,
    Aic,
    Bic,
    #[value(name = "kl_div")]
    KlDiv,
    #[value(name = "ks_statistic")]
    KsStatistic,
}

impl Metric {
    pub fn name(self) -> &'static str {
        match self {
            Metric::SumsquareError => "sumsquare_error",
            Metric::Aic => "aic",
            Metric::Bic => "bic",
            Metric::KlDiv => "kl_div",
            Metric::KsStatistic => "ks_statistic",
        }
    }

    /// Score used for ranking; NaN ranks like +∞.
    pub fn score(self, scores: &FitScores) -> f64 {
        let v = match self {
            Metric::SumsquareError => scores.sumsquare_error,
            Metric::Aic => scores.aic,
            Metric::Bic => scores.bic,
            Metric::KlDiv => scores.kl_div,
            Metric::KsStatistic => scores.ks_statistic,
        };
        if v.is_nan() { f64::INFINITY } else { v }
    }
}

/// Which derived series a fit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Energy,
    TimeOfDay,
}

impl SeriesKind {
    pub fn display_name(self) -> &'static str {
        match self {
            SeriesKind::Energy => "Energy (kWh)",
            SeriesKind::TimeOfDay => "Start time of day (s)",
        }
    }
}

/// One charging session as read from the CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargingSession {
    /// 1-based line number in the source file (header is line 1).
    pub line: usize,
    pub start: NaiveDateTime,
    /// `None` when the energy cell is empty or an NA marker.
    pub energy_kwh: Option<f64>,
}

/// Fitted parameters of a location/scale family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitParams {
    pub shapes: Vec<f64>,
    pub loc: f64,
    pub scale: f64,
}

impl FitParams {
    /// Parameters paired with their names (`shapes..., loc, scale`).
    pub fn named(&self, family: Family) -> Vec<(&'static str, f64)> {
        let mut out: Vec<(&'static str, f64)> = family
            .shape_names()
            .iter()
            .copied()
            .zip(self.shapes.iter().copied())
            .collect();
        out.push(("loc", self.loc));
        out.push(("scale", self.scale));
        out
    }
}

/// Goodness-of-fit diagnostics for one fitted family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitScores {
    pub sumsquare_error: f64,
    pub aic: f64,
    pub bic: f64,
    pub kl_div: f64,
    pub ks_statistic: f64,
    pub ks_pvalue: f64,
    pub log_likelihood: f64,
}

/// Fit output for a single family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub family: Family,
    pub params: FitParams,
    pub scores: FitScores,
    /// Simplex iterations spent (0 for closed-form families).
    pub iterations: usize,
}

/// A family that could not be fitted, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitFailure {
    pub family: Family,
    pub reason: String,
}

/// Equal-width density histogram (`count / (n * width)` per bin).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub density: Vec<f64>,
}

impl Histogram {
    pub fn centers(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
    }

    pub fn bin_width(&self) -> f64 {
        match (self.edges.first(), self.edges.last()) {
            (Some(a), Some(b)) if !self.density.is_empty() => (b - a) / self.density.len() as f64,
            _ => 0.0,
        }
    }
}

/// Ranked fits for one series.
#[derive(Debug, Clone)]
pub struct SeriesFit {
    pub kind: SeriesKind,
    pub n: usize,
    pub metric: Metric,
    pub histogram: Histogram,
    /// Successful fits, best first.
    pub ranked: Vec<FitResult>,
    pub failures: Vec<FitFailure>,
}

impl SeriesFit {
    pub fn best(&self) -> Option<&FitResult> {
        self.ranked.first()
    }
}

/// A full `fit` run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags, environment variables and defaults.
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub csv_path: PathBuf,
    pub time_column: String,
    pub energy_column: String,

    pub families: Vec<Family>,
    pub bins: usize,
    pub max_iter: usize,
    pub timeout: Duration,
    pub metric: Metric,

    /// Derive the time-of-day series from the same rows as the energy series.
    pub aligned: bool,

    pub top_n: usize,
    pub show_params: bool,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export: Option<PathBuf>,
}

/// Configuration of the synthetic dataset generator.
#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub out: PathBuf,
    pub rows: usize,
    pub seed: u64,
    pub missing_prob: f64,
    pub stations: usize,
}

/// A saved fit report (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitReportFile {
    pub tool: String,
    pub source: String,
    pub rows: usize,
    pub aligned: bool,
    pub metric: Metric,
    pub series: Vec<SeriesReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesReport {
    pub series: SeriesKind,
    pub n: usize,
    pub histogram: Histogram,
    pub fits: Vec<FitEntry>,
    pub failures: Vec<FitFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitEntry {
    pub rank: usize,
    pub family: Family,
    pub params: Vec<NamedParam>,
    pub scores: FitScores,
    pub iterations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedParam {
    pub name: String,
    pub value: f64,
}
