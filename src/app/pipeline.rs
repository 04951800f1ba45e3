//! Shared "fit pipeline" logic.
//!
//! Keeping this in one place keeps the core workflow testable without a terminal:
//! CSV load -> series derivation -> per-series fit + ranking
//!
//! The CLI can then focus on presentation (printing, plotting, exports).

use crate::data::{DerivedSeries, derive_series};
use crate::domain::{FitConfig, SeriesFit, SeriesKind};
use crate::error::AppError;
use crate::fit::fitter::FitOptions;
use crate::fit::selection::fit_series;
use crate::io::ingest::{SessionData, load_sessions};

/// All computed outputs of a single `evfit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub data: SessionData,
    pub series: DerivedSeries,
    pub energy: SeriesFit,
    pub time_of_day: SeriesFit,
}

/// Execute the full fitting pipeline and return the computed outputs.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    // 1) Load and clean the sessions.
    let data = load_sessions(&config.csv_path, &config.time_column, &config.energy_column)?;
    tracing::info!(
        path = %config.csv_path.display(),
        rows = data.rows_read,
        missing_energy = data.missing_energy,
        "dataset loaded"
    );

    // 2) Derive both series.
    let series = derive_series(&data.sessions, config.aligned);
    tracing::info!(
        energy = series.energy.len(),
        time_of_day = series.time_of_day.len(),
        aligned = config.aligned,
        "series derived"
    );

    // 3) Fit the same candidate list to each series.
    let opts = FitOptions {
        bins: config.bins,
        max_iter: config.max_iter,
        timeout: config.timeout,
    };
    let energy = fit_series(SeriesKind::Energy, &series.energy, &config.families, config.metric, &opts)?;
    let time_of_day = fit_series(
        SeriesKind::TimeOfDay,
        &series.time_of_day,
        &config.families,
        config.metric,
        &opts,
    )?;

    Ok(RunOutput {
        data,
        series,
        energy,
        time_of_day,
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::domain::{Family, Metric};

    fn write_csv(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("evfit_{name}_{}.csv", std::process::id()));
        std::fs::write(&path, body).unwrap();
        path
    }

    fn config(path: PathBuf, aligned: bool) -> FitConfig {
        FitConfig {
            csv_path: path,
            time_column: "Start Date".to_string(),
            energy_column: "Energy (kWh)".to_string(),
            families: vec![Family::Norm, Family::Expon, Family::Gamma],
            bins: 10,
            max_iter: 2000,
            timeout: Duration::from_secs(30),
            metric: Metric::SumsquareError,
            aligned,
            top_n: 5,
            show_params: false,
            plot: false,
            plot_width: 80,
            plot_height: 20,
            export: None,
        }
    }

    const SESSIONS: &str = "\
Station Name,Start Date,Energy (kWh)
A,7/29/2011 8:05,6.25
B,7/29/2011 9:40,3.10
A,7/29/2011 11:15,
C,7/30/2011 12:30,8.75
B,7/30/2011 14:30,12.40
A,7/31/2011 17:55,4.95
C,7/31/2011 20:10,2.20
";

    #[test]
    fn empty_energy_cell_shortens_only_the_energy_series() {
        let path = write_csv("pipeline_default", SESSIONS);
        let out = run_fit(&config(path.clone(), false)).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(out.data.rows_read, 7);
        assert_eq!(out.series.energy.len(), 6);
        assert_eq!(out.series.time_of_day.len(), 7);
        assert_eq!(out.energy.n, 6);
        assert_eq!(out.time_of_day.n, 7);
        assert_eq!(out.series.time_of_day[0], 29_100.0);
        assert_eq!(out.energy.ranked.len() + out.energy.failures.len(), 3);
    }

    #[test]
    fn aligned_mode_uses_the_same_rows() {
        let path = write_csv("pipeline_aligned", SESSIONS);
        let out = run_fit(&config(path.clone(), true)).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(out.series.energy.len(), 6);
        assert_eq!(out.series.time_of_day.len(), 6);
        assert!(!out.series.time_of_day.contains(&40_500.0));
    }

    #[test]
    fn missing_energy_column_is_an_input_error() {
        let path = write_csv("pipeline_no_energy", "Start Date,kWh\n7/29/2011 8:05,1.0\n");
        let err = run_fit(&config(path.clone(), false)).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let err = run_fit(&config(PathBuf::from("/nonexistent/evfit.csv"), false)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
