//! Write fit reports as JSON.
//!
//! The report is the portable form of a run: per series the density
//! histogram, every ranked fit with named parameters and scores, and the
//! families that failed. The schema is defined by `domain::FitReportFile`.

use std::fs::File;
use std::path::Path;

use crate::domain::{FitEntry, FitReportFile, Metric, NamedParam, SeriesFit, SeriesReport};
use crate::error::AppError;

/// Build the report document for a run.
pub fn build_report_file(source: &Path, rows: usize, aligned: bool, metric: Metric, series: &[&SeriesFit]) -> FitReportFile {
    FitReportFile {
        tool: "evfit".to_string(),
        source: source.display().to_string(),
        rows,
        aligned,
        metric,
        series: series.iter().map(|s| series_report(s)).collect(),
    }
}

fn series_report(fit: &SeriesFit) -> SeriesReport {
    let fits = fit
        .ranked
        .iter()
        .enumerate()
        .map(|(i, r)| FitEntry {
            rank: i + 1,
            family: r.family,
            params: r
                .params
                .named(r.family)
                .into_iter()
                .map(|(name, value)| NamedParam {
                    name: name.to_string(),
                    value,
                })
                .collect(),
            scores: r.scores.clone(),
            iterations: r.iterations,
        })
        .collect();

    SeriesReport {
        series: fit.kind,
        n: fit.n,
        histogram: fit.histogram.clone(),
        fits,
        failures: fit.failures.clone(),
    }
}

/// Write a report JSON file.
pub fn write_report_json(path: &Path, report: &FitReportFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create report JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::input(format!("Failed to write report JSON: {e}")))?;

    tracing::info!(path = %path.display(), series = report.series.len(), "report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Family, FitFailure, FitParams, FitResult, FitScores, Histogram, SeriesKind};

    fn series_fit() -> SeriesFit {
        SeriesFit {
            kind: SeriesKind::Energy,
            n: 3,
            metric: Metric::SumsquareError,
            histogram: Histogram {
                edges: vec![0.0, 1.0, 2.0],
                density: vec![0.5, 0.5],
            },
            ranked: vec![FitResult {
                family: Family::Gamma,
                params: FitParams {
                    shapes: vec![2.0],
                    loc: -0.1,
                    scale: 0.7,
                },
                scores: FitScores {
                    sumsquare_error: 0.01,
                    aic: 12.0,
                    bic: 13.0,
                    kl_div: 0.02,
                    ks_statistic: 0.1,
                    ks_pvalue: 0.9,
                    log_likelihood: -3.0,
                },
                iterations: 42,
            }],
            failures: vec![FitFailure {
                family: Family::Beta,
                reason: "timed out".to_string(),
            }],
        }
    }

    #[test]
    fn report_names_parameters_and_ranks_from_one() {
        let fit = series_fit();
        let report = build_report_file(Path::new("data.csv"), 4, false, Metric::SumsquareError, &[&fit]);
        assert_eq!(report.tool, "evfit");
        assert_eq!(report.rows, 4);
        let entry = &report.series[0].fits[0];
        assert_eq!(entry.rank, 1);
        let names: Vec<&str> = entry.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "loc", "scale"]);
        assert_eq!(report.series[0].failures[0].family, Family::Beta);
    }

    #[test]
    fn report_json_uses_family_identifiers() {
        let fit = series_fit();
        let report = build_report_file(Path::new("data.csv"), 4, true, Metric::Bic, &[&fit]);
        let path = std::env::temp_dir().join(format!("evfit_report_{}.json", std::process::id()));
        write_report_json(&path, &report).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"family\": \"gamma\""));
        assert!(text.contains("\"series\": \"energy\""));
        assert!(text.contains("\"metric\": \"bic\""));

        let back: FitReportFile = serde_json::from_str(&text).unwrap();
        assert_eq!(back.series[0].fits[0].iterations, 42);
        assert!(back.aligned);
        let _ = std::fs::remove_file(&path);
    }
}
