//! Fit every candidate family to a series and rank the results.
//!
//! Selection rules:
//! 1. Families are fitted independently (in parallel); a family that fails is
//!    recorded with its reason and left out of the ranking.
//! 2. Successful fits are sorted ascending by the chosen metric (NaN ranks last).
//! 3. Ties keep the order of the candidate list.
//! 4. The series fails only if every family fails.

use rayon::prelude::*;

use crate::domain::{Family, FitFailure, FitResult, Metric, SeriesFit, SeriesKind};
use crate::error::AppError;
use crate::fit::fitter::{FitOptions, SeriesSummary, fit_family};
use crate::math::density_histogram;

/// Fit `families` to `data` and rank them by `metric`.
pub fn fit_series(
    kind: SeriesKind,
    data: &[f64],
    families: &[Family],
    metric: Metric,
    opts: &FitOptions,
) -> Result<SeriesFit, AppError> {
    if families.is_empty() {
        return Err(AppError::input("No candidate distributions selected."));
    }

    let summary = SeriesSummary::from_data(data)
        .map_err(|e| AppError::data(format!("{}: {e}", kind.display_name())))?;
    let histogram = density_histogram(data, opts.bins)?;

    // Evaluate each family independently (parallel); collect keeps input order.
    let outcomes: Vec<(Family, Result<FitResult, AppError>)> = families
        .par_iter()
        .map(|&family| (family, fit_family(family, data, &summary, &histogram, opts)))
        .collect();

    let mut ranked = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for (family, outcome) in outcomes {
        match outcome {
            Ok(fit) => {
                tracing::debug!(
                    series = ?kind,
                    %family,
                    iterations = fit.iterations,
                    score = metric.score(&fit.scores),
                    "fitted"
                );
                ranked.push(fit);
            }
            Err(e) => {
                tracing::warn!(series = ?kind, %family, error = %e, "fit failed");
                failures.push(FitFailure {
                    family,
                    reason: e.message().to_string(),
                });
            }
        }
    }

    if ranked.is_empty() {
        return Err(AppError::fit(format!(
            "{}: none of the {} candidate distributions could be fitted.",
            kind.display_name(),
            families.len()
        )));
    }

    rank_fits(&mut ranked, metric);

    Ok(SeriesFit {
        kind,
        n: summary.n,
        metric,
        histogram,
        ranked,
        failures,
    })
}

/// Sort fits ascending by `metric`; the sort is stable so ties keep their order.
pub fn rank_fits(fits: &mut [FitResult], metric: Metric) {
    fits.sort_by(|a, b| metric.score(&a.scores).total_cmp(&metric.score(&b.scores)));
}
