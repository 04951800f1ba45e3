//! Equal-width density histogram used as the empirical reference shape.
//!
//! Bins span `[min, max]` exactly; every bin is half-open except the last one,
//! which also contains `max`. Densities integrate to 1 over the span.

use crate::domain::Histogram;
use crate::error::AppError;

/// Build a density histogram with `bins` equal-width bins.
pub fn density_histogram(data: &[f64], bins: usize) -> Result<Histogram, AppError> {
    if bins == 0 {
        return Err(AppError::input("Histogram bin count must be >= 1."));
    }
    if data.is_empty() {
        return Err(AppError::data("Cannot build a histogram of an empty series."));
    }

    let (min, max) = data
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !(min.is_finite() && max.is_finite()) {
        return Err(AppError::data("Series contains non-finite values."));
    }
    if max <= min {
        return Err(AppError::data(format!("Series has zero spread (every value is {min}).")));
    }

    let width = (max - min) / bins as f64;
    let edges: Vec<f64> = (0..=bins)
        .map(|i| if i == bins { max } else { min + width * i as f64 })
        .collect();

    let mut counts = vec![0usize; bins];
    for &v in data {
        let idx = (((v - min) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    let norm = data.len() as f64 * width;
    let density = counts.into_iter().map(|c| c as f64 / norm).collect();

    Ok(Histogram { edges, density })
}
