//! Fitting routines for a single distribution family.
//!
//! Given a series `x_i` we:
//! - estimate the family's parameters by maximum likelihood
//! - score the fitted density against the series' density histogram
//!
//! `norm` and `expon` have closed-form estimates. The other families are fitted
//! with a Nelder–Mead search over an unconstrained reparametrization that keeps
//! every observation inside the support:
//!
//! ```text
//! gamma / lognorm / weibull_min : [ln shape, ln(gap/span), ln scale]   loc = min - gap
//! weibull_max                   : [ln c,     ln(gap/span), ln scale]   loc = max + gap
//! beta                          : [ln a, ln b, ln(lo/span), ln(hi/span)]
//!                                 loc = min - lo, scale = span + lo + hi
//! ```
//!
//! Gaps are bounded below, so families whose likelihood is unbounded as `loc`
//! approaches the data (e.g. gamma with `a < 1`) stop at a finite point.

use std::time::{Duration, Instant};

use nalgebra::DVector;
use statrs::function::gamma::gamma;
use statrs::statistics::Statistics;

use crate::domain::{Family, FitParams, FitResult, FitScores, Histogram};
use crate::error::AppError;
use crate::math::{SimplexOptions, kl_divergence, ks_pvalue, ks_statistic, nelder_mead, sumsquare_error};
use crate::models::{FittedDistribution, log_likelihood};

/// Bounds on `ln(gap / span)`.
const GAP_LOG_MIN: f64 = -20.7; // ~1e-9 of the span
const GAP_LOG_MAX: f64 = 5.0;
/// Bound on the magnitude of log shapes/scales, keeps `exp` finite.
const LOG_PARAM_MAX: f64 = 40.0;
/// Number of simplex restarts from the previous optimum.
const RESTARTS: usize = 2;

/// Fitting options shared by every family of a run.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Density histogram bin count.
    pub bins: usize,
    /// Simplex iteration budget per search.
    pub max_iter: usize,
    /// Wall-clock budget per family.
    pub timeout: Duration,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            bins: 100,
            max_iter: 2000,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Series statistics computed once and shared by every family.
#[derive(Debug, Clone)]
pub struct SeriesSummary {
    pub n: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    /// Population skewness.
    pub skewness: f64,
    /// Ascending copy of the data (for the KS statistic).
    pub sorted: Vec<f64>,
}

impl SeriesSummary {
    pub fn from_data(data: &[f64]) -> Result<Self, AppError> {
        if data.len() < 2 {
            return Err(AppError::data(format!(
                "Need at least 2 values to fit a distribution, got {}.",
                data.len()
            )));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(AppError::data("Series contains non-finite values."));
        }

        let mut sorted = data.to_vec();
        sorted.sort_by(f64::total_cmp);
        let min = sorted[0];
        let max = sorted[sorted.len() - 1];
        if max <= min {
            return Err(AppError::data(format!("Series has zero spread (every value is {min}).")));
        }

        let mean = Statistics::mean(data);
        let std_dev = Statistics::population_std_dev(data);
        let n = data.len() as f64;
        let skewness = if std_dev > 0.0 {
            data.iter().map(|x| ((x - mean) / std_dev).powi(3)).sum::<f64>() / n
        } else {
            0.0
        };

        Ok(Self {
            n: data.len(),
            min,
            max,
            mean,
            std_dev,
            skewness,
            sorted,
        })
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Fit and score one family.
pub fn fit_family(
    family: Family,
    data: &[f64],
    summary: &SeriesSummary,
    histogram: &Histogram,
    opts: &FitOptions,
) -> Result<FitResult, AppError> {
    let (params, iterations) = estimate_params(family, data, summary, opts)?;
    let scores = score_fit(family, &params, data, summary, histogram)?;
    Ok(FitResult {
        family,
        params,
        scores,
        iterations,
    })
}

/// Maximum-likelihood parameter estimate; returns the parameters and the
/// number of simplex iterations spent.
pub fn estimate_params(
    family: Family,
    data: &[f64],
    summary: &SeriesSummary,
    opts: &FitOptions,
) -> Result<(FitParams, usize), AppError> {
    if family.is_closed_form() {
        return Ok((closed_form_params(family, summary), 0));
    }
    maximize_likelihood(family, data, summary, opts)
}

/// Exact MLE for `norm` and `expon`.
fn closed_form_params(family: Family, summary: &SeriesSummary) -> FitParams {
    let (loc, scale) = match family {
        Family::Expon => (summary.min, summary.mean - summary.min),
        _ => (summary.mean, summary.std_dev),
    };
    FitParams {
        shapes: Vec::new(),
        loc,
        scale,
    }
}

fn maximize_likelihood(
    family: Family,
    data: &[f64],
    summary: &SeriesSummary,
    opts: &FitOptions,
) -> Result<(FitParams, usize), AppError> {
    let reparam = Reparam::new(family, summary);
    let start = start_params(family, data, summary);
    let mut theta = reparam.pack(&start);

    let simplex_opts = SimplexOptions {
        max_iter: opts.max_iter,
        // A timeout past the clock's range means no deadline.
        deadline: Instant::now().checked_add(opts.timeout),
        ..SimplexOptions::default()
    };
    let objective = |theta: &DVector<f64>| -log_likelihood(family, &reparam.unpack(theta), data);

    let mut iterations = 0usize;
    let mut best_f = f64::INFINITY;
    for _ in 0..RESTARTS {
        let min = nelder_mead(&objective, theta.clone(), &simplex_opts)
            .map_err(|e| AppError::fit(format!("{family}: {e}")))?;
        iterations += min.iterations;
        let improved = min.f < best_f;
        if improved {
            best_f = min.f;
            theta = min.x;
        }
        tracing::trace!(%family, nll = min.f, iterations = min.iterations, stop = ?min.stop, "simplex pass");
        if !improved {
            break;
        }
    }

    if !best_f.is_finite() {
        return Err(AppError::fit(format!(
            "{family}: no parameters with a finite likelihood were found."
        )));
    }
    Ok((reparam.unpack(&theta), iterations))
}

/// Mapping between unconstrained search coordinates and family parameters.
#[derive(Debug, Clone, Copy)]
struct Reparam {
    family: Family,
    min: f64,
    max: f64,
    span: f64,
}

impl Reparam {
    fn new(family: Family, summary: &SeriesSummary) -> Self {
        Self {
            family,
            min: summary.min,
            max: summary.max,
            span: summary.span(),
        }
    }

    fn gap(&self, log_rel: f64) -> f64 {
        self.span * log_rel.clamp(GAP_LOG_MIN, GAP_LOG_MAX).exp()
    }

    fn log_gap(&self, gap: f64) -> f64 {
        (gap / self.span).ln().clamp(GAP_LOG_MIN, GAP_LOG_MAX)
    }

    fn unpack(&self, theta: &DVector<f64>) -> FitParams {
        let e = |v: f64| v.clamp(-LOG_PARAM_MAX, LOG_PARAM_MAX).exp();
        match self.family {
            Family::Beta => {
                let lo = self.gap(theta[2]);
                let hi = self.gap(theta[3]);
                FitParams {
                    shapes: vec![e(theta[0]), e(theta[1])],
                    loc: self.min - lo,
                    scale: self.span + lo + hi,
                }
            }
            Family::WeibullMax => FitParams {
                shapes: vec![e(theta[0])],
                loc: self.max + self.gap(theta[1]),
                scale: e(theta[2]),
            },
            _ => FitParams {
                shapes: vec![e(theta[0])],
                loc: self.min - self.gap(theta[1]),
                scale: e(theta[2]),
            },
        }
    }

    fn pack(&self, params: &FitParams) -> DVector<f64> {
        let l = |v: f64| v.ln().clamp(-LOG_PARAM_MAX, LOG_PARAM_MAX);
        match self.family {
            Family::Beta => {
                let lo = self.min - params.loc;
                let hi = params.loc + params.scale - self.max;
                DVector::from_row_slice(&[
                    l(params.shapes[0]),
                    l(params.shapes[1]),
                    self.log_gap(lo),
                    self.log_gap(hi),
                ])
            }
            Family::WeibullMax => DVector::from_row_slice(&[
                l(params.shapes[0]),
                self.log_gap(params.loc - self.max),
                l(params.scale),
            ]),
            _ => DVector::from_row_slice(&[
                l(params.shapes[0]),
                self.log_gap(self.min - params.loc),
                l(params.scale),
            ]),
        }
    }
}

/// Method-of-moments style starting point for the simplex search.
///
/// Every start keeps the data strictly inside the support.
fn start_params(family: Family, data: &[f64], s: &SeriesSummary) -> FitParams {
    let span = s.span();
    let tiny = span * 1e-6;
    match family {
        Family::Gamma => {
            let a = if s.skewness > 0.1 {
                (4.0 / (s.skewness * s.skewness)).clamp(0.05, 1e4)
            } else {
                100.0
            };
            let scale = s.std_dev / a.sqrt();
            let gap = (s.min - (s.mean - a * scale)).max(0.01 * span);
            let loc = s.min - gap;
            FitParams {
                shapes: vec![a],
                loc,
                scale: ((s.mean - loc) / a).max(tiny),
            }
        }
        Family::LogNorm => {
            let loc = s.min - 0.05 * span;
            let logs: Vec<f64> = data.iter().map(|x| (x - loc).ln()).collect();
            let sigma = Statistics::population_std_dev(&logs).max(1e-3);
            FitParams {
                shapes: vec![sigma],
                loc,
                scale: Statistics::mean(&logs).exp(),
            }
        }
        Family::WeibullMin | Family::WeibullMax => {
            let (loc, mean_dist) = if family == Family::WeibullMin {
                let loc = s.min - 0.05 * span;
                (loc, s.mean - loc)
            } else {
                let loc = s.max + 0.05 * span;
                (loc, loc - s.mean)
            };
            // Justus' approximation of the shape from the coefficient of variation.
            let cv = (s.std_dev / mean_dist).max(1e-3);
            let c = cv.powf(-1.086).clamp(0.1, 50.0);
            FitParams {
                shapes: vec![c],
                loc,
                scale: (mean_dist / gamma(1.0 + 1.0 / c)).max(tiny),
            }
        }
        Family::Beta => {
            let loc = s.min - 0.01 * span;
            let scale = span * 1.02;
            let zm = (s.mean - loc) / scale;
            let zv = (s.std_dev / scale).powi(2);
            let common = (zm * (1.0 - zm) / zv - 1.0).max(0.5);
            FitParams {
                shapes: vec![(zm * common).clamp(0.05, 1e4), ((1.0 - zm) * common).clamp(0.05, 1e4)],
                loc,
                scale,
            }
        }
        Family::Expon | Family::Norm => FitParams {
            shapes: Vec::new(),
            loc: s.mean,
            scale: s.std_dev,
        },
    }
}

/// Score fitted parameters against the data and its histogram.
pub fn score_fit(
    family: Family,
    params: &FitParams,
    data: &[f64],
    summary: &SeriesSummary,
    histogram: &Histogram,
) -> Result<FitScores, AppError> {
    let dist = FittedDistribution::new(family, params.clone())
        .ok_or_else(|| AppError::fit(format!("{family}: fitted parameters are invalid ({params:?}).")))?;

    let fitted: Vec<f64> = histogram.centers().into_iter().map(|x| dist.pdf(x)).collect();
    let sse = sumsquare_error(&fitted, &histogram.density);
    if !sse.is_finite() {
        return Err(AppError::fit(format!("{family}: fitted density is not finite on the histogram.")));
    }

    let ll = log_likelihood(family, params, data);
    let k = family.param_count() as f64;
    let n = summary.n as f64;
    let ks = ks_statistic(&summary.sorted, |x| dist.cdf(x));

    Ok(FitScores {
        sumsquare_error: sse,
        aic: 2.0 * k - 2.0 * ll,
        bic: k * n.ln() - 2.0 * ll,
        kl_div: kl_divergence(&histogram.density, &fitted),
        ks_statistic: ks,
        ks_pvalue: ks_pvalue(ks, summary.n),
        log_likelihood: ll,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::density_histogram;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Exp, Gamma, Normal, Weibull};

    fn draw<D: Distribution<f64>>(dist: D, n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| dist.sample(&mut rng)).collect()
    }

    fn fit(family: Family, data: &[f64]) -> FitResult {
        let summary = SeriesSummary::from_data(data).unwrap();
        let hist = density_histogram(data, 50).unwrap();
        fit_family(family, data, &summary, &hist, &FitOptions::default()).unwrap()
    }

    #[test]
    fn norm_closed_form() {
        let data = draw(Normal::new(10.0, 2.0).unwrap(), 5000, 1);
        let r = fit(Family::Norm, &data);
        assert!((r.params.loc - 10.0).abs() < 0.1);
        assert!((r.params.scale - 2.0).abs() < 0.1);
        assert_eq!(r.iterations, 0);
    }

    #[test]
    fn expon_closed_form() {
        let data: Vec<f64> = draw(Exp::new(0.5).unwrap(), 5000, 2).into_iter().map(|x| x + 3.0).collect();
        let r = fit(Family::Expon, &data);
        assert!((r.params.loc - 3.0).abs() < 0.01);
        assert!((r.params.scale - 2.0).abs() < 0.1);
    }

    #[test]
    fn gamma_recovers_shape_and_scale() {
        let data = draw(Gamma::new(3.0, 2.0).unwrap(), 5000, 3);
        let r = fit(Family::Gamma, &data);
        let a = r.params.shapes[0];
        // loc is free, so compare the implied mean and shape loosely.
        assert!(a > 2.0 && a < 4.5, "a = {a}");
        let mean = r.params.loc + a * r.params.scale;
        assert!((mean - 6.0).abs() < 0.3, "mean = {mean}");
    }

    #[test]
    fn weibull_min_beats_norm_on_weibull_data() {
        let data = draw(Weibull::new(2.0, 1.2).unwrap(), 4000, 4);
        let w = fit(Family::WeibullMin, &data);
        let n = fit(Family::Norm, &data);
        assert!(w.scores.log_likelihood > n.scores.log_likelihood);
        assert!(w.scores.sumsquare_error < n.scores.sumsquare_error);
    }

    #[test]
    fn mle_is_not_worse_than_start() {
        let data = draw(Gamma::new(5.0, 1.0).unwrap(), 2000, 5);
        let summary = SeriesSummary::from_data(&data).unwrap();
        for family in [Family::Gamma, Family::LogNorm, Family::Beta, Family::WeibullMin, Family::WeibullMax] {
            let start = start_params(family, &data, &summary);
            let start_ll = log_likelihood(family, &start, &data);
            assert!(start_ll.is_finite(), "{family} start outside support");
            let (params, _) = estimate_params(family, &data, &summary, &FitOptions::default()).unwrap();
            let ll = log_likelihood(family, &params, &data);
            assert!(ll >= start_ll, "{family}: {ll} < {start_ll}");
        }
    }

    #[test]
    fn reparam_round_trips_feasible_params() {
        let data = [1.0, 2.0, 4.0, 7.0];
        let summary = SeriesSummary::from_data(&data).unwrap();
        let p = FitParams {
            shapes: vec![2.0, 3.0],
            loc: 0.5,
            scale: 7.0,
        };
        let reparam = Reparam::new(Family::Beta, &summary);
        let back = reparam.unpack(&reparam.pack(&p));
        assert!((back.loc - p.loc).abs() < 1e-12);
        assert!((back.scale - p.scale).abs() < 1e-12);
        assert!((back.shapes[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn scores_are_consistent() {
        let data = draw(Normal::new(0.0, 1.0).unwrap(), 3000, 6);
        let r = fit(Family::Norm, &data);
        let s = &r.scores;
        assert!((s.aic - (4.0 - 2.0 * s.log_likelihood)).abs() < 1e-9);
        assert!(s.bic > s.aic);
        assert!(s.ks_statistic > 0.0 && s.ks_statistic < 0.05);
        assert!(s.ks_pvalue > 0.01);
    }

    #[test]
    fn summary_rejects_degenerate_series() {
        assert_eq!(SeriesSummary::from_data(&[1.0]).unwrap_err().exit_code(), 3);
        assert_eq!(SeriesSummary::from_data(&[2.0, 2.0]).unwrap_err().exit_code(), 3);
    }

    #[test]
    fn timeout_fails_the_family() {
        let data = draw(Gamma::new(2.0, 1.0).unwrap(), 500, 7);
        let summary = SeriesSummary::from_data(&data).unwrap();
        let opts = FitOptions {
            timeout: Duration::ZERO,
            ..FitOptions::default()
        };
        let err = estimate_params(Family::Gamma, &data, &summary, &opts).unwrap_err();
        assert_eq!(err.exit_code(), 4);
        assert!(err.message().starts_with("gamma:"));
    }

    #[test]
    fn unbounded_timeout_still_fits() {
        let data = draw(Gamma::new(2.0, 1.0).unwrap(), 500, 8);
        let summary = SeriesSummary::from_data(&data).unwrap();
        let opts = FitOptions {
            timeout: Duration::MAX,
            ..FitOptions::default()
        };
        let (params, iterations) = estimate_params(Family::Gamma, &data, &summary, &opts).unwrap();
        assert!(iterations > 0);
        assert!(log_likelihood(Family::Gamma, &params, &data).is_finite());
    }
}
