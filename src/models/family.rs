//! Density, CDF and log-likelihood evaluation for the candidate families.
//!
//! Every family is evaluated on the standardized variable
//! `z = (x - loc) / scale` (`(loc - x) / scale` for `weibull_max`), so:
//!
//! - `pdf(x) = f(z) / scale`
//! - `cdf(x) = F(z)` (`1 - F(z)` for `weibull_max`)
//!
//! Pointwise densities and CDFs come from `statrs`. The log-likelihood used
//! inside the optimizer is written out per family instead: it runs once per
//! objective evaluation over the whole series, and hoisting the normalizing
//! constants (`ln Γ(a)`, `ln B(a, b)`) out of the loop keeps it cheap.

use std::f64::consts::PI;

use statrs::distribution::{Beta, Continuous, ContinuousCDF, Exp, Gamma, LogNormal, Normal, Weibull};
use statrs::function::beta::ln_beta;
use statrs::function::gamma::ln_gamma;

use crate::domain::{Family, FitParams};

#[derive(Debug, Clone)]
enum Standard {
    Gamma(Gamma),
    LogNormal(LogNormal),
    Beta(Beta),
    Exp(Exp),
    Normal(Normal),
    Weibull(Weibull),
}

/// A family with concrete parameters, ready for evaluation.
#[derive(Debug, Clone)]
pub struct FittedDistribution {
    family: Family,
    params: FitParams,
    standard: Standard,
}

impl FittedDistribution {
    /// Returns `None` when the parameters are outside the family's domain.
    pub fn new(family: Family, params: FitParams) -> Option<Self> {
        if !valid_params(family, &params) {
            return None;
        }
        let shape = |i: usize| params.shapes[i];
        let standard = match family {
            Family::Gamma => Standard::Gamma(Gamma::new(shape(0), 1.0).ok()?),
            Family::LogNorm => Standard::LogNormal(LogNormal::new(0.0, shape(0)).ok()?),
            Family::Beta => Standard::Beta(Beta::new(shape(0), shape(1)).ok()?),
            Family::Expon => Standard::Exp(Exp::new(1.0).ok()?),
            Family::Norm => Standard::Normal(Normal::new(0.0, 1.0).ok()?),
            Family::WeibullMin | Family::WeibullMax => Standard::Weibull(Weibull::new(shape(0), 1.0).ok()?),
        };
        Some(Self {
            family,
            params,
            standard,
        })
    }

    fn standardize(&self, x: f64) -> f64 {
        match self.family {
            Family::WeibullMax => (self.params.loc - x) / self.params.scale,
            _ => (x - self.params.loc) / self.params.scale,
        }
    }

    pub fn pdf(&self, x: f64) -> f64 {
        let z = self.standardize(x);
        let f = match &self.standard {
            Standard::Gamma(d) => d.pdf(z),
            Standard::LogNormal(d) => d.pdf(z),
            Standard::Beta(d) => d.pdf(z),
            Standard::Exp(d) => d.pdf(z),
            Standard::Normal(d) => d.pdf(z),
            Standard::Weibull(d) => d.pdf(z),
        };
        f / self.params.scale
    }

    pub fn cdf(&self, x: f64) -> f64 {
        let z = self.standardize(x);
        let f = match &self.standard {
            Standard::Gamma(d) => d.cdf(z),
            Standard::LogNormal(d) => d.cdf(z),
            Standard::Beta(d) => d.cdf(z),
            Standard::Exp(d) => d.cdf(z),
            Standard::Normal(d) => d.cdf(z),
            Standard::Weibull(d) => d.cdf(z),
        };
        match self.family {
            Family::WeibullMax => 1.0 - f,
            _ => f,
        }
    }
}

fn valid_params(family: Family, params: &FitParams) -> bool {
    params.shapes.len() == family.shape_names().len()
        && params.shapes.iter().all(|s| s.is_finite() && *s > 0.0)
        && params.loc.is_finite()
        && params.scale.is_finite()
        && params.scale > 0.0
}

/// `Σ ln pdf(x_i)`; `-∞` when any point falls outside the support and NaN
/// for invalid parameters.
pub fn log_likelihood(family: Family, params: &FitParams, data: &[f64]) -> f64 {
    if !valid_params(family, params) {
        return f64::NAN;
    }
    let FitParams { shapes, loc, scale } = params;
    let (loc, scale) = (*loc, *scale);
    let n = data.len() as f64;

    let standardized = |x: f64| match family {
        Family::WeibullMax => (loc - x) / scale,
        _ => (x - loc) / scale,
    };

    let mut sum = 0.0;
    match family {
        Family::Gamma => {
            let a = shapes[0];
            for &x in data {
                let z = standardized(x);
                if z <= 0.0 {
                    return f64::NEG_INFINITY;
                }
                sum += (a - 1.0) * z.ln() - z;
            }
            sum -= n * ln_gamma(a);
        }
        Family::LogNorm => {
            let s = shapes[0];
            let inv_two_var = 1.0 / (2.0 * s * s);
            for &x in data {
                let z = standardized(x);
                if z <= 0.0 {
                    return f64::NEG_INFINITY;
                }
                let lz = z.ln();
                sum += -lz - lz * lz * inv_two_var;
            }
            sum -= n * (s.ln() + 0.5 * (2.0 * PI).ln());
        }
        Family::Beta => {
            let (a, b) = (shapes[0], shapes[1]);
            for &x in data {
                let z = standardized(x);
                if z <= 0.0 || z >= 1.0 {
                    return f64::NEG_INFINITY;
                }
                sum += (a - 1.0) * z.ln() + (b - 1.0) * (-z).ln_1p();
            }
            sum -= n * ln_beta(a, b);
        }
        Family::Expon => {
            for &x in data {
                let z = standardized(x);
                if z < 0.0 {
                    return f64::NEG_INFINITY;
                }
                sum -= z;
            }
        }
        Family::Norm => {
            for &x in data {
                let z = standardized(x);
                sum -= 0.5 * z * z;
            }
            sum -= n * 0.5 * (2.0 * PI).ln();
        }
        Family::WeibullMin | Family::WeibullMax => {
            let c = shapes[0];
            for &x in data {
                let z = standardized(x);
                if z <= 0.0 {
                    return f64::NEG_INFINITY;
                }
                sum += (c - 1.0) * z.ln() - z.powf(c);
            }
            sum += n * c.ln();
        }
    }

    sum - n * scale.ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(shapes: &[f64], loc: f64, scale: f64) -> FitParams {
        FitParams {
            shapes: shapes.to_vec(),
            loc,
            scale,
        }
    }

    fn cases() -> Vec<(Family, FitParams)> {
        vec![
            (Family::Gamma, params(&[2.5], -1.0, 3.0)),
            (Family::LogNorm, params(&[0.6], 0.5, 2.0)),
            (Family::Beta, params(&[2.0, 3.5], 0.0, 12.0)),
            (Family::Expon, params(&[], 0.2, 4.0)),
            (Family::Norm, params(&[], 5.0, 2.0)),
            (Family::WeibullMin, params(&[1.7], 0.0, 6.0)),
            (Family::WeibullMax, params(&[2.2], 14.0, 6.0)),
        ]
    }

    #[test]
    fn log_likelihood_matches_pointwise_density() {
        let data = [0.7, 1.3, 2.9, 4.4, 6.1, 8.0, 9.5];
        for (family, p) in cases() {
            let dist = FittedDistribution::new(family, p.clone()).unwrap();
            let pointwise: f64 = data.iter().map(|&x| dist.pdf(x).ln()).sum();
            let fast = log_likelihood(family, &p, &data);
            assert!(
                (pointwise - fast).abs() < 1e-9 * (1.0 + fast.abs()),
                "{family}: pointwise={pointwise} fast={fast}"
            );
        }
    }

    #[test]
    fn cdf_is_monotone_and_bounded() {
        for (family, p) in cases() {
            let dist = FittedDistribution::new(family, p).unwrap();
            let mut prev = -1.0;
            for i in 0..=200 {
                let x = -5.0 + i as f64 * 0.1;
                let f = dist.cdf(x);
                assert!((0.0..=1.0).contains(&f), "{family} cdf({x}) = {f}");
                assert!(f + 1e-12 >= prev, "{family} not monotone at {x}");
                prev = f;
            }
        }
    }

    #[test]
    fn weibull_max_mirrors_weibull_min() {
        let min = FittedDistribution::new(Family::WeibullMin, params(&[1.8], 0.0, 2.0)).unwrap();
        let max = FittedDistribution::new(Family::WeibullMax, params(&[1.8], 0.0, 2.0)).unwrap();
        for x in [0.3, 1.0, 2.5] {
            assert!((min.pdf(x) - max.pdf(-x)).abs() < 1e-12);
            assert!((min.cdf(x) - (1.0 - max.cdf(-x))).abs() < 1e-12);
        }
    }

    #[test]
    fn outside_support_is_negative_infinity() {
        let p = params(&[2.0], 1.0, 1.0);
        assert_eq!(log_likelihood(Family::Gamma, &p, &[0.5, 2.0]), f64::NEG_INFINITY);
        let beta = params(&[2.0, 2.0], 0.0, 1.0);
        assert_eq!(log_likelihood(Family::Beta, &beta, &[0.5, 1.0]), f64::NEG_INFINITY);
    }

    #[test]
    fn invalid_params_are_rejected() {
        assert!(FittedDistribution::new(Family::Norm, params(&[], 0.0, 0.0)).is_none());
        assert!(FittedDistribution::new(Family::Gamma, params(&[], 0.0, 1.0)).is_none());
        assert!(FittedDistribution::new(Family::Beta, params(&[1.0, -1.0], 0.0, 1.0)).is_none());
        assert!(log_likelihood(Family::Gamma, &params(&[-1.0], 0.0, 1.0), &[1.0]).is_nan());
    }
}
