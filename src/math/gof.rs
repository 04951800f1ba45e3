//! Goodness-of-fit statistics.
//!
//! - sum of squared errors between a fitted density and a histogram
//! - relative entropy (KL divergence) of the histogram against the fitted density
//! - one-sample Kolmogorov–Smirnov statistic and its asymptotic p-value

use std::f64::consts::PI;

/// `Σ (fitted_i - observed_i)²`.
pub fn sumsquare_error(fitted: &[f64], observed: &[f64]) -> f64 {
    fitted
        .iter()
        .zip(observed)
        .map(|(f, o)| (f - o) * (f - o))
        .sum()
}

/// `Σ x_i ln(x_i / y_i) - x_i + y_i` of the observed density `x` against the
/// fitted density `y`.
///
/// An empty observed bin contributes `y_i`, so sparse tails stay finite. The
/// sum is `+∞` only when the fit puts no density on an occupied bin.
pub fn kl_divergence(observed: &[f64], fitted: &[f64]) -> f64 {
    observed.iter().zip(fitted).map(|(&x, &y)| kl_term(x, y)).sum()
}

fn kl_term(x: f64, y: f64) -> f64 {
    if x > 0.0 && y > 0.0 {
        x * (x / y).ln() - x + y
    } else if x == 0.0 && y >= 0.0 {
        y
    } else {
        f64::INFINITY
    }
}

/// Kolmogorov–Smirnov `D` for `sorted` data against a model CDF.
///
/// `sorted` must be ascending.
pub fn ks_statistic<F>(sorted: &[f64], cdf: F) -> f64
where
    F: Fn(f64) -> f64,
{
    let n = sorted.len() as f64;
    let mut d: f64 = 0.0;
    for (i, &x) in sorted.iter().enumerate() {
        let f = cdf(x);
        if !f.is_finite() {
            return f64::NAN;
        }
        let above = (i as f64 + 1.0) / n - f;
        let below = f - i as f64 / n;
        d = d.max(above).max(below);
    }
    d
}

/// Asymptotic p-value for a KS statistic `d` from `n` observations.
///
/// Uses Stephens' effective-size correction `(√n + 0.12 + 0.11/√n)·d`.
pub fn ks_pvalue(d: f64, n: usize) -> f64 {
    if !d.is_finite() || n == 0 {
        return f64::NAN;
    }
    let sqrt_n = (n as f64).sqrt();
    kolmogorov_q((sqrt_n + 0.12 + 0.11 / sqrt_n) * d)
}

/// Complementary Kolmogorov distribution `Q(λ) = P(K > λ)`.
pub fn kolmogorov_q(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }
    if lambda < 1.18 {
        // Q = 1 - √(2π)/λ · Σ exp(-(2j-1)²π²/(8λ²)); converges fast for small λ.
        let y = -PI * PI / (8.0 * lambda * lambda);
        let mut sum = 0.0;
        for j in 1..=6 {
            let k = (2 * j - 1) as f64;
            sum += (k * k * y).exp();
        }
        return (1.0 - (2.0 * PI).sqrt() / lambda * sum).clamp(0.0, 1.0);
    }

    // Q = 2 Σ (-1)^(j-1) exp(-2 j² λ²); alternating, fast for large λ.
    let mut sum = 0.0;
    let mut sign = 1.0;
    for j in 1..=100 {
        let jf = j as f64;
        let term = (-2.0 * jf * jf * lambda * lambda).exp();
        sum += sign * term;
        if term < 1e-16 * sum.abs().max(f64::MIN_POSITIVE) {
            break;
        }
        sign = -sign;
    }
    (2.0 * sum).clamp(0.0, 1.0)
}
