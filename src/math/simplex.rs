//! Nelder–Mead simplex minimization.
//!
//! The likelihood surfaces we optimize are smooth but not cheap to
//! differentiate for every family, so we use the derivative-free simplex
//! method with the standard coefficients (reflection 1, expansion 2,
//! contraction 1/2, shrink 1/2).
//!
//! Implementation choices:
//! - Points are `nalgebra::DVector`s; the problem dimension is tiny (2–4).
//! - Non-finite objective values (including NaN) are treated as `+∞`, so the
//!   objective may simply return `f64::INFINITY` for infeasible points.
//! - The search is fully deterministic: same start, same result.

use std::time::Instant;

use nalgebra::DVector;

use crate::error::AppError;

const RHO: f64 = 1.0;
const CHI: f64 = 2.0;
const PSI: f64 = 0.5;
const SIGMA: f64 = 0.5;

/// Search budget and tolerances.
#[derive(Debug, Clone)]
pub struct SimplexOptions {
    pub max_iter: usize,
    /// Absolute tolerance on the simplex diameter (per coordinate).
    pub x_tol: f64,
    /// Relative tolerance on the spread of objective values.
    pub f_tol: f64,
    /// Offset applied to each coordinate of the start to build the initial simplex.
    pub initial_step: f64,
    /// Give up with an error once this instant has passed.
    pub deadline: Option<Instant>,
}

impl Default for SimplexOptions {
    fn default() -> Self {
        Self {
            max_iter: 2000,
            x_tol: 1e-7,
            f_tol: 1e-11,
            initial_step: 0.25,
            deadline: None,
        }
    }
}

/// Why the search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimplexStop {
    Converged,
    MaxIter,
}

/// Best point found.
#[derive(Debug, Clone)]
pub struct SimplexMinimum {
    pub x: DVector<f64>,
    pub f: f64,
    pub iterations: usize,
    pub stop: SimplexStop,
}

/// Minimize `objective` starting from `x0`.
pub fn nelder_mead<F>(mut objective: F, x0: DVector<f64>, opts: &SimplexOptions) -> Result<SimplexMinimum, AppError>
where
    F: FnMut(&DVector<f64>) -> f64,
{
    let n = x0.len();
    if n == 0 {
        return Err(AppError::fit("Simplex search needs at least one parameter."));
    }

    let mut eval = |x: &DVector<f64>| sanitize(objective(x));

    let mut simplex: Vec<(DVector<f64>, f64)> = Vec::with_capacity(n + 1);
    let f0 = eval(&x0);
    simplex.push((x0.clone(), f0));
    for k in 0..n {
        let mut x = x0.clone();
        x[k] += opts.initial_step;
        let fx = eval(&x);
        simplex.push((x, fx));
    }

    let mut iterations = 0usize;
    loop {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));

        if has_converged(&simplex, opts) {
            return Ok(finish(simplex, iterations, SimplexStop::Converged));
        }
        if iterations >= opts.max_iter {
            return Ok(finish(simplex, iterations, SimplexStop::MaxIter));
        }
        if let Some(deadline) = opts.deadline {
            if Instant::now() >= deadline {
                return Err(AppError::fit(format!(
                    "Simplex search timed out after {iterations} iterations."
                )));
            }
        }
        iterations += 1;

        let centroid = simplex[..n]
            .iter()
            .fold(DVector::<f64>::zeros(n), |acc, (x, _)| acc + x)
            / n as f64;
        let worst = simplex[n].0.clone();
        let f_worst = simplex[n].1;
        let f_best = simplex[0].1;
        let f_second_worst = simplex[n - 1].1;

        let xr = &centroid + (&centroid - &worst) * RHO;
        let fr = eval(&xr);

        if fr < f_best {
            let xe = &centroid + (&centroid - &worst) * (RHO * CHI);
            let fe = eval(&xe);
            simplex[n] = if fe < fr { (xe, fe) } else { (xr, fr) };
            continue;
        }
        if fr < f_second_worst {
            simplex[n] = (xr, fr);
            continue;
        }

        let contracted = if fr < f_worst {
            // Outside contraction.
            let xc = &centroid + (&centroid - &worst) * (PSI * RHO);
            let fc = eval(&xc);
            (fc <= fr).then_some((xc, fc))
        } else {
            // Inside contraction.
            let xcc = &centroid - (&centroid - &worst) * PSI;
            let fcc = eval(&xcc);
            (fcc < f_worst).then_some((xcc, fcc))
        };

        if let Some(point) = contracted {
            simplex[n] = point;
            continue;
        }

        // Shrink towards the best vertex.
        let best = simplex[0].0.clone();
        for vertex in simplex.iter_mut().skip(1) {
            let x = &best + (&vertex.0 - &best) * SIGMA;
            let fx = eval(&x);
            *vertex = (x, fx);
        }
    }
}

fn sanitize(v: f64) -> f64 {
    if v.is_finite() { v } else { f64::INFINITY }
}

fn has_converged(simplex: &[(DVector<f64>, f64)], opts: &SimplexOptions) -> bool {
    let (best_x, best_f) = (&simplex[0].0, simplex[0].1);
    if !best_f.is_finite() {
        return false;
    }
    let x_spread = simplex[1..]
        .iter()
        .map(|(x, _)| (x - best_x).amax())
        .fold(0.0, f64::max);
    let f_spread = simplex[1..]
        .iter()
        .map(|(_, f)| (f - best_f).abs())
        .fold(0.0, f64::max);
    x_spread <= opts.x_tol && f_spread <= opts.f_tol * (1.0 + best_f.abs())
}

fn finish(mut simplex: Vec<(DVector<f64>, f64)>, iterations: usize, stop: SimplexStop) -> SimplexMinimum {
    let (x, f) = simplex.swap_remove(0);
    SimplexMinimum {
        x,
        f,
        iterations,
        stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimizes_shifted_quadratic() {
        let target = DVector::from_row_slice(&[1.5, -2.0, 0.25]);
        let objective = |x: &DVector<f64>| (x - &target).norm_squared();
        let min = nelder_mead(objective, DVector::zeros(3), &SimplexOptions::default()).unwrap();
        assert_eq!(min.stop, SimplexStop::Converged);
        assert!((&min.x - &target).amax() < 1e-5);
        assert!(min.f < 1e-10);
    }

    #[test]
    fn minimizes_rosenbrock() {
        let objective = |x: &DVector<f64>| {
            let (a, b) = (x[0], x[1]);
            (1.0 - a).powi(2) + 100.0 * (b - a * a).powi(2)
        };
        let opts = SimplexOptions {
            max_iter: 5000,
            ..SimplexOptions::default()
        };
        let min = nelder_mead(objective, DVector::from_row_slice(&[-1.2, 1.0]), &opts).unwrap();
        assert!((min.x[0] - 1.0).abs() < 1e-3);
        assert!((min.x[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn infinite_region_is_avoided() {
        // Feasible only for x > 0; minimum at x = 2.
        let objective = |x: &DVector<f64>| {
            if x[0] <= 0.0 {
                f64::INFINITY
            } else {
                (x[0] - 2.0).powi(2)
            }
        };
        let min = nelder_mead(objective, DVector::from_row_slice(&[0.1]), &SimplexOptions::default()).unwrap();
        assert!((min.x[0] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn respects_iteration_budget() {
        let objective = |x: &DVector<f64>| x.norm_squared();
        let opts = SimplexOptions {
            max_iter: 3,
            ..SimplexOptions::default()
        };
        let min = nelder_mead(objective, DVector::from_row_slice(&[10.0, 10.0]), &opts).unwrap();
        assert_eq!(min.stop, SimplexStop::MaxIter);
        assert_eq!(min.iterations, 3);
    }

    #[test]
    fn expired_deadline_is_an_error() {
        let objective = |x: &DVector<f64>| x.norm_squared();
        let opts = SimplexOptions {
            deadline: Some(Instant::now()),
            ..SimplexOptions::default()
        };
        let err = nelder_mead(objective, DVector::from_row_slice(&[10.0, 10.0]), &opts).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
