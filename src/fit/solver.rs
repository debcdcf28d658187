//! Bounded, scaled Levenberg–Marquardt least squares.
//!
//! Minimizes `½‖r(p)‖²` subject to `lower ≤ p ≤ upper`.
//!
//! Implementation choices:
//! - The iteration runs in scaled variables `z = p / scale`, so parameters of
//!   very different magnitude (µs decay times next to count-rate amplitudes)
//!   see a comparably shaped problem.
//! - Each trial step solves `(JₛᵀJₛ + λI) Δz = -Jₛᵀr` (Cholesky, SVD fallback).
//! - Steps that leave the box are reflected off the violated bound and then
//!   pulled strictly inside it, so iterates never sit exactly on a bound.
//! - `λ` follows Nielsen's gain-ratio update.
//! - Every residual evaluation counts against `max_evaluations`; running out is
//!   an error, never a silent partial result.

use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::FitError;
use crate::math::normal_pseudo_inverse;

/// Residual vector and its Jacobian for a least-squares objective.
pub trait LeastSquaresProblem {
    fn residuals(&self, p: &[f64]) -> Vec<f64>;

    /// `∂r_i/∂p_j`, rows over residuals.
    fn jacobian(&self, p: &[f64]) -> DMatrix<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Maximum number of residual evaluations.
    pub max_evaluations: usize,
    /// Relative cost reduction below which an accepted step ends the fit.
    pub ftol: f64,
    /// Relative step size below which the fit ends.
    pub xtol: f64,
    /// Max-norm of the scaled gradient below which the fit ends.
    pub gtol: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_evaluations: 2000,
            ftol: 1e-12,
            xtol: 1e-12,
            gtol: 1e-12,
        }
    }
}

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    CostTolerance,
    StepTolerance,
    GradientTolerance,
    ExactFit,
}

#[derive(Debug, Clone)]
pub struct SolverOutcome {
    pub params: Vec<f64>,
    pub residuals: Vec<f64>,
    /// `½‖r‖²` at `params`.
    pub cost: f64,
    /// `(JᵀJ)⁺` at `params`, in unscaled parameter units.
    pub normal_inverse: DMatrix<f64>,
    pub evaluations: usize,
    pub iterations: usize,
    pub termination: Termination,
}

const INITIAL_DAMPING: f64 = 1e-3;

fn half_norm_sq(r: &[f64]) -> f64 {
    0.5 * r.iter().map(|v| v * v).sum::<f64>()
}

/// Move `value` strictly inside `(lower, upper)`.
fn strictly_inside(value: f64, lower: f64, upper: f64) -> f64 {
    let step = |b: f64| 1e-10 * b.abs().max(1.0);
    let mut v = value;
    if lower.is_finite() && v <= lower {
        v = lower + step(lower);
    }
    if upper.is_finite() && v >= upper {
        v = upper - step(upper);
    }
    if v <= lower || v >= upper {
        v = 0.5 * (lower + upper);
    }
    v
}

/// Reflect a trial point off any violated bound, then keep it strictly inside.
fn reflect_into_bounds(value: f64, lower: f64, upper: f64) -> f64 {
    let mut v = value;
    if v < lower {
        v = lower + (lower - v);
    } else if v > upper {
        v = upper - (v - upper);
    }
    if v < lower || v > upper {
        v = v.clamp(lower, upper);
    }
    strictly_inside(v, lower, upper)
}

/// Solve `(A + λI) x = b`.
fn damped_solve(a: &DMatrix<f64>, lambda: f64, b: &DVector<f64>) -> Option<DVector<f64>> {
    let n = a.nrows();
    let m = a + DMatrix::<f64>::identity(n, n) * lambda;
    if let Some(chol) = m.clone().cholesky() {
        return Some(chol.solve(b));
    }
    let svd = m.svd(true, true);
    let tol = f64::EPSILON * n as f64 * svd.singular_values.max();
    svd.solve(b, tol).ok()
}

fn scaled_jacobian(jac: &DMatrix<f64>, scale: &[f64]) -> DMatrix<f64> {
    let mut js = jac.clone();
    for (j, &s) in scale.iter().enumerate() {
        js.column_mut(j).scale_mut(s);
    }
    js
}

fn not_converged(evaluations: usize, reason: &str) -> FitError {
    FitError::FitDidNotConverge {
        evaluations,
        reason: reason.to_string(),
    }
}

/// Minimize `½‖r(p)‖²` inside the box.
///
/// `start`, `bounds` and `scale` are index-aligned; every scale must be
/// positive and finite.
pub fn solve_bounded<P: LeastSquaresProblem + ?Sized>(
    problem: &P,
    start: &[f64],
    bounds: &[(f64, f64)],
    scale: &[f64],
    config: &SolverConfig,
) -> Result<SolverOutcome, FitError> {
    let n = start.len();
    let mut p: Vec<f64> = start
        .iter()
        .zip(bounds)
        .map(|(&v, &(lo, hi))| strictly_inside(v, lo, hi))
        .collect();

    let mut r = problem.residuals(&p);
    let mut evaluations = 1;
    if r.iter().any(|v| !v.is_finite()) {
        return Err(FitError::NonFiniteResidual);
    }
    let mut cost = half_norm_sq(&r);

    let mut lambda = f64::NAN;
    let mut nu = 2.0;
    let mut iterations = 0;

    let termination = 'outer: loop {
        if cost == 0.0 {
            break Termination::ExactFit;
        }
        iterations += 1;

        let js = scaled_jacobian(&problem.jacobian(&p), scale);
        let rv = DVector::from_column_slice(&r);
        let g = js.tr_mul(&rv);
        let a = js.tr_mul(&js);

        if g.amax() <= config.gtol {
            break Termination::GradientTolerance;
        }
        if lambda.is_nan() {
            let diag_max = a.diagonal().iter().fold(0.0_f64, |m, v| m.max(*v));
            lambda = INITIAL_DAMPING * diag_max.max(f64::MIN_POSITIVE);
        }

        let z_norm = p.iter().zip(scale).map(|(v, s)| (v / s).powi(2)).sum::<f64>().sqrt();

        loop {
            let Some(dz) = damped_solve(&a, lambda, &(-&g)) else {
                return Err(not_converged(evaluations, "damped normal equations are singular"));
            };

            let trial: Vec<f64> = (0..n)
                .map(|i| {
                    let (lo, hi) = bounds[i];
                    reflect_into_bounds(p[i] + scale[i] * dz[i], lo, hi)
                })
                .collect();
            let step = DVector::from_iterator(n, (0..n).map(|i| (trial[i] - p[i]) / scale[i]));
            let step_norm = step.norm();

            if evaluations >= config.max_evaluations {
                return Err(not_converged(evaluations, "evaluation cap reached"));
            }
            let r_trial = problem.residuals(&trial);
            evaluations += 1;

            let cost_trial = if r_trial.iter().all(|v| v.is_finite()) {
                half_norm_sq(&r_trial)
            } else {
                f64::INFINITY
            };
            let actual = cost - cost_trial;
            let predicted = -(g.dot(&step) + 0.5 * step.dot(&(&a * &step)));

            if actual > 0.0 && cost_trial.is_finite() {
                let rho = if predicted > 0.0 { actual / predicted } else { 0.5 };
                lambda *= (1.0 / 3.0_f64).max(1.0 - (2.0 * rho - 1.0).powi(3));
                nu = 2.0;

                let old_cost = cost;
                p = trial;
                r = r_trial;
                cost = cost_trial;
                debug!("iter {iterations}: cost {cost:.6e}, lambda {lambda:.3e}, step {step_norm:.3e}");

                if cost == 0.0 {
                    break 'outer Termination::ExactFit;
                }
                if actual <= config.ftol * old_cost {
                    break 'outer Termination::CostTolerance;
                }
                if step_norm <= config.xtol * (config.xtol + z_norm) {
                    break 'outer Termination::StepTolerance;
                }
                break;
            }

            if step_norm <= config.xtol * (config.xtol + z_norm) {
                break 'outer Termination::StepTolerance;
            }
            lambda *= nu;
            nu *= 2.0;
            if !lambda.is_finite() {
                return Err(not_converged(evaluations, "damping diverged"));
            }
        }
    };

    let js = scaled_jacobian(&problem.jacobian(&p), scale);
    let mut normal_inverse = normal_pseudo_inverse(&js);
    for i in 0..n {
        for j in 0..n {
            normal_inverse[(i, j)] *= scale[i] * scale[j];
        }
    }

    debug!("solver stopped: {termination:?} after {evaluations} evaluations, cost {cost:.6e}");
    Ok(SolverOutcome {
        params: p,
        residuals: r,
        cost,
        normal_inverse,
        evaluations,
        iterations,
        termination,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `r = a·exp(b·x) - y`
    struct ExpProblem {
        x: Vec<f64>,
        y: Vec<f64>,
    }

    impl LeastSquaresProblem for ExpProblem {
        fn residuals(&self, p: &[f64]) -> Vec<f64> {
            self.x
                .iter()
                .zip(&self.y)
                .map(|(&x, &y)| p[0] * (p[1] * x).exp() - y)
                .collect()
        }

        fn jacobian(&self, p: &[f64]) -> DMatrix<f64> {
            DMatrix::from_fn(self.x.len(), 2, |i, j| {
                let e = (p[1] * self.x[i]).exp();
                if j == 0 { e } else { p[0] * self.x[i] * e }
            })
        }
    }

    /// Rosenbrock in residual form.
    struct Rosenbrock;

    impl LeastSquaresProblem for Rosenbrock {
        fn residuals(&self, p: &[f64]) -> Vec<f64> {
            vec![10.0 * (p[1] - p[0] * p[0]), 1.0 - p[0]]
        }

        fn jacobian(&self, p: &[f64]) -> DMatrix<f64> {
            DMatrix::from_row_slice(2, 2, &[-20.0 * p[0], 10.0, -1.0, 0.0])
        }
    }

    #[test]
    fn recovers_exponential_parameters() {
        let x: Vec<f64> = (0..30).map(|i| i as f64 * 0.1).collect();
        let y = x.iter().map(|&v| 3.0 * (-0.7 * v).exp()).collect();
        let problem = ExpProblem { x, y };
        let out = solve_bounded(
            &problem,
            &[1.0, -0.1],
            &[(f64::NEG_INFINITY, f64::INFINITY); 2],
            &[1.0, 1.0],
            &SolverConfig::default(),
        )
        .unwrap();
        assert!((out.params[0] - 3.0).abs() < 1e-8, "{:?}", out.params);
        assert!((out.params[1] + 0.7).abs() < 1e-8);
    }

    #[test]
    fn stays_inside_bounds() {
        let out = solve_bounded(
            &Rosenbrock,
            &[-1.2, 1.0],
            &[(f64::NEG_INFINITY, 0.5), (f64::NEG_INFINITY, f64::INFINITY)],
            &[1.0, 1.0],
            &SolverConfig::default(),
        )
        .unwrap();
        assert!(out.params[0] < 0.5);
        assert!(out.params[0] > 0.45, "{:?}", out.params);
    }

    #[test]
    fn evaluation_cap_is_an_error() {
        let config = SolverConfig {
            max_evaluations: 3,
            ..SolverConfig::default()
        };
        let err = solve_bounded(
            &Rosenbrock,
            &[-1.2, 1.0],
            &[(f64::NEG_INFINITY, f64::INFINITY); 2],
            &[1.0, 1.0],
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, FitError::FitDidNotConverge { evaluations: 3, .. }));
    }

    #[test]
    fn non_finite_start_is_rejected() {
        let problem = ExpProblem {
            x: vec![0.0, 1.0],
            y: vec![f64::NAN, 1.0],
        };
        let err = solve_bounded(
            &problem,
            &[1.0, 0.0],
            &[(f64::NEG_INFINITY, f64::INFINITY); 2],
            &[1.0, 1.0],
            &SolverConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, FitError::NonFiniteResidual);
    }
}
