//! Model family interface and dispatch.
//!
//! The fitter relies on a handful of primitive operations per family:
//! - the ordered parameter names
//! - `f(x, p)` for fit lines and residuals
//! - a gradient row `∂f/∂p` for the solver and confidence bands
//! - a default guess (values, bounds, scales) computed from the data
//!
//! Every parametric family is a unit struct implementing [`ModelFamily`];
//! [`ModelKind::family`] maps the closed catalog onto them. Polynomial and
//! spline fits are linear and are handled separately.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::domain::{FitOptions, ModelKind};
use crate::fit::params::{ParamLayout, apply_overrides_with};
use crate::math::BSpline;
use crate::models::growth::{Exponential, PowerLaw};
use crate::models::guess::Guess;
use crate::models::lineshape::{Gaussian, IntegratedGaussian, Lorentzian, RabiSpectrum, Sinc2};
use crate::models::oscillation::{ExpDecaySinusoid, GaussianDecaySinusoid, QuarticSinusoid, Sinusoid};
use crate::models::polynomial;

/// Capability set shared by every parametric family.
pub trait ModelFamily: Sync {
    /// Canonical, order-significant parameter names.
    fn names(&self) -> &'static [&'static str];

    /// Model value at a single point.
    fn value(&self, x: f64, p: &[f64]) -> f64;

    /// Fill `out` (length `names().len()`) with `∂f/∂p_j` at `x`.
    fn gradient(&self, x: f64, p: &[f64], out: &mut [f64]);

    /// Heuristic initial values, default bounds and natural scales.
    ///
    /// `x` is sorted ascending and every entry is finite.
    fn default_guess(&self, x: &[f64], y: &[f64]) -> Guess;

    fn values(&self, x: &[f64], p: &[f64]) -> Vec<f64> {
        x.iter().map(|&xi| self.value(xi, p)).collect()
    }

    /// Jacobian with rows over `x` and columns in `names()` order.
    fn jacobian(&self, x: &[f64], p: &[f64]) -> DMatrix<f64> {
        let n_params = self.names().len();
        let mut jac = DMatrix::<f64>::zeros(x.len(), n_params);
        let mut row = vec![0.0; n_params];
        for (i, &xi) in x.iter().enumerate() {
            self.gradient(xi, p, &mut row);
            for (j, &v) in row.iter().enumerate() {
                jac[(i, j)] = v;
            }
        }
        jac
    }
}

impl ModelKind {
    /// The parametric family behind this kind, `None` for polynomial / spline.
    pub fn family(self) -> Option<&'static dyn ModelFamily> {
        match self {
            ModelKind::ExpDecaySinusoid => Some(&ExpDecaySinusoid),
            ModelKind::GaussianDecaySinusoid => Some(&GaussianDecaySinusoid),
            ModelKind::Sinusoid => Some(&Sinusoid),
            ModelKind::QuarticSinusoid => Some(&QuarticSinusoid),
            ModelKind::Lorentzian => Some(&Lorentzian),
            ModelKind::Gaussian => Some(&Gaussian),
            ModelKind::IntegratedGaussian => Some(&IntegratedGaussian),
            ModelKind::Sinc2 => Some(&Sinc2),
            ModelKind::RabiSpectrum => Some(&RabiSpectrum),
            ModelKind::PowerLaw => Some(&PowerLaw),
            ModelKind::Exponential => Some(&Exponential),
            ModelKind::Polynomial | ModelKind::Spline => None,
        }
    }

    /// Parameter names; empty for the implicitly parameterized linear families.
    pub fn names(self) -> &'static [&'static str] {
        self.family().map(|f| f.names()).unwrap_or(&[])
    }

    /// Default guess merged with the caller's overrides.
    ///
    /// Held parameters take their held value; invalid overrides are dropped with
    /// a warning. Returns `None` for polynomial / spline.
    pub fn autoguess(self, x: &[f64], y: &[f64], options: &FitOptions) -> Option<Guess> {
        self.resolve_guess(x, y, options, &mut Vec::new())
            .map(|(_, guess)| guess)
    }

    /// Free/held layout plus the merged guess, recording every dropped
    /// override in `diagnostics`.
    pub fn resolve_guess(
        self,
        x: &[f64],
        y: &[f64],
        options: &FitOptions,
        diagnostics: &mut Vec<String>,
    ) -> Option<(ParamLayout, Guess)> {
        let family = self.family()?;
        let names = family.names();
        let layout = ParamLayout::resolve_with(names, &options.hold, diagnostics);
        let guess = apply_overrides_with(names, family.default_guess(x, y), &layout, options, diagnostics);
        Some((layout, guess))
    }
}

/// A fitted curve that can be evaluated anywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FittedCurve {
    Parametric { kind: ModelKind, params: Vec<f64> },
    /// Ascending power-basis coefficients.
    Polynomial { coeffs: Vec<f64> },
    Spline { spline: BSpline },
}

impl FittedCurve {
    pub fn value(&self, x: f64) -> f64 {
        match self {
            FittedCurve::Parametric { kind, params } => kind
                .family()
                .map(|f| f.value(x, params))
                .unwrap_or(f64::NAN),
            FittedCurve::Polynomial { coeffs } => crate::math::poly::eval(coeffs, x),
            FittedCurve::Spline { spline } => spline.eval(x),
        }
    }

    pub fn values(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|&xi| self.value(xi)).collect()
    }

    /// Jacobian with respect to the curve's parameters, `None` for splines.
    pub fn jacobian(&self, x: &[f64]) -> Option<DMatrix<f64>> {
        match self {
            FittedCurve::Parametric { kind, params } => Some(kind.family()?.jacobian(x, params)),
            FittedCurve::Polynomial { coeffs } => {
                Some(polynomial::design_matrix(x, coeffs.len().saturating_sub(1)))
            }
            FittedCurve::Spline { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Central-difference check of every analytic gradient.
    #[test]
    fn analytic_gradients_match_finite_differences() {
        let cases: Vec<(ModelKind, Vec<f64>, Vec<f64>)> = vec![
            (ModelKind::ExpDecaySinusoid, vec![1.3, 2.1, 0.4, 0.8, -0.2], vec![0.1, 0.7, 1.3]),
            (ModelKind::GaussianDecaySinusoid, vec![1.3, 2.1, 0.4, 0.8, -0.2], vec![0.1, 0.7, 1.3]),
            (ModelKind::Sinusoid, vec![0.9, 1.7, -0.3, 0.5], vec![0.2, 0.9]),
            (ModelKind::QuarticSinusoid, vec![0.9, 0.7, 0.3, 0.1], vec![0.2, 0.9]),
            (ModelKind::Lorentzian, vec![2.0, 0.3, 1.1, 0.4], vec![-0.5, 0.3, 1.2]),
            (ModelKind::Gaussian, vec![2.0, 0.3, 0.7, 0.4], vec![-0.5, 0.3, 1.2]),
            (ModelKind::IntegratedGaussian, vec![2.0, 0.3, 0.7, 0.4], vec![-0.5, 0.3, 1.2]),
            (ModelKind::Sinc2, vec![1.5, 0.2, 0.9, 0.1], vec![-0.7, 0.2, 0.21, 1.4]),
            (ModelKind::RabiSpectrum, vec![0.8, 0.1, 0.6, 0.05], vec![-1.0, 0.1, 0.4, 1.3]),
            (ModelKind::PowerLaw, vec![1.7, 1.3, 0.2], vec![0.5, 1.0, 3.0]),
            (ModelKind::Exponential, vec![2.0, -1.5, 0.5], vec![0.0, 0.6, 1.9]),
        ];

        for (kind, p, xs) in cases {
            let family = kind.family().unwrap();
            let n = p.len();
            assert_eq!(family.names().len(), n, "{kind:?}");
            let mut grad = vec![0.0; n];
            for &x in &xs {
                family.gradient(x, &p, &mut grad);
                for j in 0..n {
                    let h = 1e-6 * p[j].abs().max(1.0);
                    let mut hi = p.clone();
                    let mut lo = p.clone();
                    hi[j] += h;
                    lo[j] -= h;
                    let fd = (family.value(x, &hi) - family.value(x, &lo)) / (2.0 * h);
                    assert!(
                        (fd - grad[j]).abs() < 1e-5 * fd.abs().max(1.0),
                        "{kind:?} d/d{} at x={x}: analytic {} vs numeric {fd}",
                        family.names()[j],
                        grad[j]
                    );
                }
            }
        }
    }

    #[test]
    fn linear_kinds_have_no_family() {
        assert!(ModelKind::Polynomial.family().is_none());
        assert!(ModelKind::Spline.names().is_empty());
        assert!(ModelKind::Spline.autoguess(&[0.0, 1.0], &[0.0, 1.0], &FitOptions::new()).is_none());
    }

    #[test]
    fn autoguess_applies_hold_and_manual_guess() {
        let x: Vec<f64> = (0..81).map(|i| -2.0 + i as f64 * 0.05).collect();
        let y: Vec<f64> = x.iter().map(|&v| 0.1 + 1.5 * (-0.5 * (v / 0.4).powi(2)).exp()).collect();
        let options = FitOptions::new()
            .hold("A", 2.0)
            .guess("sigma", 0.3)
            .guess("nope", 1.0);

        let guess = ModelKind::Gaussian.autoguess(&x, &y, &options).unwrap();
        assert_eq!(guess.values[0], 2.0);
        assert_eq!(guess.values[2], 0.3);
        assert!(guess.bounds[2].0 >= 0.0);
        assert!(guess.scale.iter().all(|s| s.is_finite() && *s > 0.0));

        let mut diagnostics = Vec::new();
        let (layout, same) = ModelKind::Gaussian
            .resolve_guess(&x, &y, &options, &mut diagnostics)
            .unwrap();
        assert_eq!(same, guess);
        assert_eq!(layout.n_free(), 3);
        assert_eq!(diagnostics.len(), 1, "{diagnostics:?}");
    }
}
