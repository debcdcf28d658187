//! Monotone growth / decay families.

use crate::math::stats::{linear_regression, min_max};
use crate::models::guess::{Guess, UNBOUNDED, scale_of, x_span};
use crate::models::model::ModelFamily;

/// `A·x^α + y0`
///
/// Only meaningful for `x > 0`; non-positive x evaluates through `powf` and
/// contributes no gradient with respect to `α`.
pub struct PowerLaw;

impl ModelFamily for PowerLaw {
    fn names(&self) -> &'static [&'static str] {
        &["A", "alpha", "y0"]
    }

    fn value(&self, x: f64, p: &[f64]) -> f64 {
        p[0] * x.powf(p[1]) + p[2]
    }

    fn gradient(&self, x: f64, p: &[f64], out: &mut [f64]) {
        let xa = x.powf(p[1]);
        out[0] = xa;
        out[1] = if x > 0.0 { p[0] * xa * x.ln() } else { 0.0 };
        out[2] = 1.0;
    }

    /// `y0` is a tenth of the smallest positive-x sample; `A` and `α` come from
    /// a log-log regression of `y - y0` on the positive-x subset.
    fn default_guess(&self, x: &[f64], y: &[f64]) -> Guess {
        let positive: Vec<(f64, f64)> = x
            .iter()
            .zip(y)
            .filter(|(xi, _)| **xi > 0.0)
            .map(|(&xi, &yi)| (xi, yi))
            .collect();

        let y0 = positive
            .iter()
            .map(|&(_, yi)| yi)
            .min_by(|a, b| a.total_cmp(b))
            .map(|m| 0.1 * m)
            .unwrap_or(0.0);

        let (log_x, log_y): (Vec<f64>, Vec<f64>) = positive
            .iter()
            .filter(|&&(_, yi)| yi - y0 > 0.0)
            .map(|&(xi, yi)| (xi.ln(), (yi - y0).ln()))
            .unzip();

        let (amplitude, alpha) = match linear_regression(&log_x, &log_y) {
            Some((intercept, slope)) if intercept.is_finite() && slope.is_finite() => {
                (intercept.exp(), slope)
            }
            _ => {
                let (lo, hi) = min_max(y).unwrap_or((0.0, 1.0));
                (hi - lo, 1.0)
            }
        };

        Guess {
            values: vec![amplitude, alpha, y0],
            bounds: vec![UNBOUNDED; 3],
            scale: vec![scale_of(amplitude, 1.0), scale_of(alpha, 1.0), scale_of(y0, amplitude)],
        }
    }
}

/// `A·exp(b·x) + y0`
pub struct Exponential;

impl ModelFamily for Exponential {
    fn names(&self) -> &'static [&'static str] {
        &["A", "b", "y0"]
    }

    fn value(&self, x: f64, p: &[f64]) -> f64 {
        p[0] * (p[1] * x).exp() + p[2]
    }

    fn gradient(&self, x: f64, p: &[f64], out: &mut [f64]) {
        let e = (p[1] * x).exp();
        out[0] = e;
        out[1] = p[0] * x * e;
        out[2] = 1.0;
    }

    /// Rate from the first, middle and last samples: for evenly spaced points
    /// `(y_l - y_m) / (y_m - y_0) = exp(b·h)`. `A` and `y0` then follow from a
    /// linear regression of `y` on `exp(b·x)`.
    fn default_guess(&self, x: &[f64], y: &[f64]) -> Guess {
        let span = x_span(x);
        let n = y.len();
        let mid = n.saturating_sub(1) / 2;
        let last = 2 * mid;

        let mut rate = -1.0 / span;
        if n >= 3 {
            let h = 0.5 * (x[last] - x[0]);
            let ratio = (y[last] - y[mid]) / (y[mid] - y[0]);
            if h > 0.0 && ratio.is_finite() && ratio > 0.0 && ratio != 1.0 {
                rate = ratio.ln() / h;
            }
        }

        let basis: Vec<f64> = x.iter().map(|&xi| (rate * xi).exp()).collect();
        let (offset, amplitude) = match linear_regression(&basis, y) {
            Some((a, b)) if a.is_finite() && b.is_finite() => (a, b),
            _ => {
                let (lo, hi) = min_max(y).unwrap_or((0.0, 1.0));
                (lo, hi - lo)
            }
        };

        Guess {
            values: vec![amplitude, rate, offset],
            bounds: vec![UNBOUNDED; 3],
            scale: vec![
                scale_of(amplitude, 1.0),
                scale_of(rate, 1.0 / span),
                scale_of(offset, amplitude),
            ],
        }
    }
}
