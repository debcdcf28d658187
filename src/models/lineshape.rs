//! Single-feature lineshapes: peaks, dips and steps centred at `x0`.
//!
//! The amplitude is signed, so one family describes both a peak and a dip.
//! Widths are bounded below by zero; centres and offsets are free.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use statrs::function::erf::erf;

use crate::math::stats::mean;
use crate::models::guess::{
    FeatureGuess, Guess, NON_NEGATIVE, UNBOUNDED, feature_center, feature_guess, scale_of, x_span,
};
use crate::models::model::ModelFamily;

const PEAK_NAMES: &[&str] = &["A", "x0", "sigma", "y0"];

/// Values/bounds/scales for `[A, x0, width, y0]` from a feature guess.
fn feature_to_guess(g: FeatureGuess, amplitude_bounds: (f64, f64), span: f64) -> Guess {
    Guess {
        values: vec![g.amplitude, g.center, g.width, g.baseline],
        bounds: vec![amplitude_bounds, UNBOUNDED, NON_NEGATIVE, UNBOUNDED],
        scale: vec![
            scale_of(g.amplitude, 1.0),
            scale_of(g.width, span),
            scale_of(g.width, span),
            scale_of(g.amplitude, g.baseline),
        ],
    }
}

/// Lorentzian with full width at half maximum `fwhm`:
/// `A·(fwhm/2)² / ((x - x0)² + (fwhm/2)²) + y0`.
pub struct Lorentzian;

impl ModelFamily for Lorentzian {
    fn names(&self) -> &'static [&'static str] {
        &["A", "x0", "fwhm", "y0"]
    }

    fn value(&self, x: f64, p: &[f64]) -> f64 {
        let d = x - p[1];
        let h = 0.25 * p[2] * p[2];
        p[0] * h / (d * d + h) + p[3]
    }

    fn gradient(&self, x: f64, p: &[f64], out: &mut [f64]) {
        let (a, w) = (p[0], p[2]);
        let d = x - p[1];
        let h = 0.25 * w * w;
        let denom = d * d + h;
        let denom2 = denom * denom;
        out[0] = h / denom;
        out[1] = a * h * 2.0 * d / denom2;
        out[2] = a * d * d / denom2 * 0.5 * w;
        out[3] = 1.0;
    }

    fn default_guess(&self, x: &[f64], y: &[f64]) -> Guess {
        feature_to_guess(feature_guess(x, y), UNBOUNDED, x_span(x))
    }
}

/// `A·exp(-(x - x0)² / (2σ²)) + y0`
pub struct Gaussian;

impl ModelFamily for Gaussian {
    fn names(&self) -> &'static [&'static str] {
        PEAK_NAMES
    }

    fn value(&self, x: f64, p: &[f64]) -> f64 {
        let z = (x - p[1]) / p[2];
        p[0] * (-0.5 * z * z).exp() + p[3]
    }

    fn gradient(&self, x: f64, p: &[f64], out: &mut [f64]) {
        let (a, sigma) = (p[0], p[2]);
        let d = x - p[1];
        let z = d / sigma;
        let g = (-0.5 * z * z).exp();
        out[0] = g;
        out[1] = a * g * d / (sigma * sigma);
        out[2] = a * g * d * d / (sigma * sigma * sigma);
        out[3] = 1.0;
    }

    fn default_guess(&self, x: &[f64], y: &[f64]) -> Guess {
        feature_to_guess(feature_guess(x, y), UNBOUNDED, x_span(x))
    }
}

fn std_normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z * FRAC_1_SQRT_2))
}

fn std_normal_pdf(z: f64) -> f64 {
    (-0.5 * z * z).exp() / (2.0 * PI).sqrt()
}

/// Cumulative Gaussian step `A·Φ((x - x0)/σ) + y0`, rising from `y0` to `y0 + A`.
pub struct IntegratedGaussian;

impl ModelFamily for IntegratedGaussian {
    fn names(&self) -> &'static [&'static str] {
        PEAK_NAMES
    }

    fn value(&self, x: f64, p: &[f64]) -> f64 {
        p[0] * std_normal_cdf((x - p[1]) / p[2]) + p[3]
    }

    fn gradient(&self, x: f64, p: &[f64], out: &mut [f64]) {
        let (a, sigma) = (p[0], p[2]);
        let z = (x - p[1]) / sigma;
        let pdf = std_normal_pdf(z);
        out[0] = std_normal_cdf(z);
        out[1] = -a * pdf / sigma;
        out[2] = -a * pdf * z / sigma;
        out[3] = 1.0;
    }

    /// Plateaus from the outer fifths of the data, centre at the steepest point.
    fn default_guess(&self, x: &[f64], y: &[f64]) -> Guess {
        let n = y.len();
        let fifth = (n / 5).max(1).min(n);
        let low = mean(&y[..fifth]).unwrap_or(0.0);
        let high = mean(&y[n - fifth..]).unwrap_or(0.0);
        let amplitude = high - low;

        let mut mids = Vec::with_capacity(n.saturating_sub(1));
        let mut slopes = Vec::with_capacity(n.saturating_sub(1));
        for i in 1..n {
            let dx = x[i] - x[i - 1];
            if dx > 0.0 {
                mids.push(0.5 * (x[i] + x[i - 1]));
                slopes.push((y[i] - y[i - 1]) / dx);
            }
        }
        let span = x_span(x);
        let center = if mids.is_empty() {
            x.first().map(|&x0| x0 + 0.5 * span).unwrap_or(0.0)
        } else {
            feature_center(&mids, &slopes, amplitude >= 0.0)
        };

        let g = FeatureGuess {
            amplitude,
            baseline: low,
            center,
            width: span / 6.0,
        };
        feature_to_guess(g, UNBOUNDED, span)
    }
}

/// `sin(πu)/(πu)` and its derivative, with a series form near `u = 0`.
fn sinc_and_derivative(u: f64) -> (f64, f64) {
    let pu = PI * u;
    if u.abs() < 1e-4 {
        (1.0 - pu * pu / 6.0, -PI * pu / 3.0)
    } else {
        let (s, c) = pu.sin_cos();
        (s / pu, (pu * c - s) / (pu * u))
    }
}

/// `A·sinc²((x - x0)/w) + y0` with the normalized `sinc(u) = sin(πu)/(πu)`.
///
/// The first zeros sit at `x0 ± w`.
pub struct Sinc2;

impl ModelFamily for Sinc2 {
    fn names(&self) -> &'static [&'static str] {
        &["A", "x0", "w", "y0"]
    }

    fn value(&self, x: f64, p: &[f64]) -> f64 {
        let (s, _) = sinc_and_derivative((x - p[1]) / p[2]);
        p[0] * s * s + p[3]
    }

    fn gradient(&self, x: f64, p: &[f64], out: &mut [f64]) {
        let (a, w) = (p[0], p[2]);
        let u = (x - p[1]) / w;
        let (s, ds) = sinc_and_derivative(u);
        let d_u = a * 2.0 * s * ds;
        out[0] = s * s;
        out[1] = -d_u / w;
        out[2] = -d_u * u / w;
        out[3] = 1.0;
    }

    fn default_guess(&self, x: &[f64], y: &[f64]) -> Guess {
        feature_to_guess(feature_guess(x, y), UNBOUNDED, x_span(x))
    }
}

/// Transition probability of a square π-pulse versus detuning `x - x0`:
///
/// `A·Ω²/W²·sin²(πW/(2Ω)) + y0` with `W = sqrt(Ω² + (x - x0)²)`.
///
/// `A` is a probability contrast and is bounded to `[-1, 1]`.
pub struct RabiSpectrum;

impl ModelFamily for RabiSpectrum {
    fn names(&self) -> &'static [&'static str] {
        &["A", "x0", "rabi", "y0"]
    }

    fn value(&self, x: f64, p: &[f64]) -> f64 {
        let (a, omega, y0) = (p[0], p[2], p[3]);
        let d = x - p[1];
        let w2 = omega * omega + d * d;
        if w2 == 0.0 {
            return y0;
        }
        let psi = PI * w2.sqrt() / (2.0 * omega);
        a * omega * omega / w2 * psi.sin().powi(2) + y0
    }

    fn gradient(&self, x: f64, p: &[f64], out: &mut [f64]) {
        let (a, omega) = (p[0], p[2]);
        let d = x - p[1];
        let w2 = omega * omega + d * d;
        if w2 == 0.0 {
            out.iter_mut().for_each(|v| *v = 0.0);
            out[3] = 1.0;
            return;
        }
        let w = w2.sqrt();
        let w4 = w2 * w2;
        let r = omega * omega / w2;
        let psi = PI * w / (2.0 * omega);
        let s = psi.sin().powi(2);
        let ds_dpsi = (2.0 * psi).sin();

        let dr_dd = -2.0 * omega * omega * d / w4;
        let dpsi_dd = PI * d / (2.0 * omega * w);
        let dr_domega = 2.0 * omega * d * d / w4;
        let dpsi_domega = -PI * d * d / (2.0 * w * omega * omega);

        out[0] = r * s;
        out[1] = -a * (dr_dd * s + r * ds_dpsi * dpsi_dd);
        out[2] = a * (dr_domega * s + r * ds_dpsi * dpsi_domega);
        out[3] = 1.0;
    }

    fn default_guess(&self, x: &[f64], y: &[f64]) -> Guess {
        let mut g = feature_guess(x, y);
        g.amplitude = g.amplitude.clamp(-1.0, 1.0);
        feature_to_guess(g, (-1.0, 1.0), x_span(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lorentzian_is_half_height_at_half_width() {
        let p = [2.0, 1.0, 0.5, 0.0];
        assert!((Lorentzian.value(1.0, &p) - 2.0).abs() < 1e-12);
        assert!((Lorentzian.value(1.25, &p) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn sinc2_has_zeros_at_plus_minus_w() {
        let p = [1.0, 0.0, 2.0, 0.0];
        assert!((Sinc2.value(0.0, &p) - 1.0).abs() < 1e-12);
        assert!(Sinc2.value(2.0, &p).abs() < 1e-12);
        assert!(Sinc2.value(-2.0, &p).abs() < 1e-12);
    }

    #[test]
    fn rabi_peaks_at_resonance() {
        let p = [0.9, 0.0, 1.0, 0.05];
        assert!((RabiSpectrum.value(0.0, &p) - 0.95).abs() < 1e-12);
        assert!(RabiSpectrum.value(0.8, &p) < 0.95);
    }

    #[test]
    fn integrated_gaussian_guess_finds_step() {
        let x: Vec<f64> = (0..101).map(|i| i as f64 * 0.1).collect();
        let p = [3.0, 6.0, 0.4, -1.0];
        let y: Vec<f64> = x.iter().map(|&v| IntegratedGaussian.value(v, &p)).collect();
        let g = IntegratedGaussian.default_guess(&x, &y);
        assert!((g.values[0] - 3.0).abs() < 0.1);
        assert!((g.values[1] - 6.0).abs() < 0.1);
        assert!((g.values[3] + 1.0).abs() < 0.1);
    }

    #[test]
    fn rabi_guess_respects_unit_contrast() {
        let x: Vec<f64> = (0..81).map(|i| -2.0 + i as f64 * 0.05).collect();
        let y: Vec<f64> = x.iter().map(|&v| RabiSpectrum.value(v, &[1.0, 0.0, 0.3, 0.0]) * 4.0).collect();
        let g = RabiSpectrum.default_guess(&x, &y);
        assert_eq!(g.values[0], 1.0);
        assert_eq!(g.bounds[0], (-1.0, 1.0));
    }
}
