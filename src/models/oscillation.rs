//! Oscillatory families.
//!
//! All four share the phase `θ = 2πfx + φ` and the DFT-based starting point from
//! [`oscillation_guess`]. The damped variants differ only in their envelope.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::math::stats::min_max;
use crate::models::guess::{
    Guess, NON_NEGATIVE, UNBOUNDED, oscillation_guess, scale_of, wrap_phase, x_span,
};
use crate::models::model::ModelFamily;

fn theta(x: f64, f: f64, phi: f64) -> f64 {
    2.0 * PI * f * x + phi
}

/// Envelope value and its derivative with respect to `τ`.
type Envelope = fn(f64, f64) -> (f64, f64);

fn exponential_envelope(x: f64, tau: f64) -> (f64, f64) {
    let e = (-x / tau).exp();
    (e, e * x / (tau * tau))
}

fn gaussian_envelope(x: f64, tau: f64) -> (f64, f64) {
    let u = x / tau;
    let e = (-u * u).exp();
    (e, e * 2.0 * x * x / (tau * tau * tau))
}

fn damped_value(envelope: Envelope, x: f64, p: &[f64]) -> f64 {
    let (a, f, phi, tau, y0) = (p[0], p[1], p[2], p[3], p[4]);
    let (e, _) = envelope(x, tau);
    a * e * theta(x, f, phi).sin() + y0
}

fn damped_gradient(envelope: Envelope, x: f64, p: &[f64], out: &mut [f64]) {
    let (a, f, phi, tau) = (p[0], p[1], p[2], p[3]);
    let (e, de_dtau) = envelope(x, tau);
    let (s, c) = theta(x, f, phi).sin_cos();
    out[0] = e * s;
    out[1] = a * e * c * 2.0 * PI * x;
    out[2] = a * e * c;
    out[3] = a * s * de_dtau;
    out[4] = 1.0;
}

fn damped_guess(x: &[f64], y: &[f64]) -> Guess {
    let g = oscillation_guess(x, y);
    let span = x_span(x);
    Guess {
        values: vec![g.amplitude, g.frequency, g.phase, g.tau, g.offset],
        bounds: vec![NON_NEGATIVE, NON_NEGATIVE, UNBOUNDED, NON_NEGATIVE, UNBOUNDED],
        scale: vec![
            scale_of(g.amplitude, 1.0),
            scale_of(g.frequency, 1.0 / span),
            1.0,
            scale_of(g.tau, span),
            scale_of(g.amplitude, g.offset),
        ],
    }
}

const DAMPED_NAMES: &[&str] = &["A", "f", "phi", "tau", "y0"];
const UNDAMPED_NAMES: &[&str] = &["A", "f", "phi", "y0"];

/// `A·exp(-x/τ)·sin(2πfx + φ) + y0`
pub struct ExpDecaySinusoid;

impl ModelFamily for ExpDecaySinusoid {
    fn names(&self) -> &'static [&'static str] {
        DAMPED_NAMES
    }

    fn value(&self, x: f64, p: &[f64]) -> f64 {
        damped_value(exponential_envelope, x, p)
    }

    fn gradient(&self, x: f64, p: &[f64], out: &mut [f64]) {
        damped_gradient(exponential_envelope, x, p, out)
    }

    fn default_guess(&self, x: &[f64], y: &[f64]) -> Guess {
        damped_guess(x, y)
    }
}

/// `A·exp(-(x/τ)²)·sin(2πfx + φ) + y0`
pub struct GaussianDecaySinusoid;

impl ModelFamily for GaussianDecaySinusoid {
    fn names(&self) -> &'static [&'static str] {
        DAMPED_NAMES
    }

    fn value(&self, x: f64, p: &[f64]) -> f64 {
        damped_value(gaussian_envelope, x, p)
    }

    fn gradient(&self, x: f64, p: &[f64], out: &mut [f64]) {
        damped_gradient(gaussian_envelope, x, p, out)
    }

    fn default_guess(&self, x: &[f64], y: &[f64]) -> Guess {
        damped_guess(x, y)
    }
}

/// `A·sin(2πfx + φ) + y0`
pub struct Sinusoid;

impl ModelFamily for Sinusoid {
    fn names(&self) -> &'static [&'static str] {
        UNDAMPED_NAMES
    }

    fn value(&self, x: f64, p: &[f64]) -> f64 {
        p[0] * theta(x, p[1], p[2]).sin() + p[3]
    }

    fn gradient(&self, x: f64, p: &[f64], out: &mut [f64]) {
        let a = p[0];
        let (s, c) = theta(x, p[1], p[2]).sin_cos();
        out[0] = s;
        out[1] = a * c * 2.0 * PI * x;
        out[2] = a * c;
        out[3] = 1.0;
    }

    fn default_guess(&self, x: &[f64], y: &[f64]) -> Guess {
        let g = oscillation_guess(x, y);
        let span = x_span(x);
        Guess {
            values: vec![g.amplitude, g.frequency, g.phase, g.offset],
            bounds: vec![NON_NEGATIVE, NON_NEGATIVE, UNBOUNDED, UNBOUNDED],
            scale: vec![
                scale_of(g.amplitude, 1.0),
                scale_of(g.frequency, 1.0 / span),
                1.0,
                scale_of(g.amplitude, g.offset),
            ],
        }
    }
}

/// `A·sin⁴(2πfx + φ) + y0`
///
/// `sin⁴` repeats twice per period of `sin`, so the dominant DFT frequency is
/// twice `f`. The amplitude spans the full data range above the minimum.
pub struct QuarticSinusoid;

impl ModelFamily for QuarticSinusoid {
    fn names(&self) -> &'static [&'static str] {
        UNDAMPED_NAMES
    }

    fn value(&self, x: f64, p: &[f64]) -> f64 {
        p[0] * theta(x, p[1], p[2]).sin().powi(4) + p[3]
    }

    fn gradient(&self, x: f64, p: &[f64], out: &mut [f64]) {
        let a = p[0];
        let (s, c) = theta(x, p[1], p[2]).sin_cos();
        let d_theta = 4.0 * a * s.powi(3) * c;
        out[0] = s.powi(4);
        out[1] = d_theta * 2.0 * PI * x;
        out[2] = d_theta;
        out[3] = 1.0;
    }

    fn default_guess(&self, x: &[f64], y: &[f64]) -> Guess {
        let g = oscillation_guess(x, y);
        let span = x_span(x);
        let (y_min, y_max) = min_max(y).unwrap_or((0.0, 0.0));
        let frequency = 0.5 * g.frequency;

        // Start at a crest (θ = π/2) or a trough (θ = 0) of sin⁴.
        let x0 = x.first().copied().unwrap_or(0.0);
        let above = y.first().is_some_and(|&v| v >= g.offset);
        let start = if above { FRAC_PI_2 } else { 0.0 };
        let phase = wrap_phase(start - 2.0 * PI * frequency * x0);

        let amplitude = y_max - y_min;
        Guess {
            values: vec![amplitude, frequency, phase, y_min],
            bounds: vec![NON_NEGATIVE, NON_NEGATIVE, UNBOUNDED, UNBOUNDED],
            scale: vec![
                scale_of(amplitude, 1.0),
                scale_of(frequency, 1.0 / span),
                1.0,
                scale_of(amplitude, y_min),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quartic_guess_halves_frequency() {
        let x: Vec<f64> = (0..500).map(|i| i as f64 * 0.004).collect();
        let y: Vec<f64> = x.iter().map(|&t| 1.5 * (2.0 * PI * 2.0 * t).sin().powi(4)).collect();
        let g = QuarticSinusoid.default_guess(&x, &y);
        assert!((g.values[1] - 2.0).abs() < 0.1, "f = {}", g.values[1]);
        assert!((g.values[0] - 1.5).abs() < 1e-3);
        assert!(g.values[3].abs() < 1e-9);
    }

    #[test]
    fn damped_guess_uses_half_span_for_tau() {
        let x: Vec<f64> = (0..200).map(|i| i as f64 * 0.01).collect();
        let y: Vec<f64> = x.iter().map(|&t| (-t).exp() * (2.0 * PI * 3.0 * t).sin()).collect();
        let g = ExpDecaySinusoid.default_guess(&x, &y);
        assert!((g.values[3] - 0.995).abs() < 1e-9);
        assert_eq!(g.bounds[3], NON_NEGATIVE);
    }
}
