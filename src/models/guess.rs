//! Initial-guess heuristics shared by the model families.
//!
//! All helpers assume `x` is sorted ascending, finite and non-empty; the
//! fitter guarantees this after cleaning.

use serde::{Deserialize, Serialize};

use crate::math::spectrum::dominant_frequency;
use crate::math::stats::{median, min_max, percentile};

/// Per-parameter starting point of a nonlinear fit, in `names()` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guess {
    pub values: Vec<f64>,
    /// `(lower, upper)`; infinite ends mean unbounded.
    pub bounds: Vec<(f64, f64)>,
    /// Natural magnitude of each parameter, always finite and > 0.
    pub scale: Vec<f64>,
}

pub const UNBOUNDED: (f64, f64) = (f64::NEG_INFINITY, f64::INFINITY);
pub const NON_NEGATIVE: (f64, f64) = (0.0, f64::INFINITY);

/// `value.abs()` if usable as a scale, else `fallback` (else 1).
pub fn scale_of(value: f64, fallback: f64) -> f64 {
    [value.abs(), fallback.abs(), 1.0]
        .into_iter()
        .find(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(1.0)
}

/// Width of the x-range, or 1 for a single point.
pub fn x_span(x: &[f64]) -> f64 {
    match min_max(x) {
        Some((lo, hi)) if hi > lo => hi - lo,
        _ => 1.0,
    }
}

/// Shared starting point for the oscillatory families.
#[derive(Debug, Clone, Copy)]
pub struct OscillationGuess {
    pub amplitude: f64,
    pub offset: f64,
    pub frequency: f64,
    /// Phase placing the first sample at a crest (`+π/2`) or trough (`-π/2`).
    pub phase: f64,
    /// Decay constant for the damped variants.
    pub tau: f64,
}

/// Wrap an angle into `(-π, π]`.
pub fn wrap_phase(phase: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    let wrapped = phase.rem_euclid(TAU);
    if wrapped > PI { wrapped - TAU } else { wrapped }
}

pub fn oscillation_guess(x: &[f64], y: &[f64]) -> OscillationGuess {
    use std::f64::consts::{FRAC_PI_2, PI};

    let span = x_span(x);
    let (y_min, y_max) = min_max(y).unwrap_or((0.0, 0.0));
    let offset = 0.5 * (y_min + y_max);
    let amplitude = 0.5 * (y_max - y_min);
    let frequency = dominant_frequency(x, y)
        .filter(|f| f.is_finite() && *f > 0.0)
        .unwrap_or(1.0 / span);

    let x0 = x.first().copied().unwrap_or(0.0);
    let above = y.first().is_some_and(|&y0| y0 >= offset);
    let start = if above { FRAC_PI_2 } else { -FRAC_PI_2 };
    let phase = wrap_phase(start - 2.0 * PI * frequency * x0);

    OscillationGuess {
        amplitude,
        offset,
        frequency,
        phase,
        tau: 0.5 * span,
    }
}

/// Shared starting point for single-feature lineshapes.
#[derive(Debug, Clone, Copy)]
pub struct FeatureGuess {
    /// Signed amplitude: positive for a peak, negative for a dip.
    pub amplitude: f64,
    pub baseline: f64,
    pub center: f64,
    pub width: f64,
}

/// Peak if the upper tail is more spread than the lower one.
pub fn is_peak(y: &[f64]) -> bool {
    match (percentile(y, 20.0), median(y), percentile(y, 80.0)) {
        (Some(p20), Some(p50), Some(p80)) => (p80 - p50) >= (p50 - p20),
        _ => true,
    }
}

/// x of the most extreme sample, or the mid-range if that extreme sits in the
/// outer 10% on either side.
pub fn feature_center(x: &[f64], y: &[f64], peak: bool) -> f64 {
    let (x_min, x_max) = min_max(x).unwrap_or((0.0, 0.0));
    let mid = 0.5 * (x_min + x_max);
    let extreme = y.iter().enumerate().max_by(|a, b| {
        if peak {
            a.1.total_cmp(b.1)
        } else {
            b.1.total_cmp(a.1)
        }
    });
    let Some((idx, _)) = extreme else {
        return mid;
    };

    let margin = 0.1 * (x_max - x_min);
    let candidate = x[idx];
    if candidate >= x_min + margin && candidate <= x_max - margin {
        candidate
    } else {
        mid
    }
}

pub fn feature_guess(x: &[f64], y: &[f64]) -> FeatureGuess {
    let (y_min, y_max) = min_max(y).unwrap_or((0.0, 0.0));
    let peak = is_peak(y);
    let (amplitude, baseline) = if peak {
        (y_max - y_min, y_min)
    } else {
        (y_min - y_max, y_max)
    };
    FeatureGuess {
        amplitude,
        baseline,
        center: feature_center(x, y, peak),
        width: x_span(x) / 6.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn detects_peak_and_dip() {
        let x: Vec<f64> = (0..101).map(|i| i as f64 * 0.1).collect();
        let bump: Vec<f64> = x.iter().map(|&v| (-(v - 4.0).powi(2)).exp()).collect();
        let g = feature_guess(&x, &bump);
        assert!(g.amplitude > 0.0);
        assert!((g.center - 4.0).abs() < 1e-9);

        let dip: Vec<f64> = bump.iter().map(|v| 3.0 - v).collect();
        let g = feature_guess(&x, &dip);
        assert!(g.amplitude < 0.0);
        assert!((g.baseline - 3.0).abs() < 1e-9);
    }

    #[test]
    fn extreme_near_edge_falls_back_to_midrange() {
        let x: Vec<f64> = (0..11).map(|i| i as f64).collect();
        let mut y = vec![0.0; 11];
        y[0] = 5.0;
        assert_eq!(feature_center(&x, &y, true), 5.0);
    }

    #[test]
    fn oscillation_guess_smoke() {
        let x: Vec<f64> = (0..400).map(|i| i as f64 * 0.005).collect();
        let y: Vec<f64> = x.iter().map(|&t| 2.0 * (2.0 * PI * 4.0 * t).cos() + 1.0).collect();
        let g = oscillation_guess(&x, &y);
        assert!((g.frequency - 4.0).abs() < 0.1, "{}", g.frequency);
        assert!((g.amplitude - 2.0).abs() < 1e-3);
        assert!((g.offset - 1.0).abs() < 1e-3);
        assert!((g.phase - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn phase_wraps_into_half_open_interval() {
        assert!((wrap_phase(2.5 * PI) - PI / 2.0).abs() < 1e-12);
        assert!((wrap_phase(-PI / 2.0) + PI / 2.0).abs() < 1e-12);
    }
}
