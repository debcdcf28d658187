//! Dominant-frequency estimate from the discrete Fourier transform.
//!
//! Samples are treated as evenly spaced at the mean spacing of `x`. The signal is
//! mean-subtracted and zero-padded before the transform so the peak bin can be
//! located more finely than `1 / (n Δx)`, and the peak is then refined by
//! parabolic interpolation over its two neighbours.

use num_complex::Complex;
use rustfft::FftPlanner;

use crate::math::stats::{mean, min_max};

/// Zero-padding factor applied before the transform.
const PAD_FACTOR: usize = 8;

/// Frequency (in inverse x units) of the strongest non-zero DFT component.
///
/// Returns `None` if there are fewer than 4 samples, the x-range is degenerate, or
/// the signal is constant.
pub fn dominant_frequency(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = y.len();
    if n < 4 || x.len() != n {
        return None;
    }
    let (x_min, x_max) = min_max(x)?;
    let dx = (x_max - x_min) / (n as f64 - 1.0);
    if !(dx > 0.0) {
        return None;
    }

    let y_mean = mean(y)?;
    let n_fft = (n * PAD_FACTOR).next_power_of_two();
    let mut buffer: Vec<Complex<f64>> = y
        .iter()
        .map(|&v| Complex::new(v - y_mean, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(n_fft)
        .collect();

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n_fft);
    fft.process(&mut buffer);

    let half = n_fft / 2;
    let mags: Vec<f64> = buffer[..=half].iter().map(|c| c.norm()).collect();

    let (k_peak, &peak) = mags
        .iter()
        .enumerate()
        .skip(1)
        .max_by(|a, b| a.1.total_cmp(b.1))?;
    if !(peak > 0.0) {
        return None;
    }

    // Parabolic refinement of the peak position.
    let mut k = k_peak as f64;
    if k_peak > 1 && k_peak < half {
        let (a, b, c) = (mags[k_peak - 1], mags[k_peak], mags[k_peak + 1]);
        let denom = a - 2.0 * b + c;
        if denom.abs() > 0.0 {
            let delta = 0.5 * (a - c) / denom;
            if delta.abs() <= 0.5 {
                k += delta;
            }
        }
    }

    Some(k / (n_fft as f64 * dx))
}
