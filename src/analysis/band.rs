//! Confidence bands from the parameter covariance.
//!
//! For each x the fit variance is `J Σ Jᵀ` with `J` the model gradient row, and
//! the band half-width at level `c` is `erfinv(c)·√2·σ`.

use std::f64::consts::SQRT_2;

use log::warn;
use nalgebra::DMatrix;
use statrs::function::erf::erf_inv;

use crate::domain::ConfidenceBand;
use crate::error::FitError;
use crate::models::FittedCurve;

/// Two-sided normal quantile for a confidence level in `(0, 1)`.
pub fn half_width_factor(level: f64) -> Result<f64, FitError> {
    if !(level > 0.0 && level < 1.0) {
        return Err(FitError::InvalidConfidenceLevel(level));
    }
    Ok(erf_inv(level) * SQRT_2)
}

/// `sqrt(diag(J Σ Jᵀ))`, clamped at zero against round-off.
pub fn propagate_sigma(jacobian: &DMatrix<f64>, covariance: &DMatrix<f64>) -> Vec<f64> {
    let js = jacobian * covariance;
    (0..jacobian.nrows())
        .map(|i| {
            let var = js.row(i).dot(&jacobian.row(i));
            if var.is_nan() { var } else { var.max(0.0).sqrt() }
        })
        .collect()
}

/// Band of `curve` at `x` for the given level.
///
/// Curves without a parameter Jacobian (splines) get a zero-width band flagged
/// as degenerate. A non-finite covariance yields `sigma = +inf` everywhere, so
/// `upper`/`lower` become `±inf` rather than NaN.
pub fn confidence_band(
    curve: &FittedCurve,
    covariance: &DMatrix<f64>,
    x: &[f64],
    level: f64,
    held_assumed_exact: bool,
) -> Result<ConfidenceBand, FitError> {
    let factor = half_width_factor(level)?;
    let fit = curve.values(x);

    let (sigma, degenerate) = match curve.jacobian(x) {
        Some(_) if covariance.iter().any(|v| !v.is_finite()) => {
            warn!("confidence band: covariance is not finite (no residual degrees of freedom?); band is unbounded");
            (vec![f64::INFINITY; x.len()], false)
        }
        Some(jac) => (propagate_sigma(&jac, covariance), false),
        None => {
            warn!("confidence band: no covariance model for spline fits; returning a zero-width band");
            (vec![0.0; x.len()], true)
        }
    };

    let upper = fit.iter().zip(&sigma).map(|(f, s)| f + factor * s).collect();
    let lower = fit.iter().zip(&sigma).map(|(f, s)| f - factor * s).collect();

    if held_assumed_exact && !degenerate {
        warn!("confidence band: held parameters are treated as exact; the band may be too narrow");
    }

    Ok(ConfidenceBand {
        level,
        x: x.to_vec(),
        fit,
        sigma,
        upper,
        lower,
        degenerate,
        held_assumed_exact,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ninety_five_percent_is_about_two_sigma() {
        let k = half_width_factor(0.95).unwrap();
        assert!((k - 1.959964).abs() < 1e-5);
    }

    #[test]
    fn rejects_levels_outside_unit_interval() {
        for level in [0.0, 1.0, -0.5, f64::NAN] {
            assert!(matches!(
                half_width_factor(level),
                Err(FitError::InvalidConfidenceLevel(_))
            ));
        }
    }

    #[test]
    fn straight_line_band_widens_away_from_data_centre() {
        let curve = FittedCurve::Polynomial { coeffs: vec![1.0, 2.0] };
        // Covariance of intercept/slope with negative correlation.
        let cov = DMatrix::from_row_slice(2, 2, &[0.04, -0.01, -0.01, 0.01]);
        let band = confidence_band(&curve, &cov, &[0.0, 1.0, 3.0], 0.68, false).unwrap();
        assert!(band.sigma[1] < band.sigma[0]);
        assert!(band.sigma[2] > band.sigma[0]);
        for i in 0..3 {
            assert!(band.upper[i] > band.fit[i] && band.lower[i] < band.fit[i]);
        }
    }

    #[test]
    fn infinite_covariance_gives_unbounded_band() {
        let curve = FittedCurve::Polynomial { coeffs: vec![1.0, 2.0] };
        let cov = DMatrix::from_element(2, 2, f64::INFINITY);
        let band = confidence_band(&curve, &cov, &[0.0, 0.5, 1.0], 0.9, false).unwrap();
        assert!(band.sigma.iter().all(|s| *s == f64::INFINITY));
        assert!(band.upper.iter().all(|u| *u == f64::INFINITY));
        assert!(band.lower.iter().all(|l| *l == f64::NEG_INFINITY));
        assert!(!band.degenerate);
    }
}
