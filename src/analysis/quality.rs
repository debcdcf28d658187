//! Regression-quality metrics.

use crate::domain::FitQuality;

/// Residual standard error, R² and (when weighted) reduced χ².
///
/// Pairs where either `y` or the fit is non-finite are left out of every sum.
/// A constant `y` gives `R² = 1` for an exact fit and `0` otherwise.
pub fn fit_quality(y: &[f64], fit: &[f64], yerr: Option<&[f64]>, n_free: usize) -> FitQuality {
    let pairs: Vec<(usize, f64, f64)> = y
        .iter()
        .zip(fit)
        .enumerate()
        .filter(|(_, (a, b))| a.is_finite() && b.is_finite())
        .map(|(i, (&a, &b))| (i, a, b))
        .collect();
    let n = pairs.len();
    if n == 0 {
        return FitQuality {
            residual_std_error: f64::NAN,
            r_squared: f64::NAN,
            reduced_chi_squared: None,
            n: 0,
            n_free,
        };
    }

    let y_mean = pairs.iter().map(|p| p.1).sum::<f64>() / n as f64;
    let ss_res: f64 = pairs.iter().map(|&(_, a, b)| (a - b).powi(2)).sum();
    let ss_tot: f64 = pairs.iter().map(|&(_, a, _)| (a - y_mean).powi(2)).sum();

    let r_squared = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    };

    let reduced_chi_squared = yerr.and_then(|err| {
        let dof = n.checked_sub(n_free).filter(|d| *d > 0)?;
        let chi2: f64 = pairs
            .iter()
            .map(|&(i, a, b)| ((a - b) / err[i]).powi(2))
            .sum();
        Some(chi2 / dof as f64)
    });

    FitQuality {
        residual_std_error: (ss_res / n as f64).sqrt(),
        r_squared,
        reduced_chi_squared,
        n,
        n_free,
    }
}
