//! Direct (non-iterative) fits: power-basis polynomial and least-squares spline.
//!
//! Design columns are normalized to unit length before the solve and the
//! solution is mapped back afterwards, so a Vandermonde matrix on large x does
//! not trip the rank check on scale alone.

use log::warn;
use nalgebra::DMatrix;

use crate::error::FitError;
use crate::math::bspline::clamped_knots;
use crate::math::stats::linspace;
use crate::math::{BSpline, weighted_least_squares};
use crate::models::polynomial::{design_matrix, spline_design_matrix};

/// Spline degree; its derivative is cubic, which the extremum search relies on.
pub const SPLINE_DEGREE: usize = 4;

#[derive(Debug, Clone)]
pub struct LinearFit {
    pub coeffs: Vec<f64>,
    /// `(XᵀWX)⁺` in coefficient units.
    pub normal_inverse: DMatrix<f64>,
    /// Weighted sum of squared residuals.
    pub sse: f64,
}

fn solve_normalized(
    mut design: DMatrix<f64>,
    y: &[f64],
    row_weights: Option<&[f64]>,
) -> Result<LinearFit, FitError> {
    let norms: Vec<f64> = design
        .column_iter()
        .map(|c| {
            let n = c.norm();
            if n > 0.0 && n.is_finite() { n } else { 1.0 }
        })
        .collect();
    for (j, &n) in norms.iter().enumerate() {
        design.column_mut(j).unscale_mut(n);
    }

    let sol = weighted_least_squares(&design, y, row_weights)?;
    let coeffs = sol.coeffs.iter().zip(&norms).map(|(c, n)| c / n).collect();
    let mut normal_inverse = sol.normal_inverse;
    for i in 0..norms.len() {
        for j in 0..norms.len() {
            normal_inverse[(i, j)] /= norms[i] * norms[j];
        }
    }
    Ok(LinearFit {
        coeffs,
        normal_inverse,
        sse: sol.sse,
    })
}

/// Weighted polynomial least squares, ascending coefficients `c0..c_degree`.
pub fn fit_polynomial(
    x: &[f64],
    y: &[f64],
    row_weights: Option<&[f64]>,
    degree: usize,
) -> Result<LinearFit, FitError> {
    solve_normalized(design_matrix(x, degree), y, row_weights)
}

/// Interior knots: `count` evenly spaced points strictly inside `[x_min, x_max]`.
pub fn interior_knots(x_min: f64, x_max: f64, count: usize) -> Vec<f64> {
    let grid = linspace(x_min, x_max, count + 2);
    grid[1..grid.len() - 1].to_vec()
}

/// Least-squares spline of degree [`SPLINE_DEGREE`].
///
/// The interior knot count is capped at half the number of points and at
/// `N - SPLINE_DEGREE - 1`, so the design never has more columns than rows.
pub fn fit_spline(
    x: &[f64],
    y: &[f64],
    row_weights: Option<&[f64]>,
    requested_knots: usize,
) -> Result<(BSpline, LinearFit), FitError> {
    let (Some(&x_min), Some(&x_max)) = (x.first(), x.last()) else {
        return Err(FitError::EmptyDataset);
    };
    if !(x_max > x_min) {
        return Err(FitError::InvalidModelConfig(
            "spline fit needs at least two distinct x values".to_string(),
        ));
    }

    let count = requested_knots
        .min(x.len() / 2)
        .min(x.len().saturating_sub(SPLINE_DEGREE + 1));
    if count < requested_knots {
        warn!(
            "spline: {} points support at most {count} interior knots; using {count} instead of {requested_knots}",
            x.len()
        );
    }
    let knots = clamped_knots(x_min, x_max, &interior_knots(x_min, x_max, count), SPLINE_DEGREE);
    let fit = solve_normalized(spline_design_matrix(x, &knots, SPLINE_DEGREE), y, row_weights)?;
    let spline = BSpline {
        knots,
        coeffs: fit.coeffs.clone(),
        degree: SPLINE_DEGREE,
    };
    Ok((spline, fit))
}
