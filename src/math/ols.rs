//! Weighted least squares and covariance helpers.
//!
//! The linear problems solved here are of the form:
//!
//! ```text
//! minimize Σ (w_i (y_i - x_i^T β))^2
//! ```
//!
//! where `w_i = 1 / σ_i` when valid uncertainties are available, else 1.
//!
//! Implementation choices:
//! - Rows are scaled by `w_i` and the problem is solved by SVD, which copes with
//!   tall design matrices and reports the numerical rank.
//!   (Nalgebra's `QR::solve` is intended for square systems.)
//! - Covariances are `(XᵀX)⁺` built from the same SVD (`V Σ⁻² Vᵀ`), so a nearly
//!   collinear design never produces an exploding explicit inverse.

use nalgebra::{DMatrix, DVector};

use crate::error::FitError;

/// Result of a (weighted) linear least-squares solve.
#[derive(Debug, Clone)]
pub struct LinearSolution {
    pub coeffs: DVector<f64>,
    /// `(XᵀWX)⁺` for the weighted design.
    pub normal_inverse: DMatrix<f64>,
    /// Weighted sum of squared residuals.
    pub sse: f64,
}

/// Relative singular-value cutoff used for rank decisions.
///
/// Matches the usual `eps * max(m, n) * s_max` convention.
fn rank_tolerance(rows: usize, cols: usize, s_max: f64) -> f64 {
    f64::EPSILON * rows.max(cols) as f64 * s_max
}

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);
    let s_max = svd.singular_values.max();
    let tol = rank_tolerance(x.nrows(), x.ncols(), s_max);
    let beta = svd.solve(y, tol).ok()?;
    if beta.iter().all(|v| v.is_finite()) {
        Some(beta)
    } else {
        None
    }
}

/// Weighted linear least squares with rank check and covariance.
///
/// `row_weights` multiplies each residual (pass `1/σ_i`), `None` means unweighted.
pub fn weighted_least_squares(
    design: &DMatrix<f64>,
    y: &[f64],
    row_weights: Option<&[f64]>,
) -> Result<LinearSolution, FitError> {
    let n = design.nrows();
    let p = design.ncols();

    let mut xw = design.clone();
    let mut yw = DVector::from_column_slice(y);
    if let Some(w) = row_weights {
        for i in 0..n {
            let wi = w[i];
            for j in 0..p {
                xw[(i, j)] *= wi;
            }
            yw[i] *= wi;
        }
    }

    let rank = numerical_rank(&xw);
    if rank < p {
        return Err(FitError::SingularDesign { rank, columns: p });
    }

    let coeffs = solve_least_squares(&xw, &yw).ok_or(FitError::SingularDesign { rank, columns: p })?;
    let residual = &yw - &xw * &coeffs;
    let sse = residual.norm_squared();

    Ok(LinearSolution {
        coeffs,
        normal_inverse: normal_pseudo_inverse(&xw),
        sse,
    })
}

/// Numerical rank of `m` from its singular values.
pub fn numerical_rank(m: &DMatrix<f64>) -> usize {
    if m.nrows() == 0 || m.ncols() == 0 {
        return 0;
    }
    let s = m.clone().singular_values();
    let tol = rank_tolerance(m.nrows(), m.ncols(), s.max());
    s.iter().filter(|&&v| v > tol).count()
}

/// `(JᵀJ)⁺` computed from the SVD of `J`.
///
/// Singular directions below the rank tolerance contribute nothing, which is the
/// pseudo-inverse convention for covariance estimates of degenerate fits.
pub fn normal_pseudo_inverse(j: &DMatrix<f64>) -> DMatrix<f64> {
    let p = j.ncols();
    let mut out = DMatrix::<f64>::zeros(p, p);
    if j.nrows() == 0 || p == 0 {
        return out;
    }

    let svd = j.clone().svd(false, true);
    let Some(v_t) = svd.v_t else {
        return out;
    };
    let s = &svd.singular_values;
    let tol = rank_tolerance(j.nrows(), p, s.max());

    for (k, &sk) in s.iter().enumerate() {
        if sk <= tol {
            continue;
        }
        let inv = 1.0 / (sk * sk);
        let vk = v_t.row(k);
        for a in 0..p {
            for b in 0..p {
                out[(a, b)] += vk[a] * vk[b] * inv;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn weighted_fit_reports_singular_design() {
        // Two identical columns.
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
        let err = weighted_least_squares(&x, &[1.0, 2.0, 3.0], None).unwrap_err();
        assert_eq!(err, FitError::SingularDesign { rank: 1, columns: 2 });
    }

    #[test]
    fn normal_pseudo_inverse_matches_explicit_inverse() {
        let j = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let explicit = (j.transpose() * &j).try_inverse().unwrap();
        let pinv = normal_pseudo_inverse(&j);
        for (a, b) in explicit.iter().zip(pinv.iter()) {
            assert!((a - b).abs() < 1e-10);
        }
    }
}
