//! B-splines on a clamped knot vector.
//!
//! A spline of degree `p` with `m` coefficients uses `m + p + 1` knots. The
//! boundary knots are repeated `p + 1` times so the spline interpolates its end
//! coefficients and is defined exactly on `[x_min, x_max]`.

use serde::{Deserialize, Serialize};

/// A B-spline curve `s(x) = Σ c_j B_{j,p}(x)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BSpline {
    pub knots: Vec<f64>,
    pub coeffs: Vec<f64>,
    pub degree: usize,
}

/// Clamped knot vector: `degree + 1` copies of each end plus the interior knots.
pub fn clamped_knots(x_min: f64, x_max: f64, interior: &[f64], degree: usize) -> Vec<f64> {
    let mut knots = Vec::with_capacity(interior.len() + 2 * (degree + 1));
    knots.extend(std::iter::repeat_n(x_min, degree + 1));
    knots.extend_from_slice(interior);
    knots.extend(std::iter::repeat_n(x_max, degree + 1));
    knots
}

/// Number of coefficients a knot vector supports for the given degree.
pub fn coeff_count(knots: &[f64], degree: usize) -> usize {
    knots.len().saturating_sub(degree + 1)
}

/// Index `i` of the knot span with `t_i <= x < t_{i+1}`, clamped to the valid range.
fn find_span(knots: &[f64], degree: usize, x: f64) -> usize {
    let n = coeff_count(knots, degree);
    if x >= knots[n] {
        return n - 1;
    }
    if x <= knots[degree] {
        return degree;
    }
    let (mut lo, mut hi) = (degree, n);
    while hi - lo > 1 {
        let mid = (lo + hi) / 2;
        if knots[mid] <= x {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Fill `out` (length = coefficient count) with all basis function values at `x`.
///
/// Only the `degree + 1` functions supported on the span of `x` are non-zero.
pub fn basis_row(knots: &[f64], degree: usize, x: f64, out: &mut [f64]) {
    out.iter_mut().for_each(|v| *v = 0.0);
    let span = find_span(knots, degree, x);

    let mut n = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];
    n[0] = 1.0;
    for j in 1..=degree {
        left[j] = x - knots[span + 1 - j];
        right[j] = knots[span + j] - x;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            let temp = if denom != 0.0 { n[r] / denom } else { 0.0 };
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        n[j] = saved;
    }

    for (k, value) in n.into_iter().enumerate() {
        out[span - degree + k] = value;
    }
}

impl BSpline {
    pub fn eval(&self, x: f64) -> f64 {
        let mut row = vec![0.0; self.coeffs.len()];
        basis_row(&self.knots, self.degree, x, &mut row);
        row.iter().zip(&self.coeffs).map(|(b, c)| b * c).sum()
    }

    pub fn eval_many(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|&v| self.eval(v)).collect()
    }

    /// Analytic derivative: a spline of degree `p - 1` on the inner knots.
    ///
    /// Returns `None` for a degree-0 spline.
    pub fn derivative(&self) -> Option<BSpline> {
        if self.degree == 0 {
            return None;
        }
        let p = self.degree;
        let coeffs = (0..self.coeffs.len().saturating_sub(1))
            .map(|j| {
                let span = self.knots[j + p + 1] - self.knots[j + 1];
                if span > 0.0 {
                    p as f64 * (self.coeffs[j + 1] - self.coeffs[j]) / span
                } else {
                    0.0
                }
            })
            .collect();
        Some(BSpline {
            knots: self.knots[1..self.knots.len() - 1].to_vec(),
            coeffs,
            degree: p - 1,
        })
    }

    /// Distinct, non-empty knot intervals over the spline's domain.
    pub fn intervals(&self) -> Vec<(f64, f64)> {
        let n = self.coeffs.len();
        let domain = &self.knots[self.degree..=n];
        domain
            .windows(2)
            .filter(|w| w[1] > w[0])
            .map(|w| (w[0], w[1]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basis_is_partition_of_unity() {
        let knots = clamped_knots(0.0, 1.0, &[0.25, 0.5, 0.75], 4);
        let m = coeff_count(&knots, 4);
        assert_eq!(m, 8);
        let mut row = vec![0.0; m];
        for &x in &[0.0, 0.1, 0.33, 0.5, 0.9, 1.0] {
            basis_row(&knots, 4, x, &mut row);
            let total: f64 = row.iter().sum();
            assert!((total - 1.0).abs() < 1e-12, "sum at {x} was {total}");
        }
    }

    #[test]
    fn derivative_of_linear_spline_is_constant() {
        // Coefficients on the Greville abscissae of a degree-1 spline reproduce y = 2x + 1.
        let knots = clamped_knots(0.0, 2.0, &[1.0], 1);
        let s = BSpline {
            knots,
            coeffs: vec![1.0, 3.0, 5.0],
            degree: 1,
        };
        assert!((s.eval(0.5) - 2.0).abs() < 1e-12);
        let d = s.derivative().unwrap();
        assert!((d.eval(0.3) - 2.0).abs() < 1e-12);
        assert!((d.eval(1.7) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn intervals_skip_repeated_knots() {
        let s = BSpline {
            knots: clamped_knots(0.0, 3.0, &[1.0, 2.0], 3),
            coeffs: vec![0.0; 6],
            degree: 3,
        };
        assert_eq!(s.intervals(), vec![(0.0, 1.0), (1.0, 2.0), (2.0, 3.0)]);
    }
}
