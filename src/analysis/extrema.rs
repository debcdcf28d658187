//! Stationary points of polynomial and spline fits.
//!
//! Both paths find real roots of the analytic first derivative inside the
//! observed x-range and classify each root by the sign of the second
//! derivative.

use nalgebra::{Matrix4, Vector4};

use crate::domain::{Extremum, ExtremumKind};
use crate::math::BSpline;
use crate::math::poly;

fn classify(second_derivative: f64) -> ExtremumKind {
    if second_derivative < 0.0 {
        ExtremumKind::Maximum
    } else if second_derivative > 0.0 {
        ExtremumKind::Minimum
    } else {
        ExtremumKind::Stationary
    }
}

/// Extrema of an ascending-coefficient polynomial within `[x_min, x_max]`.
pub fn polynomial_extrema(coeffs: &[f64], x_min: f64, x_max: f64) -> Vec<Extremum> {
    let d1 = poly::derivative(coeffs);
    let d2 = poly::derivative(&d1);
    poly::real_roots(&d1)
        .into_iter()
        .filter(|&x| x >= x_min && x <= x_max)
        .map(|x| Extremum {
            x,
            y: poly::eval(coeffs, x),
            kind: classify(poly::eval(&d2, x)),
        })
        .collect()
}

/// Extrema of a spline of degree 4 (derivative is piecewise cubic).
///
/// On each knot interval the derivative is an exact cubic, recovered from four
/// samples in the local variable `t ∈ [0, 1]`; its real roots in `[0, 1]` are
/// mapped back to x. Roots shared by adjacent intervals are merged.
pub fn spline_extrema(spline: &BSpline) -> Vec<Extremum> {
    let Some(d1) = spline.derivative() else {
        return Vec::new();
    };
    let d2 = d1.derivative();

    let nodes: [f64; 4] = [0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0];
    let vandermonde = Matrix4::from_fn(|i, j| nodes[i].powi(j as i32));
    let Some(inverse) = vandermonde.try_inverse() else {
        return Vec::new();
    };

    let mut roots: Vec<f64> = Vec::new();
    for (a, b) in spline.intervals() {
        let h = b - a;
        let samples = Vector4::from_fn(|i, _| d1.eval(a + nodes[i] * h));
        let local = inverse * samples;
        let coeffs = [local[0], local[1], local[2], local[3]];
        if coeffs.iter().all(|c| *c == 0.0) {
            continue;
        }
        roots.extend(
            poly::real_roots(&coeffs)
                .into_iter()
                .filter(|t| (-1e-9..=1.0 + 1e-9).contains(t))
                .map(|t| a + t.clamp(0.0, 1.0) * h),
        );
    }

    roots.sort_by(|a, b| a.total_cmp(b));
    let span = spline
        .intervals()
        .first()
        .zip(spline.intervals().last())
        .map(|(first, last)| last.1 - first.0)
        .unwrap_or(1.0);
    roots.dedup_by(|a, b| (*a - *b).abs() <= 1e-9 * span.max(1.0));

    roots
        .into_iter()
        .map(|x| Extremum {
            x,
            y: spline.eval(x),
            kind: classify(d2.as_ref().map(|s| s.eval(x)).unwrap_or(0.0)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::bspline::{basis_row, clamped_knots, coeff_count};
    use crate::math::ols::solve_least_squares;
    use nalgebra::{DMatrix, DVector};

    #[test]
    fn quadratic_has_single_maximum() {
        // 5 - (x - 1)^2 = 4 + 2x - x^2
        let ext = polynomial_extrema(&[4.0, 2.0, -1.0], -2.0, 4.0);
        assert_eq!(ext.len(), 1);
        assert!((ext[0].x - 1.0).abs() < 1e-12);
        assert!((ext[0].y - 5.0).abs() < 1e-12);
        assert_eq!(ext[0].kind, ExtremumKind::Maximum);
    }

    #[test]
    fn roots_outside_range_are_dropped() {
        let ext = polynomial_extrema(&[4.0, 2.0, -1.0], 2.0, 4.0);
        assert!(ext.is_empty());
    }

    #[test]
    fn spline_finds_minimum_of_parabola() {
        // A degree-4 spline reproduces a quadratic exactly.
        let knots = clamped_knots(0.0, 4.0, &[1.0, 2.0, 3.0], 4);
        let m = coeff_count(&knots, 4);
        let x: Vec<f64> = (0..81).map(|i| i as f64 * 0.05).collect();
        let mut design = DMatrix::<f64>::zeros(x.len(), m);
        let mut row = vec![0.0; m];
        for (i, &xi) in x.iter().enumerate() {
            basis_row(&knots, 4, xi, &mut row);
            for j in 0..m {
                design[(i, j)] = row[j];
            }
        }
        let y = DVector::from_iterator(x.len(), x.iter().map(|&v| (v - 1.7).powi(2) - 2.0));
        let coeffs = solve_least_squares(&design, &y).unwrap();
        let spline = BSpline {
            knots,
            coeffs: coeffs.iter().copied().collect(),
            degree: 4,
        };

        let ext = spline_extrema(&spline);
        assert_eq!(ext.len(), 1, "{ext:?}");
        assert!((ext[0].x - 1.7).abs() < 1e-6);
        assert!((ext[0].y + 2.0).abs() < 1e-6);
        assert_eq!(ext[0].kind, ExtremumKind::Minimum);
    }
}
