//! Power-basis polynomials: evaluation, derivatives and real roots.
//!
//! Coefficients are stored in ascending order: `c[k]` multiplies `x^k`.

use nalgebra::DMatrix;

/// Relative size below which a leading coefficient is treated as zero.
const LEADING_EPS: f64 = 1e-13;

/// Relative imaginary part below which an eigenvalue is treated as real.
const IMAG_EPS: f64 = 1e-7;

/// Horner evaluation.
pub fn eval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// Coefficients of the derivative polynomial.
pub fn derivative(coeffs: &[f64]) -> Vec<f64> {
    coeffs
        .iter()
        .enumerate()
        .skip(1)
        .map(|(k, &c)| k as f64 * c)
        .collect()
}

/// Drop negligible leading (highest-degree) coefficients.
fn trim(coeffs: &[f64]) -> &[f64] {
    let scale = coeffs.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
    if scale == 0.0 {
        return &coeffs[..0];
    }
    let mut len = coeffs.len();
    while len > 0 && coeffs[len - 1].abs() <= LEADING_EPS * scale {
        len -= 1;
    }
    &coeffs[..len]
}

/// Real roots of a polynomial, ascending.
///
/// Roots come from the eigenvalues of the companion matrix; those with a
/// non-negligible imaginary part are discarded and the rest are polished with a
/// couple of Newton steps.
pub fn real_roots(coeffs: &[f64]) -> Vec<f64> {
    let c = trim(coeffs);
    if c.len() < 2 {
        return Vec::new();
    }
    let degree = c.len() - 1;
    let lead = c[degree];

    let mut roots = if degree == 1 {
        vec![-c[0] / c[1]]
    } else {
        let mut companion = DMatrix::<f64>::zeros(degree, degree);
        for i in 1..degree {
            companion[(i, i - 1)] = 1.0;
        }
        for i in 0..degree {
            companion[(i, degree - 1)] = -c[i] / lead;
        }
        companion
            .complex_eigenvalues()
            .iter()
            .filter(|z| z.im.abs() <= IMAG_EPS * z.re.abs().max(1.0))
            .map(|z| z.re)
            .collect::<Vec<_>>()
    };

    let dc = derivative(c);
    for r in roots.iter_mut() {
        for _ in 0..3 {
            let d = eval(&dc, *r);
            if d == 0.0 || !d.is_finite() {
                break;
            }
            let step = eval(c, *r) / d;
            if !step.is_finite() {
                break;
            }
            *r -= step;
        }
    }

    roots.retain(|r| r.is_finite());
    roots.sort_by(|a, b| a.total_cmp(b));
    roots.dedup_by(|a, b| (*a - *b).abs() <= 1e-10 * b.abs().max(1.0));
    roots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_and_derivative() {
        // 1 + 2x + 3x^2
        let c = [1.0, 2.0, 3.0];
        assert_eq!(eval(&c, 2.0), 17.0);
        assert_eq!(derivative(&c), vec![2.0, 6.0]);
    }

    #[test]
    fn real_roots_of_cubic() {
        // (x - 1)(x + 2)(x - 3) = x^3 - 2x^2 - 5x + 6
        let roots = real_roots(&[6.0, -5.0, -2.0, 1.0]);
        assert_eq!(roots.len(), 3);
        for (r, expected) in roots.iter().zip([-2.0, 1.0, 3.0]) {
            assert!((r - expected).abs() < 1e-9, "{r} vs {expected}");
        }
    }

    #[test]
    fn complex_roots_are_dropped() {
        // x^2 + 1
        assert!(real_roots(&[1.0, 0.0, 1.0]).is_empty());
    }

    #[test]
    fn negligible_leading_terms_are_trimmed() {
        let roots = real_roots(&[-2.0, 1.0, 1e-20]);
        assert_eq!(roots.len(), 1);
        assert!((roots[0] - 2.0).abs() < 1e-12);
    }
}
