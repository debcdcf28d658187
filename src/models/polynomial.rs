//! Design matrices for the linear families.

use nalgebra::DMatrix;

use crate::math::bspline::{basis_row, coeff_count};

/// Power-basis design: row `i` is `[1, x_i, x_i², ..., x_i^degree]`.
pub fn design_matrix(x: &[f64], degree: usize) -> DMatrix<f64> {
    let mut m = DMatrix::<f64>::zeros(x.len(), degree + 1);
    for (i, &xi) in x.iter().enumerate() {
        let mut v = 1.0;
        for j in 0..=degree {
            m[(i, j)] = v;
            v *= xi;
        }
    }
    m
}

/// B-spline design: row `i` holds every basis function evaluated at `x_i`.
pub fn spline_design_matrix(x: &[f64], knots: &[f64], degree: usize) -> DMatrix<f64> {
    let cols = coeff_count(knots, degree);
    let mut m = DMatrix::<f64>::zeros(x.len(), cols);
    let mut row = vec![0.0; cols];
    for (i, &xi) in x.iter().enumerate() {
        basis_row(knots, degree, xi, &mut row);
        for (j, &b) in row.iter().enumerate() {
            m[(i, j)] = b;
        }
    }
    m
}
