//! Mathematical utilities: least squares, polynomials, B-splines, spectra, statistics.

pub mod bspline;
pub mod ols;
pub mod poly;
pub mod spectrum;
pub mod stats;

pub use bspline::BSpline;
pub use ols::*;
