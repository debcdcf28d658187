//! Post-fit analytics: quality metrics, extrema and confidence bands.

pub mod band;
pub mod extrema;
pub mod quality;

pub use band::{confidence_band, half_width_factor};
pub use extrema::{polynomial_extrema, spline_extrema};
pub use quality::fit_quality;
