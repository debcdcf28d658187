//! Sample preparation and synthetic data.

pub mod clean;
pub mod sample;

pub use clean::clean_samples;
