//! Domain types used throughout the engine.
//!
//! This module defines:
//!
//! - the model catalog tag (`ModelKind`)
//! - caller overrides (`FitOptions`)
//! - cleaned samples (`SampleSet`)
//! - post-fit outputs shared with reporting (`FitQuality`, `Extremum`, `ConfidenceBand`)

pub mod types;

pub use types::*;
