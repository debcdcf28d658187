//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between the CLI, the fitter and the analytics
//! - exported to JSON/CSV
//! - reconstructed in tests without touching the engine

use std::collections::BTreeMap;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// The fixed catalog of model families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// `A·exp(-x/τ)·sin(2πfx + φ) + y0`
    ExpDecaySinusoid,
    /// `A·exp(-(x/τ)²)·sin(2πfx + φ) + y0`
    GaussianDecaySinusoid,
    /// `A·sin(2πfx + φ) + y0`
    Sinusoid,
    /// `A·sin⁴(2πfx + φ) + y0`
    QuarticSinusoid,
    /// Lorentzian peak parameterized by its full width at half maximum.
    Lorentzian,
    /// Gaussian peak parameterized by its standard deviation.
    Gaussian,
    /// Error-function step (cumulative Gaussian).
    IntegratedGaussian,
    /// `A·sinc²((x - x0)/w) + y0`, the spectrum of a rectangular pulse.
    Sinc2,
    /// Excitation spectrum of a resonant π-pulse at Rabi frequency Ω.
    RabiSpectrum,
    /// `A·x^α + y0`
    PowerLaw,
    /// `A·exp(b·x) + y0`
    Exponential,
    /// Power-basis polynomial of configurable degree.
    Polynomial,
    /// Least-squares smoothing spline with evenly spaced interior knots.
    Spline,
}

impl ModelKind {
    pub const ALL: [ModelKind; 13] = [
        ModelKind::ExpDecaySinusoid,
        ModelKind::GaussianDecaySinusoid,
        ModelKind::Sinusoid,
        ModelKind::QuarticSinusoid,
        ModelKind::Lorentzian,
        ModelKind::Gaussian,
        ModelKind::IntegratedGaussian,
        ModelKind::Sinc2,
        ModelKind::RabiSpectrum,
        ModelKind::PowerLaw,
        ModelKind::Exponential,
        ModelKind::Polynomial,
        ModelKind::Spline,
    ];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::ExpDecaySinusoid => "exp-damped sinusoid",
            ModelKind::GaussianDecaySinusoid => "gaussian-damped sinusoid",
            ModelKind::Sinusoid => "sinusoid",
            ModelKind::QuarticSinusoid => "quartic sinusoid",
            ModelKind::Lorentzian => "lorentzian",
            ModelKind::Gaussian => "gaussian",
            ModelKind::IntegratedGaussian => "integrated gaussian",
            ModelKind::Sinc2 => "sinc^2",
            ModelKind::RabiSpectrum => "rabi spectrum",
            ModelKind::PowerLaw => "power law",
            ModelKind::Exponential => "exponential",
            ModelKind::Polynomial => "polynomial",
            ModelKind::Spline => "spline",
        }
    }

    /// Polynomial and spline are fitted by linear algebra and have implicit parameters.
    pub fn is_linear(self) -> bool {
        matches!(self, ModelKind::Polynomial | ModelKind::Spline)
    }
}

/// Caller overrides for a single fit.
///
/// Keys are parameter names as reported by the model's `names()`. Keys that do
/// not match the active model are ignored with a warning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    /// Parameters frozen at the given value during optimization.
    pub hold: BTreeMap<String, f64>,
    /// Initial values replacing the autoguess.
    pub manual_guess: BTreeMap<String, f64>,
    /// `(lower, upper)` replacing the default bounds.
    pub manual_bounds: BTreeMap<String, (f64, f64)>,
    /// Natural scales used to condition the solver.
    pub manual_scale: BTreeMap<String, f64>,
}

impl FitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hold(mut self, name: impl Into<String>, value: f64) -> Self {
        self.hold.insert(name.into(), value);
        self
    }

    pub fn guess(mut self, name: impl Into<String>, value: f64) -> Self {
        self.manual_guess.insert(name.into(), value);
        self
    }

    pub fn bounds(mut self, name: impl Into<String>, lower: f64, upper: f64) -> Self {
        self.manual_bounds.insert(name.into(), (lower, upper));
        self
    }

    pub fn scale(mut self, name: impl Into<String>, value: f64) -> Self {
        self.manual_scale.insert(name.into(), value);
        self
    }

    /// True if no override of any kind was supplied.
    pub fn is_empty(&self) -> bool {
        self.hold.is_empty()
            && self.manual_guess.is_empty()
            && self.manual_bounds.is_empty()
            && self.manual_scale.is_empty()
    }
}

/// Cleaned, x-sorted samples owned by the fitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSet {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// One-standard-deviation uncertainties on `y`, parallel to `x`/`y`.
    pub yerr: Option<Vec<f64>>,
}

impl SampleSet {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// `(x_min, x_max)`; samples are sorted so these are the end points.
    pub fn x_range(&self) -> Option<(f64, f64)> {
        Some((*self.x.first()?, *self.x.last()?))
    }
}

/// Whether a stationary point is a maximum or a minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtremumKind {
    Maximum,
    Minimum,
    /// Zero second derivative (inflection or numerically flat).
    Stationary,
}

/// A real root of the fitted curve's derivative inside the observed x-range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extremum {
    pub x: f64,
    pub y: f64,
    pub kind: ExtremumKind,
}

/// Regression-quality metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    /// `sqrt(Σ(y - fit)² / N)`.
    pub residual_std_error: f64,
    /// `1 - SS_res / SS_tot`.
    pub r_squared: f64,
    /// `χ² / (N - n_free)` when the fit was uncertainty-weighted.
    pub reduced_chi_squared: Option<f64>,
    /// Number of samples that entered the sums.
    pub n: usize,
    /// Number of fitted (non-held) parameters.
    pub n_free: usize,
}

/// Per-point confidence band around a fitted curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBand {
    pub level: f64,
    pub x: Vec<f64>,
    pub fit: Vec<f64>,
    pub sigma: Vec<f64>,
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
    /// No covariance model exists (spline), so the band has zero width.
    pub degenerate: bool,
    /// Held parameters were treated as exact and uncorrelated, so the band
    /// likely understates the true uncertainty.
    pub held_assumed_exact: bool,
}
