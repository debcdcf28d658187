//! Fit driver for a single model kind.
//!
//! Given cleaned samples, a model kind and caller overrides, the driver:
//! - resolves uncertainty weighting (all `yerr > 0` or none at all)
//! - runs the nonlinear solver on the free parameters, or the direct
//!   polynomial / spline solve
//! - re-expands held parameters and the covariance
//! - evaluates fit lines, quality metrics and (linear families) extrema
//!
//! [`Fitter`] owns the samples and remembers the last successful result.

use std::collections::BTreeMap;

use log::{info, warn};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::analysis::{fit_quality, polynomial_extrema, spline_extrema};
use crate::data::clean_samples;
use crate::domain::{ConfidenceBand, FitOptions, ModelKind, SampleSet};
use crate::error::FitError;
use crate::fit::linear::{fit_polynomial, fit_spline};
use crate::fit::params::{ParamLayout, note};
use crate::fit::result::FitResult;
use crate::fit::solver::{LeastSquaresProblem, SolverConfig, Termination, solve_bounded};
use crate::math::stats::linspace;
use crate::models::{FittedCurve, ModelFamily};

/// Points on the dense output grid per input sample.
const DENSE_FACTOR: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitterConfig {
    pub polynomial_degree: usize,
    /// Requested interior knots; capped at `min(N / 2, N - 5)` for N samples.
    pub spline_knots: usize,
    pub solver: SolverConfig,
}

impl Default for FitterConfig {
    fn default() -> Self {
        Self {
            polynomial_degree: 4,
            spline_knots: 7,
            solver: SolverConfig::default(),
        }
    }
}

/// Residuals of the free parameters, with held ones spliced back in.
struct MaskedObjective<'a> {
    family: &'a dyn ModelFamily,
    layout: &'a ParamLayout,
    x: &'a [f64],
    y: &'a [f64],
    /// `1/σ_i` when weighted.
    inv_sigma: Option<&'a [f64]>,
}

impl MaskedObjective<'_> {
    fn weight(&self, i: usize) -> f64 {
        self.inv_sigma.map_or(1.0, |w| w[i])
    }
}

impl LeastSquaresProblem for MaskedObjective<'_> {
    fn residuals(&self, free: &[f64]) -> Vec<f64> {
        let p = self.layout.expand(free);
        self.x
            .iter()
            .zip(self.y)
            .enumerate()
            .map(|(i, (&x, &y))| (self.family.value(x, &p) - y) * self.weight(i))
            .collect()
    }

    fn jacobian(&self, free: &[f64]) -> DMatrix<f64> {
        let p = self.layout.expand(free);
        let full = self.family.jacobian(self.x, &p);
        let cols = self.layout.free_indices();
        DMatrix::from_fn(self.x.len(), cols.len(), |i, k| full[(i, cols[k])] * self.weight(i))
    }
}

/// Valid uncertainties, or `None` (with a warning) if any is non-positive.
fn resolve_weights(samples: &SampleSet, diagnostics: &mut Vec<String>) -> Option<Vec<f64>> {
    let yerr = samples.yerr.as_ref()?;
    if yerr.iter().all(|&e| e > 0.0) {
        Some(yerr.clone())
    } else {
        note(
            diagnostics,
            "yerr contains zero or negative entries; discarding all uncertainties and fitting unweighted"
                .to_string(),
        );
        None
    }
}

/// Scale `(JᵀWJ)⁺` into a covariance.
///
/// Weighted fits take the uncertainties as absolute. Unweighted fits scale by
/// the residual variance `SSR / (N - n_free)`; with no degrees of freedom left
/// every entry becomes infinite.
fn covariance_from(normal_inverse: DMatrix<f64>, ssr: f64, n: usize, n_free: usize, weighted: bool) -> DMatrix<f64> {
    if weighted {
        return normal_inverse;
    }
    if n > n_free {
        normal_inverse * (ssr / (n - n_free) as f64)
    } else {
        DMatrix::from_element(normal_inverse.nrows(), normal_inverse.ncols(), f64::INFINITY)
    }
}

/// What each fitting path hands to the shared result assembly.
struct RawFit {
    names: Vec<String>,
    params: Vec<f64>,
    bounds: Vec<(f64, f64)>,
    covariance: DMatrix<f64>,
    held: BTreeMap<String, f64>,
    n_free: usize,
    curve: FittedCurve,
    evaluations: usize,
    termination: Option<Termination>,
}

fn fit_nonlinear(
    family: &dyn ModelFamily,
    samples: &SampleSet,
    weights: Option<&[f64]>,
    config: &SolverConfig,
    options: &FitOptions,
    diagnostics: &mut Vec<String>,
    kind: ModelKind,
) -> Result<RawFit, FitError> {
    let names = family.names();
    let (layout, guess) = kind
        .resolve_guess(&samples.x, &samples.y, options, diagnostics)
        .ok_or_else(|| FitError::InvalidModelConfig(format!("{} has no parameter set", kind.display_name())))?;

    let inv_sigma: Option<Vec<f64>> = weights.map(|w| w.iter().map(|e| 1.0 / e).collect());
    let objective = MaskedObjective {
        family,
        layout: &layout,
        x: &samples.x,
        y: &samples.y,
        inv_sigma: inv_sigma.as_deref(),
    };

    let n_free = layout.n_free();
    let (params, normal_inverse, ssr, evaluations, termination) = if n_free == 0 {
        let r = objective.residuals(&[]);
        if r.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonFiniteResidual);
        }
        let ssr = r.iter().map(|v| v * v).sum::<f64>();
        (layout.expand(&[]), DMatrix::zeros(0, 0), ssr, 1, None)
    } else {
        let outcome = solve_bounded(
            &objective,
            &layout.select_free(&guess.values),
            &layout.select_free(&guess.bounds),
            &layout.select_free(&guess.scale),
            config,
        )?;
        (
            layout.expand(&outcome.params),
            outcome.normal_inverse,
            2.0 * outcome.cost,
            outcome.evaluations,
            Some(outcome.termination),
        )
    };

    let cov_free = covariance_from(normal_inverse, ssr, samples.len(), n_free, weights.is_some());
    let held = layout
        .held_names()
        .into_iter()
        .filter_map(|name| {
            let i = names.iter().position(|n| *n == name)?;
            Some((name, params[i]))
        })
        .collect();

    Ok(RawFit {
        names: names.iter().map(|s| s.to_string()).collect(),
        curve: FittedCurve::Parametric {
            kind,
            params: params.clone(),
        },
        params,
        bounds: guess.bounds,
        covariance: layout.expand_covariance(&cov_free),
        held,
        n_free,
        evaluations,
        termination,
    })
}

fn fit_linear(
    kind: ModelKind,
    samples: &SampleSet,
    weights: Option<&[f64]>,
    config: &FitterConfig,
) -> Result<RawFit, FitError> {
    let inv_sigma: Option<Vec<f64>> = weights.map(|w| w.iter().map(|e| 1.0 / e).collect());
    let (prefix, fit, curve) = match kind {
        ModelKind::Spline => {
            let (spline, fit) = fit_spline(
                &samples.x,
                &samples.y,
                inv_sigma.as_deref(),
                config.spline_knots,
            )?;
            ("b", fit, FittedCurve::Spline { spline })
        }
        _ => {
            let fit = fit_polynomial(
                &samples.x,
                &samples.y,
                inv_sigma.as_deref(),
                config.polynomial_degree,
            )?;
            let coeffs = fit.coeffs.clone();
            ("c", fit, FittedCurve::Polynomial { coeffs })
        }
    };

    let n_free = fit.coeffs.len();
    Ok(RawFit {
        names: (0..n_free).map(|i| format!("{prefix}{i}")).collect(),
        bounds: vec![(f64::NEG_INFINITY, f64::INFINITY); n_free],
        covariance: covariance_from(fit.normal_inverse, fit.sse, samples.len(), n_free, weights.is_some()),
        params: fit.coeffs,
        held: BTreeMap::new(),
        n_free,
        curve,
        evaluations: 0,
        termination: None,
    })
}

/// Fit already-cleaned samples. This is the pure `(data, model, options)` core.
pub fn fit_samples(
    samples: &SampleSet,
    kind: ModelKind,
    config: &FitterConfig,
    options: &FitOptions,
) -> Result<FitResult, FitError> {
    if samples.is_empty() {
        return Err(FitError::EmptyDataset);
    }
    let mut diagnostics = Vec::new();
    let weights = resolve_weights(samples, &mut diagnostics);

    let raw = match kind.family() {
        Some(family) => fit_nonlinear(
            family,
            samples,
            weights.as_deref(),
            &config.solver,
            options,
            &mut diagnostics,
            kind,
        )?,
        None => {
            if !options.is_empty() {
                note(
                    &mut diagnostics,
                    format!(
                        "{} fits have no named parameters; hold/guess/bounds/scale overrides ignored",
                        kind.display_name()
                    ),
                );
            }
            fit_linear(kind, samples, weights.as_deref(), config)?
        }
    };

    let fit_line = raw.curve.values(&samples.x);
    let residuals = samples.y.iter().zip(&fit_line).map(|(y, f)| y - f).collect();
    let (x_min, x_max) = samples.x_range().ok_or(FitError::EmptyDataset)?;
    let dense_x = linspace(x_min, x_max, DENSE_FACTOR * samples.len());
    let dense_fit = raw.curve.values(&dense_x);
    let quality = fit_quality(&samples.y, &fit_line, weights.as_deref(), raw.n_free);

    let extrema = match &raw.curve {
        FittedCurve::Polynomial { coeffs } => polynomial_extrema(coeffs, x_min, x_max),
        FittedCurve::Spline { spline } => spline_extrema(spline),
        FittedCurve::Parametric { .. } => Vec::new(),
    };

    let errors = (0..raw.params.len())
        .map(|i| raw.covariance[(i, i)].max(0.0).sqrt())
        .collect();

    info!(
        "{} fit: {} points, {} free parameters, R^2 = {:.6}, {} evaluations",
        kind.display_name(),
        samples.len(),
        raw.n_free,
        quality.r_squared,
        raw.evaluations
    );

    Ok(FitResult {
        model: kind,
        samples: samples.clone(),
        weighted: weights.is_some(),
        names: raw.names,
        params: raw.params,
        errors,
        bounds: raw.bounds,
        covariance: raw.covariance,
        held: raw.held,
        curve: raw.curve,
        fit_line,
        residuals,
        dense_x,
        dense_fit,
        quality,
        extrema,
        evaluations: raw.evaluations,
        termination: raw.termination,
        diagnostics,
        band: None,
    })
}

/// Stateful front end: owns cleaned samples and the last successful result.
#[derive(Debug, Clone)]
pub struct Fitter {
    samples: SampleSet,
    model: ModelKind,
    config: FitterConfig,
    last: Option<FitResult>,
}

impl Fitter {
    /// Clean and take ownership of the samples.
    pub fn new(
        x: &[f64],
        y: &[f64],
        model: ModelKind,
        yerr: Option<&[f64]>,
        config: FitterConfig,
    ) -> Result<Self, FitError> {
        let samples = clean_samples(x, y, yerr)?;
        Ok(Self {
            samples,
            model,
            config,
            last: None,
        })
    }

    pub fn samples(&self) -> &SampleSet {
        &self.samples
    }

    pub fn model(&self) -> ModelKind {
        self.model
    }

    pub fn config(&self) -> &FitterConfig {
        &self.config
    }

    /// Run a fit. A failure discards any previous result.
    pub fn fit(&mut self, options: &FitOptions) -> Result<&FitResult, FitError> {
        self.last = None;
        let result = fit_samples(&self.samples, self.model, &self.config, options)?;
        Ok(&*self.last.insert(result))
    }

    pub fn fit_succeeded(&self) -> bool {
        self.last.is_some()
    }

    pub fn result(&self) -> Option<&FitResult> {
        self.last.as_ref()
    }

    pub fn into_result(self) -> Option<FitResult> {
        self.last
    }

    fn require_fit(&self) -> Result<&FitResult, FitError> {
        self.last.as_ref().ok_or_else(|| {
            warn!("no successful fit available");
            FitError::NoFitAvailable
        })
    }

    pub fn value(&self, x: f64) -> Result<f64, FitError> {
        Ok(self.require_fit()?.value(x))
    }

    pub fn values(&self, x: &[f64]) -> Result<Vec<f64>, FitError> {
        Ok(self.require_fit()?.curve.values(x))
    }

    pub fn confidence_band(&self, x: &[f64], level: f64) -> Result<ConfidenceBand, FitError> {
        self.require_fit()?.confidence_band(x, level)
    }
}
