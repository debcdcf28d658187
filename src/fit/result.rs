//! Fit results and their flat record form.

use std::collections::BTreeMap;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::analysis;
use crate::domain::{ConfidenceBand, Extremum, FitQuality, ModelKind, SampleSet};
use crate::error::FitError;
use crate::fit::solver::Termination;
use crate::models::FittedCurve;

/// Everything a single fit produced. Immutable apart from attaching a band.
#[derive(Debug, Clone)]
pub struct FitResult {
    pub model: ModelKind,
    /// Cleaned, sorted samples the fit ran on.
    pub samples: SampleSet,
    /// True if residuals were divided by `yerr`.
    pub weighted: bool,
    pub names: Vec<String>,
    pub params: Vec<f64>,
    /// One-sigma errors, exactly zero for held parameters.
    pub errors: Vec<f64>,
    /// Effective bounds per parameter (unbounded for polynomial / spline).
    pub bounds: Vec<(f64, f64)>,
    pub covariance: DMatrix<f64>,
    /// Held parameter names and values.
    pub held: BTreeMap<String, f64>,
    pub curve: FittedCurve,
    /// Fit evaluated at `samples.x`.
    pub fit_line: Vec<f64>,
    /// `y - fit_line`.
    pub residuals: Vec<f64>,
    pub dense_x: Vec<f64>,
    pub dense_fit: Vec<f64>,
    pub quality: FitQuality,
    /// Polynomial / spline only.
    pub extrema: Vec<Extremum>,
    /// Residual evaluations spent by the nonlinear solver (0 for direct fits).
    pub evaluations: usize,
    pub termination: Option<Termination>,
    /// Recovered conditions logged while fitting (dropped overrides etc.).
    pub diagnostics: Vec<String>,
    pub band: Option<ConfidenceBand>,
}

/// A single value of the flat result record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordValue {
    Bool(bool),
    Integer(u64),
    Float(f64),
    Text(String),
    FloatArray(Vec<f64>),
    FloatMatrix(Vec<Vec<f64>>),
    NamedFloats(BTreeMap<String, f64>),
}

/// Flat, primitive-valued representation of a [`FitResult`].
pub type FitRecord = BTreeMap<String, RecordValue>;

impl FitResult {
    pub fn param(&self, name: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == name)?;
        Some(self.params[i])
    }

    pub fn error(&self, name: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == name)?;
        Some(self.errors[i])
    }

    pub fn params_by_name(&self) -> BTreeMap<String, f64> {
        self.names.iter().cloned().zip(self.params.iter().copied()).collect()
    }

    pub fn errors_by_name(&self) -> BTreeMap<String, f64> {
        self.names.iter().cloned().zip(self.errors.iter().copied()).collect()
    }

    pub fn value(&self, x: f64) -> f64 {
        self.curve.value(x)
    }

    pub fn is_held(&self, name: &str) -> bool {
        self.held.contains_key(name)
    }

    /// Band at arbitrary x from this fit's covariance.
    pub fn confidence_band(&self, x: &[f64], level: f64) -> Result<ConfidenceBand, FitError> {
        analysis::confidence_band(&self.curve, &self.covariance, x, level, !self.held.is_empty())
    }

    /// Attach a band over the dense grid.
    pub fn with_confidence_band(mut self, level: f64) -> Result<Self, FitError> {
        self.band = Some(self.confidence_band(&self.dense_x, level)?);
        Ok(self)
    }

    pub fn to_record(&self) -> FitRecord {
        use RecordValue::*;

        let mut rec = FitRecord::new();
        rec.insert("fit_succeeded".into(), Bool(true));
        rec.insert("model".into(), Text(self.model.display_name().to_string()));
        rec.insert("weighted".into(), Bool(self.weighted));
        rec.insert("x".into(), FloatArray(self.samples.x.clone()));
        rec.insert("y".into(), FloatArray(self.samples.y.clone()));
        if let Some(e) = &self.samples.yerr {
            rec.insert("yerr".into(), FloatArray(e.clone()));
        }
        rec.insert("params".into(), FloatArray(self.params.clone()));
        rec.insert("best_fit".into(), NamedFloats(self.params_by_name()));
        rec.insert("errors".into(), NamedFloats(self.errors_by_name()));
        rec.insert("held".into(), NamedFloats(self.held.clone()));
        rec.insert(
            "covariance".into(),
            FloatMatrix(
                self.covariance
                    .row_iter()
                    .map(|r| r.iter().copied().collect())
                    .collect(),
            ),
        );
        rec.insert("fit_line".into(), FloatArray(self.fit_line.clone()));
        rec.insert("residuals".into(), FloatArray(self.residuals.clone()));
        rec.insert("dense_x".into(), FloatArray(self.dense_x.clone()));
        rec.insert("dense_fit".into(), FloatArray(self.dense_fit.clone()));
        rec.insert("residual_std_error".into(), Float(self.quality.residual_std_error));
        rec.insert("r_squared".into(), Float(self.quality.r_squared));
        if let Some(chi2) = self.quality.reduced_chi_squared {
            rec.insert("reduced_chi_squared".into(), Float(chi2));
        }
        rec.insert("evaluations".into(), Integer(self.evaluations as u64));

        if self.model.is_linear() {
            rec.insert("extrema_x".into(), FloatArray(self.extrema.iter().map(|e| e.x).collect()));
            rec.insert("extrema_y".into(), FloatArray(self.extrema.iter().map(|e| e.y).collect()));
        }

        if let Some(band) = &self.band {
            rec.insert("band_level".into(), Float(band.level));
            rec.insert("band_x".into(), FloatArray(band.x.clone()));
            rec.insert("band_sigma".into(), FloatArray(band.sigma.clone()));
            rec.insert("band_upper".into(), FloatArray(band.upper.clone()));
            rec.insert("band_lower".into(), FloatArray(band.lower.clone()));
            rec.insert("band_degenerate".into(), Bool(band.degenerate));
            rec.insert("band_held_assumed_exact".into(), Bool(band.held_assumed_exact));
        }
        rec
    }
}
