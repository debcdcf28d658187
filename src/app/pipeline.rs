//! Shared fit pipeline used by the `fit` and `compare` commands.
//!
//! CSV ingest -> cleaning -> fit (one model or many in parallel) -> optional band.
//! Presentation stays in `app`.

use std::path::Path;

use log::warn;
use rayon::prelude::*;

use crate::app::RunConfig;
use crate::data::clean_samples;
use crate::domain::{FitOptions, ModelKind, SampleSet};
use crate::error::AppError;
use crate::fit::{FitResult, Fitter, FitterConfig, fit_samples};
use crate::io::ingest::{IngestedData, load_samples};
use crate::report::{ModelComparison, rank_by_r_squared};

/// Outputs of a single `autofit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub rows_read: usize,
    pub result: FitResult,
}

/// Outputs of an `autofit compare` run, best first.
#[derive(Debug, Clone)]
pub struct CompareOutput {
    pub rows_read: usize,
    pub samples: SampleSet,
    pub rankings: Vec<ModelComparison>,
}

pub fn run_fit(config: &RunConfig) -> Result<RunOutput, AppError> {
    let data = ingest(&config.csv)?;

    let mut fitter = Fitter::new(
        &data.x,
        &data.y,
        config.model,
        data.yerr.as_deref(),
        config.fitter,
    )?;
    fitter.fit(&config.options)?;
    let mut result = fitter.into_result().ok_or_else(|| AppError::new(4, "Fit produced no result."))?;

    if let Some(level) = config.confidence {
        result = result.with_confidence_band(level)?;
    }

    Ok(RunOutput {
        rows_read: data.rows_read,
        result,
    })
}

/// Fit every requested model on the same cleaned samples in parallel.
pub fn run_compare(csv: &Path, models: &[ModelKind], config: &FitterConfig) -> Result<CompareOutput, AppError> {
    let data = ingest(csv)?;
    let samples = clean_samples(&data.x, &data.y, data.yerr.as_deref())?;
    let options = FitOptions::default();

    let rows: Vec<ModelComparison> = models
        .par_iter()
        .map(|&model| ModelComparison {
            model,
            outcome: fit_samples(&samples, model, config, &options)
                .map(|r| r.quality)
                .map_err(|e| e.to_string()),
        })
        .collect();

    Ok(CompareOutput {
        rows_read: data.rows_read,
        samples,
        rankings: rank_by_r_squared(rows),
    })
}

fn ingest(path: &Path) -> Result<IngestedData, AppError> {
    let data = load_samples(path)?;
    for e in &data.row_errors {
        warn!("{}: line {}: {}", path.display(), e.line, e.message);
    }
    if data.rows_usable() == 0 {
        return Err(AppError::new(3, "No usable rows after ingest."));
    }
    Ok(data)
}
