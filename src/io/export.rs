//! Exports: flat fit record as JSON, fitted curve and samples as CSV.
//!
//! The JSON document wraps the primitive-valued record from
//! [`FitResult::to_record`] with tool metadata, so it can be handed to any
//! store that only understands scalars and arrays.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::SampleSet;
use crate::error::AppError;
use crate::fit::{FitRecord, FitResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitDocument {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub record: FitRecord,
}

impl FitDocument {
    pub fn new(result: &FitResult) -> Self {
        Self {
            tool: "autofit".to_string(),
            generated_at: Utc::now(),
            record: result.to_record(),
        }
    }
}

pub fn write_fit_json(path: &Path, result: &FitResult) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create fit JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, &FitDocument::new(result))
        .map_err(|e| AppError::new(2, format!("Failed to write fit JSON: {e}")))
}

pub fn read_fit_json(path: &Path) -> Result<FitDocument, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open fit JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid fit JSON: {e}")))
}

/// Dense fit line, plus band columns when a band is attached.
pub fn write_curve_csv<W: Write>(out: &mut W, result: &FitResult) -> std::io::Result<()> {
    match &result.band {
        Some(band) => {
            writeln!(out, "x,fit,sigma,lower,upper")?;
            for i in 0..band.x.len() {
                writeln!(
                    out,
                    "{},{},{},{},{}",
                    band.x[i], band.fit[i], band.sigma[i], band.lower[i], band.upper[i]
                )?;
            }
        }
        None => {
            writeln!(out, "x,fit")?;
            for (x, y) in result.dense_x.iter().zip(&result.dense_fit) {
                writeln!(out, "{x},{y}")?;
            }
        }
    }
    Ok(())
}

pub fn export_curve_csv(path: &Path, result: &FitResult) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create curve CSV '{}': {e}", path.display())))?;
    write_curve_csv(&mut file, result)
        .map_err(|e| AppError::new(2, format!("Failed to write curve CSV: {e}")))
}

/// Samples in the ingest schema (`x,y[,yerr]`).
pub fn write_samples_csv<W: Write>(out: &mut W, samples: &SampleSet) -> std::io::Result<()> {
    match &samples.yerr {
        Some(err) => {
            writeln!(out, "x,y,yerr")?;
            for i in 0..samples.len() {
                writeln!(out, "{},{},{}", samples.x[i], samples.y[i], err[i])?;
            }
        }
        None => {
            writeln!(out, "x,y")?;
            for (x, y) in samples.x.iter().zip(&samples.y) {
                writeln!(out, "{x},{y}")?;
            }
        }
    }
    Ok(())
}

pub fn export_samples_csv(path: &Path, samples: &SampleSet) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create sample CSV '{}': {e}", path.display())))?;
    write_samples_csv(&mut file, samples)
        .map_err(|e| AppError::new(2, format!("Failed to write sample CSV: {e}")))
}
