//! Sample cleaning: drop non-finite entries and sort by x.

use crate::domain::SampleSet;
use crate::error::FitError;

/// Cleaned, ascending-x copies of the input.
///
/// An index is dropped if its value is NaN/Inf in any present sequence. The
/// sort is stable, so cleaning an already clean set returns it unchanged.
pub fn clean_samples(x: &[f64], y: &[f64], yerr: Option<&[f64]>) -> Result<SampleSet, FitError> {
    if x.len() != y.len() || yerr.is_some_and(|e| e.len() != x.len()) {
        return Err(FitError::LengthMismatch {
            x: x.len(),
            y: y.len(),
            yerr: yerr.map(<[f64]>::len),
        });
    }

    let mut keep: Vec<usize> = (0..x.len())
        .filter(|&i| {
            x[i].is_finite() && y[i].is_finite() && yerr.is_none_or(|e| e[i].is_finite())
        })
        .collect();
    if keep.is_empty() {
        return Err(FitError::EmptyDataset);
    }
    keep.sort_by(|&a, &b| x[a].total_cmp(&x[b]));

    Ok(SampleSet {
        x: keep.iter().map(|&i| x[i]).collect(),
        y: keep.iter().map(|&i| y[i]).collect(),
        yerr: yerr.map(|e| keep.iter().map(|&i| e[i]).collect()),
    })
}
