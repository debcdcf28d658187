//! Reporting utilities: model comparison ranking and formatted terminal output.

pub mod format;

pub use format::*;

use std::cmp::Ordering;

use crate::domain::{FitQuality, ModelKind};

/// Outcome of one family in a `compare` run.
#[derive(Debug, Clone)]
pub struct ModelComparison {
    pub model: ModelKind,
    /// Quality on success, the error message on failure.
    pub outcome: Result<FitQuality, String>,
}

/// Successful fits by descending R², failures last in input order.
pub fn rank_by_r_squared(mut rows: Vec<ModelComparison>) -> Vec<ModelComparison> {
    rows.sort_by(|a, b| match (&a.outcome, &b.outcome) {
        (Ok(qa), Ok(qb)) => qb.r_squared.partial_cmp(&qa.r_squared).unwrap_or(Ordering::Equal),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => Ordering::Equal,
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quality(r_squared: f64) -> FitQuality {
        FitQuality {
            residual_std_error: 0.0,
            r_squared,
            reduced_chi_squared: None,
            n: 10,
            n_free: 2,
        }
    }

    #[test]
    fn ranks_by_r_squared_with_failures_last() {
        let rows = vec![
            ModelComparison { model: ModelKind::Sinusoid, outcome: Err("diverged".into()) },
            ModelComparison { model: ModelKind::Gaussian, outcome: Ok(quality(0.5)) },
            ModelComparison { model: ModelKind::Lorentzian, outcome: Ok(quality(0.9)) },
        ];
        let ranked = rank_by_r_squared(rows);
        let order: Vec<ModelKind> = ranked.iter().map(|r| r.model).collect();
        assert_eq!(
            order,
            vec![ModelKind::Lorentzian, ModelKind::Gaussian, ModelKind::Sinusoid]
        );
    }
}
