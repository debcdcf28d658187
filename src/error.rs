//! Error types.
//!
//! - `FitError`: typed failures of the fitting engine. Callers branch on the
//!   variant (e.g. retry with different guesses on `FitDidNotConverge`).
//! - `AppError`: what the `autofit` binary reports, carrying a process exit code.

use thiserror::Error;

/// Non-recoverable conditions raised by the fitting engine.
///
/// Recoverable conditions (bad overrides, unusable uncertainties) never show up
/// here; they are logged and the fit proceeds with defaults.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// Input sequences have different lengths.
    #[error("length mismatch: x has {x} entries, y has {y}, yerr has {yerr:?}")]
    LengthMismatch { x: usize, y: usize, yerr: Option<usize> },

    /// Every sample was dropped during cleaning (or none were supplied).
    #[error("no finite samples remain after cleaning")]
    EmptyDataset,

    /// The nonlinear solver hit its evaluation cap or stalled on a non-finite step.
    #[error("fit did not converge after {evaluations} function evaluations: {reason}")]
    FitDidNotConverge { evaluations: usize, reason: String },

    /// Polynomial / spline design matrix is rank deficient.
    #[error("singular design matrix (rank {rank} < {columns} columns)")]
    SingularDesign { rank: usize, columns: usize },

    /// The model produced NaN/Inf at the initial guess.
    #[error("model evaluated to a non-finite residual at the initial guess")]
    NonFiniteResidual,

    /// `value()` or a confidence band was requested before any successful fit.
    #[error("no successful fit is available")]
    NoFitAvailable,

    /// Confidence level outside the open interval (0, 1).
    #[error("confidence level {0} is outside (0, 1)")]
    InvalidConfidenceLevel(f64),

    /// Fitter configuration that cannot describe a model (e.g. zero spline knots).
    #[error("invalid model configuration: {0}")]
    InvalidModelConfig(String),
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let exit_code = match err {
            FitError::LengthMismatch { .. }
            | FitError::InvalidConfidenceLevel(_)
            | FitError::InvalidModelConfig(_) => 2,
            FitError::EmptyDataset => 3,
            FitError::FitDidNotConverge { .. }
            | FitError::SingularDesign { .. }
            | FitError::NonFiniteResidual
            | FitError::NoFitAvailable => 4,
        };
        AppError::new(exit_code, format!("Fit failed: {err}"))
    }
}
