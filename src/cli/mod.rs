//! Command-line parsing for the `autofit` binary.
//!
//! Argument parsing and command dispatch stay separate from the fitting code.
//! Override flags are kept as raw strings here; `app` turns them into
//! `FitOptions` and drops malformed entries with a warning.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::domain::ModelKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "autofit", version, about = "Automatic least-squares curve fitting")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit one model to a CSV file and print a summary.
    Fit(FitArgs),
    /// Fit several models to the same data and rank them by R^2.
    Compare(CompareArgs),
    /// Write synthetic samples of a model to CSV.
    Generate(GenerateArgs),
}

/// Options shared by `fit` and `compare`.
#[derive(Debug, Parser, Clone)]
pub struct DataArgs {
    /// Input CSV with `x`, `y` and optional `yerr` columns.
    #[arg(long, value_name = "FILE")]
    pub csv: PathBuf,

    /// Polynomial degree.
    #[arg(long, default_value_t = 4)]
    pub degree: usize,

    /// Requested interior spline knots (capped at half the sample count).
    #[arg(long, default_value_t = 7)]
    pub knots: usize,

    /// Solver evaluation cap.
    #[arg(long, default_value_t = 2000)]
    pub max_evaluations: usize,
}

#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Model family to fit.
    #[arg(long, value_enum)]
    pub model: ModelKind,

    /// Hold a parameter fixed: `NAME=VALUE` (repeatable).
    #[arg(long, value_name = "NAME=VALUE")]
    pub hold: Vec<String>,

    /// Replace an initial guess: `NAME=VALUE` (repeatable).
    #[arg(long, value_name = "NAME=VALUE")]
    pub guess: Vec<String>,

    /// Replace parameter bounds: `NAME=LO:HI` (repeatable, `inf` allowed).
    #[arg(long, value_name = "NAME=LO:HI")]
    pub bounds: Vec<String>,

    /// Solver scale for a parameter: `NAME=VALUE` (repeatable).
    #[arg(long, value_name = "NAME=VALUE")]
    pub scale: Vec<String>,

    /// Attach a confidence band at this level, e.g. 0.95.
    #[arg(long)]
    pub confidence: Option<f64>,

    /// Render an ASCII plot in the terminal.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Write the flat fit record as JSON.
    #[arg(long = "export-json", value_name = "FILE")]
    pub export_json: Option<PathBuf>,

    /// Write the dense fit curve (and band) as CSV.
    #[arg(long = "export-curve", value_name = "FILE")]
    pub export_curve: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct CompareArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Models to compare (comma separated). Defaults to every family.
    #[arg(long, value_enum, value_delimiter = ',')]
    pub models: Vec<ModelKind>,
}

#[derive(Debug, Parser, Clone)]
pub struct GenerateArgs {
    /// Generating model (spline is not accepted).
    #[arg(long, value_enum)]
    pub model: ModelKind,

    /// Parameters in model order, or ascending polynomial coefficients.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub params: Vec<f64>,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub x_min: f64,

    #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
    pub x_max: f64,

    /// Number of samples.
    #[arg(short = 'n', long, default_value_t = 100)]
    pub count: usize,

    /// Standard deviation of Gaussian noise (also written as `yerr`).
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output CSV.
    #[arg(long, value_name = "FILE")]
    pub out: PathBuf,
}

/// Parse `NAME=VALUE`.
pub fn parse_assignment(raw: &str) -> Option<(String, f64)> {
    let (name, value) = raw.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().parse().ok()?))
}

/// Parse `NAME=LO:HI`.
pub fn parse_bounds(raw: &str) -> Option<(String, (f64, f64))> {
    let (name, range) = raw.split_once('=')?;
    let name = name.trim();
    let (lo, hi) = range.split_once(':')?;
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), (lo.trim().parse().ok()?, hi.trim().parse().ok()?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_override_flags() {
        assert_eq!(parse_assignment("A=0.7"), Some(("A".to_string(), 0.7)));
        assert_eq!(parse_assignment(" tau = -2e-3 "), Some(("tau".to_string(), -2e-3)));
        assert_eq!(parse_assignment("A0.7"), None);
        assert_eq!(parse_assignment("=1"), None);
        assert_eq!(parse_assignment("A=x"), None);

        assert_eq!(parse_bounds("A=0:1"), Some(("A".to_string(), (0.0, 1.0))));
        assert_eq!(
            parse_bounds("f=-inf:inf"),
            Some(("f".to_string(), (f64::NEG_INFINITY, f64::INFINITY)))
        );
        assert_eq!(parse_bounds("A=0"), None);
    }

    #[test]
    fn cli_parses_fit_command() {
        let cli = Cli::parse_from([
            "autofit", "fit", "--csv", "d.csv", "--model", "exp-decay-sinusoid", "--hold", "A=1",
            "--hold", "y0=0", "--confidence", "0.9", "-v",
        ]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Fit(args) => {
                assert_eq!(args.model, ModelKind::ExpDecaySinusoid);
                assert_eq!(args.hold, vec!["A=1", "y0=0"]);
                assert_eq!(args.confidence, Some(0.9));
                assert_eq!(args.data.degree, 4);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_parses_generate_params() {
        let cli = Cli::parse_from([
            "autofit", "generate", "--model", "exponential", "--params", "2,-3,1", "--out", "s.csv",
        ]);
        match cli.command {
            Command::Generate(args) => assert_eq!(args.params, vec![2.0, -3.0, 1.0]),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
