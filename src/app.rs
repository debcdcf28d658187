//! Top-level application orchestration.
//!
//! `src/main.rs` only installs logging and maps the exit code; this module
//! dispatches the parsed command, prints reports and writes exports.

use std::path::PathBuf;

use log::{info, warn};

use crate::cli::{Cli, Command, CompareArgs, FitArgs, GenerateArgs, parse_assignment, parse_bounds};
use crate::data::sample::{SyntheticConfig, generate_samples};
use crate::domain::{FitOptions, ModelKind};
use crate::error::AppError;
use crate::fit::{FitterConfig, SolverConfig};

pub mod pipeline;

/// Everything a `fit` run needs, resolved from CLI arguments.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub csv: PathBuf,
    pub model: ModelKind,
    pub fitter: FitterConfig,
    pub options: FitOptions,
    pub confidence: Option<f64>,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub export_json: Option<PathBuf>,
    pub export_curve: Option<PathBuf>,
}

/// Entry point for the `autofit` binary.
pub fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Command::Fit(args) => handle_fit(&args),
        Command::Compare(args) => handle_compare(&args),
        Command::Generate(args) => handle_generate(&args),
    }
}

fn handle_fit(args: &FitArgs) -> Result<(), AppError> {
    let config = run_config_from_args(args);
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        crate::report::format_fit_summary(&config.csv.display().to_string(), run.rows_read, &run.result)
    );

    if config.plot {
        println!(
            "{}",
            crate::plot::render_ascii_plot(&run.result, config.plot_width, config.plot_height)
        );
    }

    if let Some(path) = &config.export_json {
        crate::io::export::write_fit_json(path, &run.result)?;
        info!("wrote fit record to {}", path.display());
    }
    if let Some(path) = &config.export_curve {
        crate::io::export::export_curve_csv(path, &run.result)?;
        info!("wrote fit curve to {}", path.display());
    }
    Ok(())
}

fn handle_compare(args: &CompareArgs) -> Result<(), AppError> {
    let models = if args.models.is_empty() {
        ModelKind::ALL.to_vec()
    } else {
        args.models.clone()
    };
    let fitter = fitter_config(args.data.degree, args.data.knots, args.data.max_evaluations);
    let out = pipeline::run_compare(&args.data.csv, &models, &fitter)?;

    println!(
        "Data: {} | points used={} of {}\n",
        args.data.csv.display(),
        out.samples.len(),
        out.rows_read
    );
    println!("{}", crate::report::format_comparison(&out.rankings));
    Ok(())
}

fn handle_generate(args: &GenerateArgs) -> Result<(), AppError> {
    let config = SyntheticConfig {
        model: args.model,
        params: args.params.clone(),
        x_min: args.x_min,
        x_max: args.x_max,
        count: args.count,
        noise: args.noise,
        seed: args.seed,
    };
    let samples = generate_samples(&config)?;
    crate::io::export::export_samples_csv(&args.out, &samples)?;
    println!("Wrote {} samples to {}", samples.len(), args.out.display());
    Ok(())
}

fn fitter_config(degree: usize, knots: usize, max_evaluations: usize) -> FitterConfig {
    FitterConfig {
        polynomial_degree: degree,
        spline_knots: knots,
        solver: SolverConfig {
            max_evaluations,
            ..SolverConfig::default()
        },
    }
}

pub fn run_config_from_args(args: &FitArgs) -> RunConfig {
    RunConfig {
        csv: args.data.csv.clone(),
        model: args.model,
        fitter: fitter_config(args.data.degree, args.data.knots, args.data.max_evaluations),
        options: fit_options_from_args(args),
        confidence: args.confidence,
        plot: args.plot,
        plot_width: args.width,
        plot_height: args.height,
        export_json: args.export_json.clone(),
        export_curve: args.export_curve.clone(),
    }
}

/// Malformed override flags are dropped with a warning; name checks happen in the fitter.
pub fn fit_options_from_args(args: &FitArgs) -> FitOptions {
    let mut options = FitOptions::new();
    for raw in &args.hold {
        match parse_assignment(raw) {
            Some((name, value)) => options = options.hold(name, value),
            None => warn!("ignoring malformed --hold '{raw}' (expected NAME=VALUE)"),
        }
    }
    for raw in &args.guess {
        match parse_assignment(raw) {
            Some((name, value)) => options = options.guess(name, value),
            None => warn!("ignoring malformed --guess '{raw}' (expected NAME=VALUE)"),
        }
    }
    for raw in &args.bounds {
        match parse_bounds(raw) {
            Some((name, (lo, hi))) => options = options.bounds(name, lo, hi),
            None => warn!("ignoring malformed --bounds '{raw}' (expected NAME=LO:HI)"),
        }
    }
    for raw in &args.scale {
        match parse_assignment(raw) {
            Some((name, value)) => options = options.scale(name, value),
            None => warn!("ignoring malformed --scale '{raw}' (expected NAME=VALUE)"),
        }
    }
    options
}
