//! `autofit` library crate.
//!
//! Automatic least-squares fitting of one-dimensional data against a fixed
//! catalog of model families. The binary (`autofit`) is a thin wrapper around
//! this library so that:
//!
//! - the fitting engine is testable without spawning processes
//! - callers can embed [`fit::Fitter`] directly and skip the CLI

pub mod analysis;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
