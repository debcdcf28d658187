//! Fitting engine.
//!
//! Responsibilities:
//!
//! - resolve hold masks and manual overrides (`params`)
//! - run the bounded, scaled least-squares solver (`solver`)
//! - solve polynomial / spline fits directly (`linear`)
//! - assemble results with quality metrics and extrema (`fitter`, `result`)

pub mod fitter;
pub mod linear;
pub mod params;
pub mod result;
pub mod solver;

pub use fitter::*;
pub use params::{ParamLayout, apply_overrides};
pub use result::*;
pub use solver::{LeastSquaresProblem, SolverConfig, SolverOutcome, Termination, solve_bounded};
