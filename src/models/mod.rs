//! Model catalog.
//!
//! Each parametric family is a unit struct implementing [`ModelFamily`]; the
//! closed [`crate::domain::ModelKind`] enum dispatches to them. Polynomial and
//! spline fits only need the design matrices in [`polynomial`].

pub mod growth;
pub mod guess;
pub mod lineshape;
pub mod model;
pub mod oscillation;
pub mod polynomial;

pub use guess::Guess;
pub use model::*;
