//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - fit record JSON, curve and sample CSV exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
