//! Domain types used throughout the pipeline.
//!
//! - `Measurement`: one Little's Law-consistent observation
//! - run configuration for the binary (`FitConfig`)

pub mod measurement;
pub mod types;

pub use measurement::*;
pub use types::*;
