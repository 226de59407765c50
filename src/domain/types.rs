//! Run configuration shared by the CLI and the fit pipeline.

use std::path::PathBuf;

use crate::math::SolverOptions;

/// A `usl fit` run as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub csv_path: PathBuf,
    /// Concurrency levels to predict at after fitting.
    pub at: Vec<f64>,
    /// Print the fit report as JSON instead of text.
    pub json: bool,
    pub solver: SolverOptions,
}
