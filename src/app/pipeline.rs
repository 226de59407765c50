//! The `usl fit` workflow: CSV ingest -> fit -> predictions.
//!
//! Kept apart from `app` so the workflow is testable without printing.

use serde::Serialize;

use crate::domain::{FitConfig, Measurement};
use crate::error::AppError;
use crate::fit::{FitReport, fit_model};
use crate::io::ingest::{IngestedData, load_measurements};
use crate::math::LevenbergMarquardt;

/// All computed outputs of a single `usl fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedData,
    pub report: FitReport,
    /// Model predictions at the requested concurrency levels.
    pub predictions: Vec<Measurement>,
}

/// JSON shape of a run.
#[derive(Debug, Serialize)]
pub struct RunJson<'a> {
    pub fit: &'a FitReport,
    pub predictions: &'a [Measurement],
}

impl RunOutput {
    pub fn to_json(&self) -> Result<String, AppError> {
        let json = RunJson {
            fit: &self.report,
            predictions: &self.predictions,
        };
        serde_json::to_string_pretty(&json)
            .map_err(|e| AppError::new(4, format!("Failed to serialize fit report: {e}")))
    }
}

/// Execute the full fit pipeline and return the computed outputs.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    let ingest = load_measurements(&config.csv_path)?;
    run_fit_on(config, ingest)
}

/// Fit already-ingested measurements.
pub fn run_fit_on(config: &FitConfig, ingest: IngestedData) -> Result<RunOutput, AppError> {
    let solver = LevenbergMarquardt::new(config.solver.clone());
    let report = fit_model(&ingest.measurements, &solver)?;
    let predictions = config
        .at
        .iter()
        .map(|&n| Measurement::of_concurrency_and_throughput(n, report.model.throughput_at_concurrency(n)))
        .collect();

    Ok(RunOutput {
        ingest,
        report,
        predictions,
    })
}
