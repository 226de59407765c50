//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - runs fits / predictions / sample generation
//! - prints reports

use std::io;

use clap::Parser;

use crate::cli::{Command, FitArgs, PredictArgs, SampleArgs};
use crate::data::{SampleOptions, generate_measurements};
use crate::domain::FitConfig;
use crate::error::AppError;
use crate::math::SolverOptions;
use crate::models::Model;

pub mod pipeline;

/// Entry point for the `usl` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine; it only supplies `USL_LOG`.
    let _ = dotenvy::dotenv();

    let cli = crate::cli::Cli::parse();
    crate::logging::init_logging(cli.verbose);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Predict(args) => handle_predict(args),
        Command::Sample(args) => handle_sample(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args)?;
    let run = pipeline::run_fit(&config)?;

    if config.json {
        println!("{}", run.to_json()?);
        return Ok(());
    }

    println!("{}", crate::report::format_fit_summary(&run.report, &run.ingest));
    let table = crate::report::format_predictions(&run.report.model, &config.at);
    if !table.is_empty() {
        println!("{table}");
    }

    Ok(())
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    let model = model_from_args(&args.model);

    println!("{model}");
    println!("{}", crate::report::format_model(&model));
    let table = crate::report::format_predictions(&model, &args.at);
    if !table.is_empty() {
        println!("{table}");
    }

    if let Some(r) = args.latency {
        if model.is_limitless() {
            println!("At R={r}: N(R) and X(R) are undefined for a limitless model (κ = 0).");
        } else {
            println!(
                "At R={r}: N(R)={:.4} X(R)={:.4}",
                model.concurrency_at_latency(r),
                model.throughput_at_latency(r)
            );
        }
    }
    if let Some(x) = args.throughput {
        println!(
            "At X={x}: N(X)={:.4} R(X)={:.8}",
            model.concurrency_at_throughput(x),
            model.latency_at_throughput(x)
        );
    }

    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let model = model_from_args(&args.model);
    let opts = SampleOptions {
        count: args.count,
        noise: args.noise,
        seed: args.seed,
    };
    let measurements = generate_measurements(&model, &opts)?;

    let mut writer = csv::Writer::from_writer(io::stdout().lock());
    writer
        .write_record(["concurrency", "throughput", "latency"])
        .map_err(|e| AppError::new(2, format!("Failed to write CSV header: {e}")))?;
    for m in &measurements {
        writer
            .write_record([
                m.concurrency().to_string(),
                m.throughput().to_string(),
                m.latency().to_string(),
            ])
            .map_err(|e| AppError::new(2, format!("Failed to write CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush CSV output: {e}")))?;

    Ok(())
}

fn model_from_args(args: &crate::cli::ModelArgs) -> Model {
    Model::of(args.sigma, args.kappa, args.lambda)
}

pub fn fit_config_from_args(args: &FitArgs) -> Result<FitConfig, AppError> {
    if args.max_iterations == 0 {
        return Err(AppError::new(2, "--max-iterations must be > 0."));
    }
    if !(args.tolerance.is_finite() && args.tolerance > 0.0) {
        return Err(AppError::new(2, "--tolerance must be a positive number."));
    }

    Ok(FitConfig {
        csv_path: args.csv.clone(),
        at: args.at.clone(),
        json: args.json,
        solver: SolverOptions {
            max_iterations: args.max_iterations,
            cost_tolerance: args.tolerance,
            step_tolerance: args.tolerance,
            gradient_tolerance: args.tolerance,
            ..SolverOptions::default()
        },
    })
}
