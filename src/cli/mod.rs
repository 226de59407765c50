//! Command-line parsing for the `usl` binary.
//!
//! Argument parsing and command dispatch stay separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "usl", version, about = "Universal Scalability Law model fitter")]
pub struct Cli {
    /// Log fitting progress at debug level (otherwise `USL_LOG` decides).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a model to measurements from a CSV file and print it.
    Fit(FitArgs),
    /// Evaluate an explicitly specified model.
    Predict(PredictArgs),
    /// Write synthetic measurements from a known model as CSV to stdout.
    Sample(SampleArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// CSV with two of the columns `concurrency`, `throughput`, `latency`.
    #[arg(value_name = "CSV")]
    pub csv: PathBuf,

    /// Predict throughput and latency at these concurrency levels (repeatable).
    #[arg(long = "at", value_name = "N")]
    pub at: Vec<f64>,

    /// Print the fit report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Solver iteration budget.
    #[arg(long, default_value_t = 5_000)]
    pub max_iterations: usize,

    /// Convergence tolerance, applied to the relative cost drop, the relative step size and
    /// the absolute gradient norm `‖Jᵀr‖∞`.
    #[arg(long, default_value_t = 1e-12)]
    pub tolerance: f64,
}

/// USL coefficients given on the command line.
#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    /// Contention coefficient (σ).
    #[arg(long, allow_negative_numbers = true)]
    pub sigma: f64,

    /// Coherency coefficient (κ).
    #[arg(long, allow_negative_numbers = true)]
    pub kappa: f64,

    /// Single-worker throughput (λ).
    #[arg(long, allow_negative_numbers = true)]
    pub lambda: f64,
}

#[derive(Debug, Parser, Clone)]
pub struct PredictArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Concurrency levels to evaluate (repeatable).
    #[arg(long = "at", value_name = "N")]
    pub at: Vec<f64>,

    /// Also solve for concurrency and throughput at this mean latency.
    #[arg(long, value_name = "R")]
    pub latency: Option<f64>,

    /// Also solve for concurrency and latency at this throughput.
    #[arg(long, value_name = "X")]
    pub throughput: Option<f64>,
}

#[derive(Debug, Parser, Clone)]
pub struct SampleArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Number of measurements (concurrency 1..=count).
    #[arg(short = 'n', long, default_value_t = 32)]
    pub count: usize,

    /// Log-scale standard deviation of multiplicative throughput noise.
    #[arg(long, default_value_t = 0.02)]
    pub noise: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}
