//! `usl` library crate: Universal Scalability Law modeling.
//!
//! Record [`Measurement`]s of a running system (any two of concurrency, throughput and
//! latency), fit a [`Model`] to them, then ask it about throughput, latency and
//! concurrency at points you have not measured.
//!
//! The binary (`usl`) is a thin wrapper around this library so that core logic is testable
//! without spawning processes.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod report;

pub use domain::Measurement;
pub use error::{UslError, UslResult};
pub use fit::{FitReport, MIN_MEASUREMENTS, ModelBuilder, fit_model};
pub use math::{LeastSquaresSolver, LevenbergMarquardt, SolverOptions};
pub use models::Model;
