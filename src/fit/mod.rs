//! Model fitting.
//!
//! Responsibilities:
//!
//! - validate the measurement count
//! - run the nonlinear least-squares solve from a fixed starting point
//! - collect measurements incrementally (`ModelBuilder`)

pub mod fitter;

pub use fitter::*;
