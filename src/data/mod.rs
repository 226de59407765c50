//! Synthetic data for exercising the fitter.

pub mod sample;

pub use sample::*;
