//! Reporting: terminal formatting of fits and predictions.

pub mod format;

pub use format::*;
