//! The USL model and its closed-form predictions.

pub mod model;

pub use model::*;
