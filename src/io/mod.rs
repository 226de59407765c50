//! Input helpers: CSV ingest + validation (`ingest`).

pub mod ingest;

pub use ingest::*;
