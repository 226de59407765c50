//! A single observation of a running system.
//!
//! Any two of concurrency `N`, throughput `X` and latency `R` determine the third through
//! Little's Law (`N = X·R`), so a `Measurement` is always built from a pair and derives the
//! remaining value. No range checks are made; the values are trusted to come from a real
//! measurement process.
//!
//! Serialized measurements carry all three values. Deserialization reads them back through
//! the same pair constructors, taking the first available pair in the order (concurrency,
//! throughput), (concurrency, latency), (throughput, latency); a supplied third value is
//! recomputed rather than trusted.

use serde::{Deserialize, Serialize};

use crate::error::{UslError, UslResult};

/// A measurement of concurrency, throughput and mean latency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MeasurementRecord")]
pub struct Measurement {
    concurrency: f64,
    throughput: f64,
    latency: f64,
}

impl Measurement {
    /// Throughput observed with a given number of concurrent workers.
    pub fn of_concurrency_and_throughput(concurrency: f64, throughput: f64) -> Self {
        Self {
            concurrency,
            throughput,
            latency: concurrency / throughput,
        }
    }

    /// Mean latency observed with a given number of concurrent workers.
    pub fn of_concurrency_and_latency(concurrency: f64, latency: f64) -> Self {
        Self {
            concurrency,
            throughput: concurrency / latency,
            latency,
        }
    }

    /// Mean latency observed at a given throughput.
    pub fn of_throughput_and_latency(throughput: f64, latency: f64) -> Self {
        Self {
            concurrency: throughput * latency,
            throughput,
            latency,
        }
    }

    /// Same as [`Measurement::of_concurrency_and_throughput`] with the arguments swapped.
    pub fn of_throughput_and_concurrency(throughput: f64, concurrency: f64) -> Self {
        Self::of_concurrency_and_throughput(concurrency, throughput)
    }

    /// `[concurrency, throughput]`
    pub fn from_concurrency_and_throughput(point: &[f64]) -> UslResult<Self> {
        let [n, x] = pair(point)?;
        Ok(Self::of_concurrency_and_throughput(n, x))
    }

    /// `[concurrency, latency]`
    pub fn from_concurrency_and_latency(point: &[f64]) -> UslResult<Self> {
        let [n, r] = pair(point)?;
        Ok(Self::of_concurrency_and_latency(n, r))
    }

    /// `[throughput, latency]`
    pub fn from_throughput_and_latency(point: &[f64]) -> UslResult<Self> {
        let [x, r] = pair(point)?;
        Ok(Self::of_throughput_and_latency(x, r))
    }

    /// `[throughput, concurrency]`
    pub fn from_throughput_and_concurrency(point: &[f64]) -> UslResult<Self> {
        let [x, n] = pair(point)?;
        Ok(Self::of_throughput_and_concurrency(x, n))
    }

    /// Number of concurrent workers (`N`).
    pub fn concurrency(&self) -> f64 {
        self.concurrency
    }

    /// Throughput in events per unit time (`X`).
    pub fn throughput(&self) -> f64 {
        self.throughput
    }

    /// Mean latency in time per event (`R`).
    pub fn latency(&self) -> f64 {
        self.latency
    }
}

/// Wire form of a [`Measurement`]: any two of the three values.
#[derive(Deserialize)]
struct MeasurementRecord {
    concurrency: Option<f64>,
    throughput: Option<f64>,
    latency: Option<f64>,
}

impl TryFrom<MeasurementRecord> for Measurement {
    type Error = UslError;

    fn try_from(record: MeasurementRecord) -> UslResult<Self> {
        match (record.concurrency, record.throughput, record.latency) {
            (Some(n), Some(x), _) => Ok(Self::of_concurrency_and_throughput(n, x)),
            (Some(n), None, Some(r)) => Ok(Self::of_concurrency_and_latency(n, r)),
            (None, Some(x), Some(r)) => Ok(Self::of_throughput_and_latency(x, r)),
            (n, x, r) => Err(UslError::InvalidArgument {
                expected: 2,
                found: [n, x, r].iter().flatten().count(),
            }),
        }
    }
}

fn pair(point: &[f64]) -> UslResult<[f64; 2]> {
    match point {
        [a, b] => Ok([*a, *b]),
        _ => Err(UslError::InvalidArgument {
            expected: 2,
            found: point.len(),
        }),
    }
}
