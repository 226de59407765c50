//! Synthetic measurement generation from a known model.
//!
//! Concurrency runs over `1..=count`; each throughput is the model's prediction scaled by
//! log-normal noise `exp(noise·z − noise²/2)` with `z ~ N(0, 1)`, so the noisy value stays
//! unbiased. A given seed always produces the same measurements.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::Measurement;
use crate::error::AppError;
use crate::models::Model;

#[derive(Debug, Clone)]
pub struct SampleOptions {
    /// Number of measurements (and highest concurrency level).
    pub count: usize,
    /// Log-scale standard deviation of the multiplicative noise; `0` is exact.
    pub noise: f64,
    pub seed: u64,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            count: 32,
            noise: 0.02,
            seed: 42,
        }
    }
}

pub fn generate_measurements(model: &Model, opts: &SampleOptions) -> Result<Vec<Measurement>, AppError> {
    if opts.count == 0 {
        return Err(AppError::new(2, "Sample count must be > 0."));
    }
    if !(opts.noise.is_finite() && opts.noise >= 0.0) {
        return Err(AppError::new(2, "Noise must be a finite, non-negative number."));
    }

    let mut rng = StdRng::seed_from_u64(opts.seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;
    let mean_correction = 0.5 * opts.noise * opts.noise;

    let mut out = Vec::with_capacity(opts.count);
    for i in 1..=opts.count {
        let n = i as f64;
        let expected = model.throughput_at_concurrency(n);
        if !(expected.is_finite() && expected > 0.0) {
            return Err(AppError::new(
                4,
                format!("Model predicts a non-positive throughput ({expected}) at concurrency {n}."),
            ));
        }

        let z: f64 = normal.sample(&mut rng);
        let x = expected * (opts.noise * z - mean_correction).exp();
        out.push(Measurement::of_concurrency_and_throughput(n, x));
    }

    Ok(out)
}
