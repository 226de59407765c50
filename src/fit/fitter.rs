//! Fitting a USL model to measurements.
//!
//! Given measurements `(N_i, X_i)` we minimize
//!
//! ```text
//! Σ (X_i − λN_i / (1 + σ(N_i − 1) + κN_i(N_i − 1)))²
//! ```
//!
//! over `(σ, κ, λ)` with a nonlinear least-squares solver, starting from
//! `σ₀ = 0.1`, `κ₀ = 0.01`, `λ₀ = max X_i/N_i`. The fit is deterministic for a given input
//! order and solver configuration.

use nalgebra::DVector;
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::Measurement;
use crate::error::{UslError, UslResult};
use crate::math::{LeastSquaresSolver, LevenbergMarquardt};
use crate::models::Model;

/// Three coefficients need at least this many observations for a stable fit.
pub const MIN_MEASUREMENTS: usize = 6;

const INITIAL_SIGMA: f64 = 0.1;
const INITIAL_KAPPA: f64 = 0.01;

/// A fitted model plus residual diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitReport {
    pub model: Model,
    pub n: usize,
    pub iterations: usize,
    /// Sum of squared throughput residuals.
    pub sse: f64,
    pub rmse: f64,
}

impl Model {
    /// Fit a model to `measurements` with the default Levenberg–Marquardt solver.
    pub fn build(measurements: &[Measurement]) -> UslResult<Model> {
        Self::build_with(measurements, &LevenbergMarquardt::default())
    }

    /// Fit a model to `measurements` with the given solver.
    pub fn build_with<S: LeastSquaresSolver>(measurements: &[Measurement], solver: &S) -> UslResult<Model> {
        fit_model(measurements, solver).map(|report| report.model)
    }
}

/// Fit a model and report how well it explains the data.
pub fn fit_model<S: LeastSquaresSolver>(measurements: &[Measurement], solver: &S) -> UslResult<FitReport> {
    if measurements.len() < MIN_MEASUREMENTS {
        return Err(UslError::InsufficientData {
            required: MIN_MEASUREMENTS,
            found: measurements.len(),
        });
    }

    let initial = initial_guess(measurements);
    debug!(
        n = measurements.len(),
        sigma = initial[0],
        kappa = initial[1],
        lambda = initial[2],
        "fitting USL model"
    );

    let residuals = |p: &DVector<f64>| {
        let model = Model::of(p[0], p[1], p[2]);
        DVector::from_iterator(
            measurements.len(),
            measurements
                .iter()
                .map(|m| m.throughput() - model.throughput_at_concurrency(m.concurrency())),
        )
    };

    let fit = solver.minimize(residuals, initial).map_err(|e| {
        warn!(iterations = e.iterations, cost = e.cost, "USL fit did not converge");
        UslError::FitDidNotConverge {
            iterations: e.iterations,
            cost: e.cost,
        }
    })?;

    let model = Model::of(fit.params[0], fit.params[1], fit.params[2]);
    let n = measurements.len();
    let sse = 2.0 * fit.cost;
    debug!(
        iterations = fit.iterations,
        reason = ?fit.reason,
        sse,
        %model,
        "USL fit converged"
    );

    Ok(FitReport {
        model,
        n,
        iterations: fit.iterations,
        sse,
        rmse: (sse / n as f64).sqrt(),
    })
}

/// `(σ₀, κ₀, λ₀)`; `λ₀` is the best observed per-worker throughput.
fn initial_guess(measurements: &[Measurement]) -> DVector<f64> {
    let lambda = measurements
        .iter()
        .map(|m| m.throughput() / m.concurrency())
        .fold(f64::NEG_INFINITY, f64::max);
    DVector::from_row_slice(&[INITIAL_SIGMA, INITIAL_KAPPA, lambda])
}

/// Accumulates measurements and finishes into a [`Model`].
///
/// ```
/// use usl::{Measurement, ModelBuilder};
///
/// let builder: ModelBuilder = (1..=8)
///     .map(|n| Measurement::of_concurrency_and_throughput(n as f64, 100.0 * n as f64 / (1.0 + 0.05 * (n as f64 - 1.0))))
///     .collect();
/// assert_eq!(builder.len(), 8);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    measurements: Vec<Measurement>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, measurement: Measurement) {
        self.measurements.push(measurement);
    }

    /// Append another partial accumulation, preserving order.
    pub fn merge(mut self, other: ModelBuilder) -> Self {
        self.measurements.extend(other.measurements);
        self
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub fn build(&self) -> UslResult<Model> {
        Model::build(&self.measurements)
    }

    pub fn build_with<S: LeastSquaresSolver>(&self, solver: &S) -> UslResult<Model> {
        Model::build_with(&self.measurements, solver)
    }
}

impl Extend<Measurement> for ModelBuilder {
    fn extend<I: IntoIterator<Item = Measurement>>(&mut self, iter: I) {
        self.measurements.extend(iter);
    }
}

impl FromIterator<Measurement> for ModelBuilder {
    fn from_iter<I: IntoIterator<Item = Measurement>>(iter: I) -> Self {
        Self {
            measurements: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SampleOptions, generate_measurements};
    use crate::math::SolverOptions;

    // Cisco benchmark from "Practical Scalability Analysis with the Universal Scalability Law".
    const CISCO: [[f64; 2]; 32] = [
        [1.0, 955.16],
        [2.0, 1878.91],
        [3.0, 2688.01],
        [4.0, 3548.68],
        [5.0, 4315.54],
        [6.0, 5130.43],
        [7.0, 5931.37],
        [8.0, 6531.08],
        [9.0, 7219.8],
        [10.0, 7867.61],
        [11.0, 8278.71],
        [12.0, 8646.7],
        [13.0, 9047.84],
        [14.0, 9426.55],
        [15.0, 9645.37],
        [16.0, 9897.24],
        [17.0, 10097.6],
        [18.0, 10240.5],
        [19.0, 10532.39],
        [20.0, 10798.52],
        [21.0, 11151.43],
        [22.0, 11518.63],
        [23.0, 11806.0],
        [24.0, 12089.37],
        [25.0, 12075.41],
        [26.0, 12177.29],
        [27.0, 12211.41],
        [28.0, 12158.93],
        [29.0, 12155.27],
        [30.0, 12118.04],
        [31.0, 12140.4],
        [32.0, 12074.39],
    ];

    // Coefficients published alongside the dataset.
    const BOOK_SIGMA: f64 = 0.02671591;
    const BOOK_KAPPA: f64 = 7.690945e-4;
    const BOOK_LAMBDA: f64 = 995.6486;
    const BOOK_N_MAX: f64 = 35.0;
    const BOOK_X_MAX: f64 = 12341.0;
    const BOOK_TOLERANCE: f64 = 0.0002;

    fn cisco() -> Vec<Measurement> {
        CISCO
            .iter()
            .map(|p| Measurement::from_concurrency_and_throughput(p).unwrap())
            .collect()
    }

    fn cisco_model() -> Model {
        Model::build(&cisco()).unwrap()
    }

    fn assert_within(actual: f64, expected: f64, relative: f64) {
        assert!(
            ((actual - expected) / expected).abs() <= relative,
            "expected {expected} ± {relative:e} (relative), got {actual}"
        );
    }

    #[test]
    fn cisco_fit_reproduces_published_coefficients() {
        let model = cisco_model();
        assert_within(model.sigma(), BOOK_SIGMA, BOOK_TOLERANCE);
        assert_within(model.kappa(), BOOK_KAPPA, BOOK_TOLERANCE);
        assert_within(model.lambda(), BOOK_LAMBDA, BOOK_TOLERANCE);
        assert_within(model.max_concurrency(), BOOK_N_MAX, BOOK_TOLERANCE);
        assert_within(model.max_throughput(), BOOK_X_MAX, BOOK_TOLERANCE);
        assert!(model.is_contention_constrained());
        assert!(!model.is_coherency_constrained());
        assert!(!model.is_limitless());
    }

    #[test]
    fn cisco_predictions() {
        let model = cisco_model();

        assert_within(model.latency_at_concurrency(1.0), 0.0010043984982923623, 1e-4);
        assert_within(model.latency_at_concurrency(20.0), 0.0018077217982978785, 1e-4);
        assert_within(model.latency_at_concurrency(35.0), 0.0028359135486017784, 1e-4);

        assert_within(model.throughput_at_concurrency(1.0), 995.648772003358, 1e-6);
        assert_within(model.throughput_at_concurrency(20.0), 11063.63312570436, 1e-6);
        assert_within(model.throughput_at_concurrency(35.0), 12341.745655201905, 1e-6);

        assert_within(model.concurrency_at_throughput(955.0), 0.9580998829620233, 1e-6);
        assert_within(model.concurrency_at_throughput(11048.0), 15.350435172752203, 1e-6);
        assert_within(model.concurrency_at_throughput(12201.0), 17.73220762025387, 1e-6);
    }

    #[test]
    fn single_worker_throughput_tracks_observation() {
        let report = fit_model(&cisco(), &LevenbergMarquardt::default()).unwrap();
        let observed = CISCO[0][1];
        assert!((report.model.throughput_at_concurrency(1.0) - observed).abs() <= report.rmse);
    }

    #[test]
    fn concurrency_at_latency_on_partial_dataset() {
        let model = Model::build(&cisco()[..10]).unwrap();
        assert_within(model.concurrency_at_latency(0.0012), 7.230628979597649, 1e-5);
        assert_within(model.concurrency_at_latency(0.0016), 20.25106409917121, 1e-5);
        assert_within(model.concurrency_at_latency(0.0020), 29.88889360938781, 1e-5);
    }

    #[test]
    fn throughput_inverse_is_consistent_below_peak() {
        let model = cisco_model();
        let n_max = model.max_concurrency();

        // N(X) is the contention-only inverse: tight near one worker, monotone up to the peak.
        for n in [1.25, 1.5, 2.0, 3.0] {
            let back = model.concurrency_at_throughput(model.throughput_at_concurrency(n));
            assert!((back - n).abs() / n < 0.02, "n={n} back={back}");
        }

        let mut previous = 0.0;
        let mut n = 1.5;
        while n < n_max {
            let back = model.concurrency_at_throughput(model.throughput_at_concurrency(n));
            assert!(back > previous && back <= n, "n={n} back={back}");
            previous = back;
            n += 2.5;
        }
    }

    #[test]
    fn contention_only_inverse_is_exact() {
        let model = Model::of(0.05, 0.0, 250.0);
        for n in [1.5, 3.0, 10.0, 40.0] {
            let x = model.throughput_at_concurrency(n);
            assert!((model.concurrency_at_throughput(x) - n).abs() < 1e-9 * n);
        }
    }

    #[test]
    fn fit_is_deterministic() {
        let a = Model::build(&cisco()).unwrap();
        let b = Model::build(&cisco()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn concurrent_fits_agree() {
        let data = cisco();
        let data = &data;
        let expected = cisco_model();
        let models: Vec<Model> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(move || Model::build(data).unwrap())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for model in models {
            assert_eq!(model, expected);
        }
    }

    #[test]
    fn too_few_measurements_are_rejected() {
        for n in 0..MIN_MEASUREMENTS {
            let err = Model::build(&cisco()[..n]).unwrap_err();
            assert_eq!(
                err,
                UslError::InsufficientData {
                    required: MIN_MEASUREMENTS,
                    found: n
                }
            );
        }
        assert!(Model::build(&cisco()[..MIN_MEASUREMENTS]).is_ok());
    }

    #[test]
    fn exhausted_budget_is_reported() {
        let solver = LevenbergMarquardt::new(SolverOptions {
            max_iterations: 2,
            ..SolverOptions::default()
        });
        let err = Model::build_with(&cisco(), &solver).unwrap_err();
        assert!(matches!(err, UslError::FitDidNotConverge { iterations: 2, .. }));
    }

    #[test]
    fn builder_matches_build() {
        let collected: ModelBuilder = cisco().into_iter().collect();
        assert_eq!(collected.len(), 32);
        assert_eq!(collected.build().unwrap(), cisco_model());

        let all = cisco();
        let (head, tail) = all.split_at(16);
        let mut left = ModelBuilder::new();
        left.extend(head.iter().copied());
        let right: ModelBuilder = tail.iter().copied().collect();
        assert_eq!(left.merge(right).build().unwrap(), cisco_model());

        assert!(ModelBuilder::new().is_empty());
        assert!(matches!(
            ModelBuilder::new().build(),
            Err(UslError::InsufficientData { found: 0, .. })
        ));
    }

    #[test]
    fn report_carries_residual_diagnostics() {
        let report = fit_model(&cisco(), &LevenbergMarquardt::default()).unwrap();
        assert_eq!(report.n, 32);
        assert!(report.iterations > 0);
        assert!(report.sse > 0.0);
        assert!((report.rmse - (report.sse / 32.0).sqrt()).abs() < 1e-12);

        let model = report.model;
        let sse: f64 = cisco()
            .iter()
            .map(|m| (m.throughput() - model.throughput_at_concurrency(m.concurrency())).powi(2))
            .sum();
        assert!((sse - report.sse).abs() <= 1e-9 * sse);
    }

    #[test]
    fn recovers_coefficients_from_exact_synthetic_data() {
        let truth = Model::of(0.02, 0.0007, 1000.0);
        let opts = SampleOptions {
            count: 40,
            noise: 0.0,
            seed: 7,
        };
        let data = generate_measurements(&truth, &opts).unwrap();
        let fitted = Model::build(&data).unwrap();
        assert_within(fitted.sigma(), truth.sigma(), 1e-6);
        assert_within(fitted.kappa(), truth.kappa(), 1e-6);
        assert_within(fitted.lambda(), truth.lambda(), 1e-6);
    }

    #[test]
    fn recovers_coefficients_from_noisy_synthetic_data() {
        let truth = Model::of(0.03, 0.0005, 500.0);
        let opts = SampleOptions {
            count: 64,
            noise: 0.01,
            seed: 42,
        };
        let data = generate_measurements(&truth, &opts).unwrap();
        let fitted = Model::build(&data).unwrap();
        assert_within(fitted.lambda(), truth.lambda(), 0.05);
        assert_within(fitted.max_concurrency(), truth.max_concurrency(), 0.15);
        assert!(fitted.is_contention_constrained());
    }
}
