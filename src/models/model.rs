//! The Universal Scalability Law model.
//!
//! ```text
//! X(N) = λN / (1 + σ(N − 1) + κN(N − 1))
//! ```
//!
//! Every query below is a closed-form rearrangement of that equation (plus Little's Law).
//! Nothing is special-cased: with `κ = 0` or non-physical coefficients the √- and
//! κ-denominator formulas return NaN or ±∞. Check [`Model::is_limitless`] first when that
//! matters.

use serde::{Deserialize, Serialize};

/// A parametrized USL model: contention `σ`, crosstalk `κ` and single-worker throughput `λ`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Model {
    sigma: f64,
    kappa: f64,
    lambda: f64,
}

impl Model {
    /// A model with explicitly chosen coefficients. No validation is performed.
    pub fn of(sigma: f64, kappa: f64, lambda: f64) -> Self {
        Self {
            sigma,
            kappa,
            lambda,
        }
    }

    /// Coefficient of contention (`σ`).
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Coefficient of crosstalk/coherency (`κ`).
    pub fn kappa(&self) -> f64 {
        self.kappa
    }

    /// Throughput of a single worker (`λ`).
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// `X(N)`
    pub fn throughput_at_concurrency(&self, n: f64) -> f64 {
        (self.lambda * n) / self.penalty(n)
    }

    /// `R(N)`
    pub fn latency_at_concurrency(&self, n: f64) -> f64 {
        self.penalty(n) / self.lambda
    }

    /// `N_max`, the worker count at which throughput peaks.
    pub fn max_concurrency(&self) -> f64 {
        ((1.0 - self.sigma) / self.kappa).sqrt().floor()
    }

    /// `X_max = X(N_max)`
    pub fn max_throughput(&self) -> f64 {
        self.throughput_at_concurrency(self.max_concurrency())
    }

    /// `R(X)`
    pub fn latency_at_throughput(&self, x: f64) -> f64 {
        (self.sigma - 1.0) / (self.sigma * x - self.lambda)
    }

    /// `X(R)`, the positive root of the quadratic in `X`.
    pub fn throughput_at_latency(&self, r: f64) -> f64 {
        (self.discriminant_root(r) - self.kappa + self.sigma) / (2.0 * self.kappa * r)
    }

    /// `N(R)`, the positive root of the quadratic in `N`.
    pub fn concurrency_at_latency(&self, r: f64) -> f64 {
        (self.kappa - self.sigma + self.discriminant_root(r)) / (2.0 * self.kappa)
    }

    /// `N(X) = R(X)·X`
    pub fn concurrency_at_throughput(&self, x: f64) -> f64 {
        self.latency_at_throughput(x) * x
    }

    /// `σ < κ`
    pub fn is_coherency_constrained(&self) -> bool {
        self.sigma < self.kappa
    }

    /// `σ > κ`
    pub fn is_contention_constrained(&self) -> bool {
        self.sigma > self.kappa
    }

    /// `κ = 0`: throughput never peaks.
    pub fn is_limitless(&self) -> bool {
        self.kappa == 0.0
    }

    fn penalty(&self, n: f64) -> f64 {
        1.0 + self.sigma * (n - 1.0) + self.kappa * n * (n - 1.0)
    }

    fn discriminant_root(&self, r: f64) -> f64 {
        let a = 2.0 * self.kappa * (2.0 * self.lambda * r + self.sigma - 2.0);
        (self.sigma.powi(2) + self.kappa.powi(2) + a).sqrt()
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Model[sigma={}, kappa={}, lambda={}]",
            self.sigma, self.kappa, self.lambda
        )
    }
}
