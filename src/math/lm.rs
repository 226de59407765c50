//! Levenberg–Marquardt nonlinear least squares.
//!
//! The fitter only needs one capability from this module:
//!
//! ```text
//! minimize ½ Σ r_i(θ)²
//! ```
//!
//! for a residual function `r: ℝⁿ → ℝᵐ` and an initial guess `θ₀`. That capability is the
//! [`LeastSquaresSolver`] trait; [`LevenbergMarquardt`] is the implementation used by default.
//!
//! Implementation choices:
//! - The Jacobian comes from `finitediff` central differences, so callers only supply
//!   residuals. It is re-evaluated only after an accepted step.
//! - Damping is scaled by `diag(JᵀJ)` (Marquardt), which keeps the step sensible when the
//!   parameters live on very different scales (USL fits mix `σ ≈ 0.03` with `λ ≈ 1000`).
//! - The damping update follows Nielsen's gain-ratio rule.

use finitediff::FiniteDiff;
use nalgebra::{DMatrix, DVector};
use tracing::trace;

/// Floor for the Marquardt scaling diagonal.
const MIN_SCALE: f64 = 1e-300;

/// Tunables for an iterative least-squares solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOptions {
    /// Iteration budget; running out is a failure.
    pub max_iterations: usize,
    /// Stop when an accepted step lowers the cost by less than this fraction.
    pub cost_tolerance: f64,
    /// Stop when `‖δ‖ ≤ tol·(‖θ‖ + tol)`.
    pub step_tolerance: f64,
    /// Stop when `‖Jᵀr‖∞` falls below this.
    pub gradient_tolerance: f64,
    /// Starting damping factor.
    pub initial_damping: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 5_000,
            cost_tolerance: 1e-12,
            step_tolerance: 1e-12,
            gradient_tolerance: 1e-12,
            initial_damping: 1e-3,
        }
    }
}

/// Which test ended a successful solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Gradient,
    Step,
    Cost,
}

/// A converged solve.
#[derive(Debug, Clone, PartialEq)]
pub struct Convergence {
    pub params: DVector<f64>,
    pub iterations: usize,
    /// `½ Σ r_i²` at `params`.
    pub cost: f64,
    pub reason: StopReason,
}

/// The solver gave up after exhausting its budget.
#[derive(Debug, Clone, PartialEq)]
pub struct NonConvergence {
    pub iterations: usize,
    /// Best cost reached before giving up.
    pub cost: f64,
}

/// A nonlinear least-squares minimizer.
pub trait LeastSquaresSolver {
    /// Minimize the sum of squared residuals starting from `initial`.
    ///
    /// `residuals` maps a parameter vector to the residual vector; its length is fixed by the
    /// caller and must not vary between calls.
    fn minimize<F>(&self, residuals: F, initial: DVector<f64>) -> Result<Convergence, NonConvergence>
    where
        F: Fn(&DVector<f64>) -> DVector<f64>;
}

/// Damped Gauss–Newton solver.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    pub options: SolverOptions,
}

impl LevenbergMarquardt {
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }
}

impl LeastSquaresSolver for LevenbergMarquardt {
    fn minimize<F>(&self, residuals: F, initial: DVector<f64>) -> Result<Convergence, NonConvergence>
    where
        F: Fn(&DVector<f64>) -> DVector<f64>,
    {
        let opts = &self.options;
        let n = initial.len();

        let mut x = initial;
        let mut r = residuals(&x);
        let mut cost = 0.5 * r.norm_squared();
        if !cost.is_finite() {
            return Err(NonConvergence { iterations: 0, cost });
        }

        let mut lin = Linearization::at(&residuals, &x, &r);
        let mut mu = opts.initial_damping;
        let mut nu = 2.0;

        for iteration in 1..=opts.max_iterations {
            if lin.gradient.amax() <= opts.gradient_tolerance {
                return Ok(Convergence {
                    params: x,
                    iterations: iteration,
                    cost,
                    reason: StopReason::Gradient,
                });
            }

            let mut damped = lin.normal.clone();
            for i in 0..n {
                damped[(i, i)] += mu * lin.scale[i];
            }

            let Some(step) = damped.lu().solve(&(-&lin.gradient)) else {
                mu *= nu;
                nu *= 2.0;
                continue;
            };

            if step.norm() <= opts.step_tolerance * (x.norm() + opts.step_tolerance) {
                return Ok(Convergence {
                    params: x,
                    iterations: iteration,
                    cost,
                    reason: StopReason::Step,
                });
            }

            let candidate = &x + &step;
            let r_new = residuals(&candidate);
            let cost_new = 0.5 * r_new.norm_squared();

            // Reduction predicted by the damped quadratic model.
            let predicted = 0.5 * step.dot(&(step.component_mul(&lin.scale) * mu - &lin.gradient));
            let gain = if predicted > 0.0 {
                (cost - cost_new) / predicted
            } else {
                -1.0
            };

            if cost_new.is_finite() && gain > 0.0 {
                let reduction = cost - cost_new;
                let relative = reduction <= opts.cost_tolerance * cost;

                x = candidate;
                r = r_new;
                cost = cost_new;
                mu *= (1.0_f64 / 3.0).max(1.0 - (2.0 * gain - 1.0).powi(3));
                nu = 2.0;
                trace!(iteration, cost, damping = mu, "accepted step");

                if relative {
                    return Ok(Convergence {
                        params: x,
                        iterations: iteration,
                        cost,
                        reason: StopReason::Cost,
                    });
                }
                lin = Linearization::at(&residuals, &x, &r);
            } else {
                mu *= nu;
                nu *= 2.0;
            }
        }

        Err(NonConvergence {
            iterations: opts.max_iterations,
            cost,
        })
    }
}

/// Gauss–Newton quantities at the current iterate.
struct Linearization {
    /// `JᵀJ`
    normal: DMatrix<f64>,
    /// `Jᵀr`
    gradient: DVector<f64>,
    /// Marquardt scaling, `diag(JᵀJ)` floored at [`MIN_SCALE`].
    scale: DVector<f64>,
}

impl Linearization {
    fn at<F>(residuals: &F, x: &DVector<f64>, r: &DVector<f64>) -> Self
    where
        F: Fn(&DVector<f64>) -> DVector<f64>,
    {
        let jac = jacobian(residuals, x, r.len());
        let normal = jac.tr_mul(&jac);
        let scale = normal.diagonal().map(|d| d.max(MIN_SCALE));
        Self {
            gradient: jac.tr_mul(r),
            normal,
            scale,
        }
    }
}

/// Central-difference Jacobian, `m × n`.
///
/// `finitediff` steps by a fixed `√ε`, so each parameter is differenced in units of
/// `max(|θ_j|, 1)` to keep the step relative for large coefficients like `λ`.
fn jacobian<F>(residuals: &F, x: &DVector<f64>, m: usize) -> DMatrix<f64>
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
{
    let units: Vec<f64> = x.iter().map(|v| v.abs().max(1.0)).collect();
    let scaled: Vec<f64> = x.iter().zip(&units).map(|(v, u)| v / u).collect();
    let unscaled_residuals = |p: &Vec<f64>| -> Vec<f64> {
        let theta = DVector::from_iterator(p.len(), p.iter().zip(&units).map(|(v, u)| v * u));
        residuals(&theta).iter().copied().collect()
    };

    // One row of partials per parameter.
    let partials = scaled.central_jacobian(&unscaled_residuals);
    DMatrix::from_fn(m, x.len(), |i, j| partials[j][i] / units[j])
}
