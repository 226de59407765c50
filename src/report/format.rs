//! Formatted terminal output.
//!
//! Formatting lives here so the fitting code stays free of presentation concerns. Values
//! that are undefined for the model (NaN/∞, e.g. `N_max` when `κ = 0`) print as `n/a`.

use crate::fit::FitReport;
use crate::io::ingest::IngestedData;
use crate::models::Model;

/// Which coefficient dominates the scalability loss.
pub fn constraint_label(model: &Model) -> &'static str {
    if model.is_contention_constrained() {
        "contention-constrained (σ > κ)"
    } else if model.is_coherency_constrained() {
        "coherency-constrained (σ < κ)"
    } else {
        "balanced (σ = κ)"
    }
}

/// Coefficients, classification and peak of a model.
pub fn format_model(model: &Model) -> String {
    let mut out = String::new();

    out.push_str(&format!("σ (contention): {:.8}\n", model.sigma()));
    out.push_str(&format!("κ (coherency) : {:.8e}\n", model.kappa()));
    out.push_str(&format!("λ (per worker): {:.4}\n", model.lambda()));
    out.push_str(&format!("Constraint    : {}\n", constraint_label(model)));

    if model.is_limitless() {
        out.push_str("N_max         : n/a (limitless)\n");
        out.push_str("X_max         : n/a (limitless)\n");
    } else {
        out.push_str(&format!("N_max         : {}\n", fmt_value(model.max_concurrency(), 0)));
        out.push_str(&format!("X_max         : {}\n", fmt_value(model.max_throughput(), 3)));
    }

    out
}

/// Full summary of a fit run.
pub fn format_fit_summary(report: &FitReport, ingest: &IngestedData) -> String {
    let mut out = String::new();

    out.push_str("=== usl - Universal Scalability Law fit ===\n");
    out.push_str(&format!(
        "Input: {} | rows read={} used={} skipped={}\n",
        ingest.columns.display_name(),
        ingest.rows_read,
        ingest.measurements.len(),
        ingest.row_errors.len(),
    ));
    for e in ingest.row_errors.iter().take(10) {
        out.push_str(&format!("  (skipped line {}) {}\n", e.line, e.message));
    }
    if ingest.row_errors.len() > 10 {
        out.push_str(&format!("  ... and {} more\n", ingest.row_errors.len() - 10));
    }

    out.push('\n');
    out.push_str(&format_model(&report.model));
    out.push_str(&format!(
        "\nFit: n={} iterations={} SSE={:.3} RMSE={:.3}\n",
        report.n, report.iterations, report.sse, report.rmse
    ));

    out
}

/// Predicted throughput and latency at each concurrency level.
pub fn format_predictions(model: &Model, concurrency: &[f64]) -> String {
    let mut out = String::new();
    if concurrency.is_empty() {
        return out;
    }

    out.push_str(&format!("{:>10}  {:>14}  {:>14}\n", "N", "X(N)", "R(N)"));
    for &n in concurrency {
        out.push_str(&format!(
            "{:>10}  {:>14}  {:>14}\n",
            fmt_value(n, 2),
            fmt_value(model.throughput_at_concurrency(n), 3),
            fmt_value(model.latency_at_concurrency(n), 8),
        ));
    }

    out
}

fn fmt_value(v: f64, precision: usize) -> String {
    if v.is_finite() {
        format!("{v:.precision$}")
    } else {
        "n/a".to_string()
    }
}
