//! Error types.
//!
//! - `UslError` is the library taxonomy: every fallible constructor and the fit return it.
//! - `AppError` is what the `usl` binary reports; it carries a process exit code.

use thiserror::Error;

/// Errors raised by measurement construction and model fitting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UslError {
    /// A pair argument did not have exactly two elements.
    #[error("invalid argument: expected a pair of {expected} values, found {found}")]
    InvalidArgument { expected: usize, found: usize },

    /// Too few measurements to fit three coefficients.
    #[error("insufficient data: needs at least {required} measurements, found {found}")]
    InsufficientData { required: usize, found: usize },

    /// The solver exhausted its iteration budget.
    #[error("unable to build a model for these values: no convergence after {iterations} iterations (cost {cost:e})")]
    FitDidNotConverge { iterations: usize, cost: f64 },
}

pub type UslResult<T> = Result<T, UslError>;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<UslError> for AppError {
    fn from(err: UslError) -> Self {
        let exit_code = match err {
            UslError::InvalidArgument { .. } => 2,
            UslError::InsufficientData { .. } => 3,
            UslError::FitDidNotConverge { .. } => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usl_errors_map_to_exit_codes() {
        let e: AppError = UslError::InsufficientData { required: 6, found: 2 }.into();
        assert_eq!(e.exit_code(), 3);
        assert!(e.to_string().contains("at least 6"));

        let e: AppError = UslError::FitDidNotConverge { iterations: 10, cost: 1.0 }.into();
        assert_eq!(e.exit_code(), 4);

        let e: AppError = UslError::InvalidArgument { expected: 2, found: 3 }.into();
        assert_eq!(e.exit_code(), 2);
    }
}
