//! Model error types

use thiserror::Error;

pub type ModelResult<T> = std::result::Result<T, ModelError>;

/// Errors raised while fitting or forecasting a model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Model must be fitted before prediction")]
    NotFitted,

    #[error("Numerical error: {0}")]
    NumericalError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Exogenous columns do not line up with the series or the horizon
    #[error("Exogenous regressors mismatch: expected {expected}, got {actual}")]
    ExogMismatch { expected: usize, actual: usize },
}

impl ModelError {
    /// Errors that mean "not enough history", as opposed to a broken model
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, ModelError::InsufficientData { .. })
    }
}
