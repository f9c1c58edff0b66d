//! Engine error taxonomy.
//!
//! Every engine failure is a value returned synchronously from the call that
//! caused it. Nothing is retried and nothing is swallowed.

use thiserror::Error;

/// Errors surfaced by a single backtest run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    /// A parameter value violates the strategy's declared schema or a
    /// cross-parameter rule. Caller-correctable.
    #[error("invalid parameter '{param}': {reason}")]
    InvalidParameters { param: String, reason: String },

    /// The price series is shorter than the lookback the parameters imply.
    #[error("insufficient data: need at least {required} bars, got {available}")]
    InsufficientData { required: usize, available: usize },

    /// A generator or engine contract violation (programming error).
    #[error("computation error: {0}")]
    Computation(String),
}

impl BacktestError {
    pub fn invalid_param(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            param: param.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable kind, used by reports and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidParameters { .. } => "invalid_parameters",
            Self::InsufficientData { .. } => "insufficient_data",
            Self::Computation(_) => "computation_error",
        }
    }
}
