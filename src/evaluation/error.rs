//! Error kinds for the evaluation core.

use crate::services::indicators::ComputeError;
use crate::services::market_data::MarketDataError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    /// Missing or insufficient data for a condition. Non-fatal: the
    /// condition is treated as unsatisfied and the reason recorded.
    #[error("resolution failed: {0}")]
    Resolution(String),

    /// Indicator math failure. Non-fatal, never cached.
    #[error("indicator computation failed: {0}")]
    Computation(#[from] ComputeError),

    /// A collaborator call exceeded its bound. The evaluation cycle is
    /// skipped with state unchanged and retried on the next event.
    #[error("{collaborator} call timed out after {timeout:?}")]
    Timeout {
        collaborator: &'static str,
        timeout: Duration,
    },

    /// Malformed alert or condition definition. Fatal for that alert
    /// only; it is excluded from evaluation until corrected.
    #[error("invalid alert definition: {0}")]
    Configuration(String),
}

impl From<MarketDataError> for EvalError {
    fn from(err: MarketDataError) -> Self {
        EvalError::Resolution(err.to_string())
    }
}
