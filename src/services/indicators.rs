//! Indicator computation collaborator. The math itself is external;
//! the core only requests named outputs per bar.

use crate::models::alert::IndicatorParams;
use crate::models::candle::Timeframe;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

/// Named outputs of one indicator computation, e.g. `{"macd": ...,
/// "signal": ..., "histogram": ...}` or `{"rsi": ...}`.
pub type IndicatorOutputs = BTreeMap<String, f64>;

#[derive(Debug, Clone, Error)]
pub enum ComputeError {
    #[error("insufficient history for {indicator} on {symbol}/{timeframe}")]
    InsufficientHistory {
        symbol: String,
        timeframe: Timeframe,
        indicator: String,
    },

    #[error("invalid parameters for {indicator}: {message}")]
    InvalidParams { indicator: String, message: String },

    #[error("unknown indicator: {0}")]
    UnknownIndicator(String),

    #[error("indicator service unavailable: {0}")]
    Unavailable(String),
}

/// External indicator computation capability.
#[async_trait]
pub trait IndicatorProvider: Send + Sync {
    /// Compute an indicator's outputs using data up to and including
    /// the bar at `up_to`.
    async fn compute(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        name: &str,
        params: &IndicatorParams,
        up_to: DateTime<Utc>,
    ) -> Result<IndicatorOutputs, ComputeError>;
}
