//! Market data provider interface: the candle feed collaborator.

use crate::models::candle::{Candle, Timeframe};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("no data for {symbol}/{timeframe}")]
    NoData { symbol: String, timeframe: Timeframe },

    #[error("market data unavailable: {0}")]
    Unavailable(String),
}

/// Candle source the evaluation core reads from. Bars are returned in
/// ascending timestamp order; the forming bar is volatile and may be
/// absent.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Most recent closed bars for a symbol/timeframe, oldest first
    async fn closed_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError>;

    /// The currently accumulating bar, if one exists
    async fn forming_bar(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Option<Candle>, MarketDataError>;

    /// The single most recent closed bar
    async fn latest_closed_bar(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Candle, MarketDataError> {
        self.closed_bars(symbol, timeframe, 1)
            .await?
            .pop()
            .ok_or_else(|| MarketDataError::NoData {
                symbol: symbol.to_string(),
                timeframe,
            })
    }
}

/// In-memory provider fed by the caller, used in tests and dry-run
/// tooling.
#[derive(Default)]
pub struct StaticMarketData {
    closed: RwLock<HashMap<(String, Timeframe), Vec<Candle>>>,
    forming: RwLock<HashMap<(String, Timeframe), Candle>>,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_closed(&self, symbol: &str, timeframe: Timeframe, candle: Candle) {
        let mut closed = self.closed.write().unwrap();
        closed
            .entry((symbol.to_string(), timeframe))
            .or_default()
            .push(candle);
    }

    pub fn set_forming(&self, symbol: &str, timeframe: Timeframe, candle: Candle) {
        let mut forming = self.forming.write().unwrap();
        forming.insert((symbol.to_string(), timeframe), candle);
    }

    pub fn clear_forming(&self, symbol: &str, timeframe: Timeframe) {
        let mut forming = self.forming.write().unwrap();
        forming.remove(&(symbol.to_string(), timeframe));
    }
}

#[async_trait]
impl MarketDataProvider for StaticMarketData {
    async fn closed_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let closed = self.closed.read().unwrap();
        let bars = closed
            .get(&(symbol.to_string(), timeframe))
            .cloned()
            .unwrap_or_default();
        let start = bars.len().saturating_sub(limit);
        Ok(bars[start..].to_vec())
    }

    async fn forming_bar(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Option<Candle>, MarketDataError> {
        let forming = self.forming.read().unwrap();
        Ok(forming.get(&(symbol.to_string(), timeframe)).cloned())
    }
}
