//! Market data primitives: candles, timeframes, and evaluation events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported candle aggregation windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    /// Window length in seconds
    pub fn seconds(&self) -> i64 {
        match self {
            Timeframe::M1 => 60,
            Timeframe::M5 => 300,
            Timeframe::M15 => 900,
            Timeframe::H1 => 3_600,
            Timeframe::H4 => 14_400,
            Timeframe::D1 => 86_400,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One OHLCV aggregation over a timeframe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Open time of the bar's window
    pub timestamp: DateTime<Utc>,
}

impl Candle {
    pub fn new(
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            open,
            high,
            low,
            close,
            volume,
            timestamp,
        }
    }
}

/// What kind of market update triggered an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Intra-bar update to the forming bar
    Tick,
    /// The bar's window elapsed and the bar is now immutable
    BarClose,
}

/// A single market update driving one evaluation cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketEvent {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub kind: EventKind,
    /// Open time of the bar this event belongs to
    pub bar_time: DateTime<Utc>,
    /// Arrival time of the event (tick time, or close time for bar closes)
    pub at: DateTime<Utc>,
}

impl MarketEvent {
    pub fn bar_close(symbol: impl Into<String>, timeframe: Timeframe, bar_time: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            kind: EventKind::BarClose,
            bar_time,
            at: bar_time + chrono::Duration::seconds(timeframe.seconds()),
        }
    }

    pub fn tick(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        bar_time: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            kind: EventKind::Tick,
            bar_time,
            at,
        }
    }
}
