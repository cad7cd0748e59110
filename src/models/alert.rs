//! Alert and condition definitions

use crate::models::candle::Timeframe;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub type AlertId = u64;

/// Parameters passed to the external indicator computation, keyed
/// canonically so equal parameter sets fingerprint identically.
pub type IndicatorParams = BTreeMap<String, Value>;

/// User-defined alert: a set of conditions over one symbol/timeframe
/// plus the policy for combining them and re-firing.
///
/// Immutable except `status`; firing metadata lives in the evaluation
/// context, not on the definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: AlertId,
    pub user_id: u64,
    pub symbol: String,
    pub base_timeframe: Timeframe,
    pub conditions: Vec<Condition>,
    pub logic: LogicOp,
    pub fire_mode: FireMode,
    pub status: AlertStatus,
}

impl Alert {
    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireMode {
    /// At most once per distinct closed bar timestamp
    PerBar,
    /// Only on bar-close events, with per-bar dedup
    PerClose,
    /// Every qualifying tick, bounded only by the configured
    /// minimum re-fire interval
    PerTick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Paused,
}

/// A single condition within an alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    /// Unique within the alert
    pub id: String,
    pub source: ConditionSource,
    pub operator: Operator,
    pub compare_with: CompareWith,
    /// Overrides the alert's base timeframe; resolves against that
    /// timeframe's latest closed bar
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<Timeframe>,
    /// Grace period during which a satisfied condition stays
    /// effectively true for combination purposes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validity_seconds: Option<u64>,
}

/// Left-hand side of a condition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionSource {
    Indicator {
        name: String,
        #[serde(default)]
        params: IndicatorParams,
        /// Named output of the indicator, e.g. "rsi" or "signal"
        component: String,
    },
    Price,
    Volume,
}

impl ConditionSource {
    pub fn label(&self) -> String {
        match self {
            ConditionSource::Indicator {
                name, component, ..
            } => format!("{}.{}", name, component),
            ConditionSource::Price => "price".to_string(),
            ConditionSource::Volume => "volume".to_string(),
        }
    }
}

/// Right-hand side of a condition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompareWith {
    Value {
        value: f64,
    },
    Indicator {
        name: String,
        #[serde(default)]
        params: IndicatorParams,
        component: String,
    },
    Price,
}

impl CompareWith {
    pub fn label(&self) -> String {
        match self {
            CompareWith::Value { value } => format!("{:.4}", value),
            CompareWith::Indicator {
                name, component, ..
            } => format!("{}.{}", name, component),
            CompareWith::Price => "price".to_string(),
        }
    }
}

/// Comparison operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">=")]
    GreaterEqual,
    #[serde(rename = "<=")]
    LessEqual,
    Equals,
    CrossesAbove,
    CrossesBelow,
}

impl Operator {
    /// Edge-triggered operators depend on the previous bar's values
    pub fn is_edge(&self) -> bool {
        matches!(self, Operator::CrossesAbove | Operator::CrossesBelow)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
            Operator::GreaterEqual => ">=",
            Operator::LessEqual => "<=",
            Operator::Equals => "equals",
            Operator::CrossesAbove => "crosses_above",
            Operator::CrossesBelow => "crosses_below",
        };
        f.write_str(s)
    }
}

/// Per-condition satisfaction memory, owned by the evaluation context.
///
/// `valid_until`, when set, is always >= `triggered_at`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionState {
    pub triggered_at: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}
