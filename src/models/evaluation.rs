//! Evaluation outputs: per-condition outcomes, alert-level results,
//! and firing events handed to the notifier.

use crate::models::alert::AlertId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of evaluating a single condition at one bar/tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionOutcome {
    pub condition_id: String,
    pub satisfied: bool,
    /// Resolved left-hand value, when resolution succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed: Option<f64>,
    /// Resolved right-hand value, when resolution succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<f64>,
    /// Human-readable description of the comparison or of the
    /// resolution failure
    pub reason: String,
}

/// Observed values for one condition, kept for audit/snapshot purposes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub condition_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<f64>,
}

impl From<&ConditionOutcome> for SnapshotEntry {
    fn from(outcome: &ConditionOutcome) -> Self {
        Self {
            condition_id: outcome.condition_id.clone(),
            observed: outcome.observed,
            reference: outcome.reference,
        }
    }
}

/// Output of one evaluation cycle for one alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub alert_id: AlertId,
    pub would_fire: bool,
    pub reasons: Vec<String>,
    pub snapshot: Vec<SnapshotEntry>,
    pub evaluated_at: DateTime<Utc>,
}

/// Firing decision produced by the fire controller
#[derive(Debug, Clone)]
pub struct FireDecision {
    pub should_fire: bool,
    /// Time to record as last-fired when the caller commits
    pub fired_at: DateTime<Utc>,
    pub snapshot: Vec<SnapshotEntry>,
}

/// Event handed to the notification collaborator when an alert fires
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiringEvent {
    pub alert_id: AlertId,
    pub symbol: String,
    pub reasons: Vec<String>,
    pub snapshot: Vec<SnapshotEntry>,
    pub fired_at: DateTime<Utc>,
}
