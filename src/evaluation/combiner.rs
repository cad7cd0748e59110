//! Alert-level aggregation of condition outcomes with validity windows.

use crate::models::alert::{Alert, ConditionState, LogicOp};
use crate::models::evaluation::ConditionOutcome;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::trace;

/// Aggregated satisfaction for one alert at one evaluation time
#[derive(Debug, Clone)]
pub struct CombineResult {
    pub satisfied: bool,
    /// One human-readable reason per effectively satisfied condition
    pub reasons: Vec<String>,
}

pub struct LogicCombiner;

impl LogicCombiner {
    /// Combine condition outcomes under the alert's logic.
    ///
    /// A condition is effectively satisfied when it matched now, or
    /// when a prior match's validity window is still open. Fresh
    /// matches stamp `triggered_at` and, when the condition declares a
    /// validity duration, `valid_until = now + duration`. Callers that
    /// must not persist state (simulation) pass a throwaway copy of
    /// `states`.
    pub fn combine(
        alert: &Alert,
        outcomes: &[ConditionOutcome],
        states: &mut HashMap<String, ConditionState>,
        now: DateTime<Utc>,
    ) -> CombineResult {
        let mut reasons = Vec::new();
        let mut effective_count = 0usize;

        for (condition, outcome) in alert.conditions.iter().zip(outcomes) {
            let state = states.entry(condition.id.clone()).or_default();

            if outcome.satisfied {
                state.triggered_at = Some(now);
                state.valid_until = condition
                    .validity_seconds
                    .map(|secs| now + chrono::Duration::seconds(secs as i64));
                effective_count += 1;
                reasons.push(outcome.reason.clone());
                continue;
            }

            let window_open = state.valid_until.is_some_and(|valid_until| now <= valid_until);
            if window_open {
                effective_count += 1;
                reasons.push(format!(
                    "{}: satisfied earlier, validity window open until {}",
                    condition.id,
                    state
                        .valid_until
                        .map(|v| v.to_rfc3339())
                        .unwrap_or_default()
                ));
            }
        }

        let satisfied = match alert.logic {
            LogicOp::And => effective_count == alert.conditions.len() && !alert.conditions.is_empty(),
            LogicOp::Or => effective_count > 0,
        };

        trace!(
            alert_id = alert.alert_id,
            effective = effective_count,
            total = alert.conditions.len(),
            satisfied = satisfied,
            "combined {}/{} conditions",
            effective_count,
            alert.conditions.len()
        );

        CombineResult { satisfied, reasons }
    }
}
