//! Single-condition evaluation against current/previous bar state.

use crate::cache::IndicatorCache;
use crate::config::Config;
use crate::evaluation::error::EvalError;
use crate::models::alert::{Alert, CompareWith, Condition, ConditionSource, Operator};
use crate::models::candle::{Candle, Timeframe};
use crate::models::evaluation::ConditionOutcome;
use crate::evaluation::bounded;
use crate::services::market_data::MarketDataProvider;
use std::sync::Arc;
use tracing::trace;

/// Resolved operand values for one condition
struct Resolved {
    current_lhs: f64,
    current_rhs: f64,
    /// Previous-bar (lhs, rhs), resolved only for edge operators
    previous: Option<(f64, f64)>,
}

/// Evaluates one condition at a time. Stateless; all memory lives in
/// the indicator cache and the caller's condition states.
pub struct ConditionEvaluator {
    market_data: Arc<dyn MarketDataProvider>,
    cache: Arc<IndicatorCache>,
    config: Config,
}

impl ConditionEvaluator {
    pub fn new(
        market_data: Arc<dyn MarketDataProvider>,
        cache: Arc<IndicatorCache>,
        config: Config,
    ) -> Self {
        Self {
            market_data,
            cache,
            config,
        }
    }

    /// Evaluate a condition against the current bar, using the previous
    /// bar for edge-triggered operators.
    ///
    /// Resolution and computation failures never escape this boundary:
    /// they produce an unsatisfied outcome with a diagnostic reason.
    /// Only collaborator timeouts propagate, aborting the cycle.
    pub async fn evaluate(
        &self,
        alert: &Alert,
        condition: &Condition,
        current: &Candle,
        previous: Option<&Candle>,
        current_closed: bool,
    ) -> Result<ConditionOutcome, EvalError> {
        match self
            .resolve_values(alert, condition, current, previous, current_closed)
            .await
        {
            Ok(Some(resolved)) => Ok(self.compare(condition, &resolved)),
            // Edge operator with no previous bar: never satisfied
            Ok(None) => Ok(ConditionOutcome {
                condition_id: condition.id.clone(),
                satisfied: false,
                observed: None,
                reference: None,
                reason: format!("{}: no previous bar for edge condition", condition.id),
            }),
            Err(err @ EvalError::Timeout { .. }) => Err(err),
            Err(err) => {
                trace!(
                    alert_id = alert.alert_id,
                    condition_id = %condition.id,
                    error = %err,
                    "condition resolution failed"
                );
                Ok(ConditionOutcome {
                    condition_id: condition.id.clone(),
                    satisfied: false,
                    observed: None,
                    reference: None,
                    reason: format!("{}: {}", condition.id, err),
                })
            }
        }
    }

    /// Resolve both operands. Returns `Ok(None)` when an edge operator
    /// has no previous bar to compare against.
    async fn resolve_values(
        &self,
        alert: &Alert,
        condition: &Condition,
        current: &Candle,
        previous: Option<&Candle>,
        current_closed: bool,
    ) -> Result<Option<Resolved>, EvalError> {
        let timeframe = condition.timeframe.unwrap_or(alert.base_timeframe);

        // A timeframe override resolves against that timeframe's own
        // latest closed bars, fetched independently of the event's.
        let override_bars = if timeframe != alert.base_timeframe {
            let bars = bounded(self.config.collaborator_timeout, "market data", async {
                Ok(self
                    .market_data
                    .closed_bars(&alert.symbol, timeframe, 2)
                    .await?)
            })
            .await?;
            if bars.is_empty() {
                return Err(EvalError::Resolution(format!(
                    "no closed bars for {}/{}",
                    alert.symbol, timeframe
                )));
            }
            Some(bars)
        } else {
            None
        };

        let (current, previous, closed) = match override_bars.as_ref() {
            Some(bars) => {
                let last = bars.len() - 1;
                let prev = last.checked_sub(1).and_then(|i| bars.get(i));
                (&bars[last], prev, true)
            }
            None => (current, previous, current_closed),
        };

        let current_lhs = self
            .resolve_source(&condition.source, alert, timeframe, current, closed)
            .await?;
        let current_rhs = self
            .resolve_reference(&condition.compare_with, alert, timeframe, current, closed)
            .await?;

        if !condition.operator.is_edge() {
            return Ok(Some(Resolved {
                current_lhs,
                current_rhs,
                previous: None,
            }));
        }

        let previous_bar = match previous {
            Some(bar) => bar,
            None => return Ok(None),
        };
        let previous_lhs = self
            .resolve_source(&condition.source, alert, timeframe, previous_bar, true)
            .await?;
        let previous_rhs = self
            .resolve_reference(&condition.compare_with, alert, timeframe, previous_bar, true)
            .await?;

        Ok(Some(Resolved {
            current_lhs,
            current_rhs,
            previous: Some((previous_lhs, previous_rhs)),
        }))
    }

    async fn resolve_source(
        &self,
        source: &ConditionSource,
        alert: &Alert,
        timeframe: Timeframe,
        bar: &Candle,
        closed: bool,
    ) -> Result<f64, EvalError> {
        match source {
            ConditionSource::Price => Ok(bar.close),
            ConditionSource::Volume => Ok(bar.volume),
            ConditionSource::Indicator {
                name,
                params,
                component,
            } => {
                self.indicator_component(alert, timeframe, bar, closed, name, params, component)
                    .await
            }
        }
    }

    async fn resolve_reference(
        &self,
        compare_with: &CompareWith,
        alert: &Alert,
        timeframe: Timeframe,
        bar: &Candle,
        closed: bool,
    ) -> Result<f64, EvalError> {
        match compare_with {
            CompareWith::Value { value } => Ok(*value),
            CompareWith::Price => Ok(bar.close),
            CompareWith::Indicator {
                name,
                params,
                component,
            } => {
                self.indicator_component(alert, timeframe, bar, closed, name, params, component)
                    .await
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn indicator_component(
        &self,
        alert: &Alert,
        timeframe: Timeframe,
        bar: &Candle,
        closed: bool,
        name: &str,
        params: &crate::models::alert::IndicatorParams,
        component: &str,
    ) -> Result<f64, EvalError> {
        let outputs = bounded(
            self.config.collaborator_timeout,
            "indicator computation",
            async {
                Ok(self
                    .cache
                    .get_or_compute(&alert.symbol, timeframe, bar.timestamp, closed, name, params)
                    .await?)
            },
        )
        .await?;
        outputs.get(component).copied().ok_or_else(|| {
            EvalError::Resolution(format!(
                "indicator {} has no component '{}'",
                name, component
            ))
        })
    }

    fn compare(&self, condition: &Condition, resolved: &Resolved) -> ConditionOutcome {
        let lhs = resolved.current_lhs;
        let rhs = resolved.current_rhs;

        let satisfied = match condition.operator {
            Operator::GreaterThan => lhs > rhs,
            Operator::LessThan => lhs < rhs,
            Operator::GreaterEqual => lhs >= rhs,
            Operator::LessEqual => lhs <= rhs,
            Operator::Equals => (lhs - rhs).abs() <= self.config.equality_tolerance,
            Operator::CrossesAbove => match resolved.previous {
                Some((prev_lhs, prev_rhs)) => prev_lhs <= prev_rhs && lhs > rhs,
                None => false,
            },
            Operator::CrossesBelow => match resolved.previous {
                Some((prev_lhs, prev_rhs)) => prev_lhs >= prev_rhs && lhs < rhs,
                None => false,
            },
        };

        let reason = match resolved.previous {
            Some((prev_lhs, prev_rhs)) => format!(
                "{}: {} {} {} ({:.4} -> {:.4} vs {:.4} -> {:.4})",
                condition.id,
                condition.source.label(),
                condition.operator,
                condition.compare_with.label(),
                prev_lhs,
                lhs,
                prev_rhs,
                rhs
            ),
            None => format!(
                "{}: {} {} {} ({:.4} vs {:.4})",
                condition.id,
                condition.source.label(),
                condition.operator,
                condition.compare_with.label(),
                lhs,
                rhs
            ),
        };

        ConditionOutcome {
            condition_id: condition.id.clone(),
            satisfied,
            observed: Some(lhs),
            reference: Some(rhs),
            reason,
        }
    }
}
