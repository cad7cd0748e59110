//! Per-alert evaluation loop: resolve conditions, combine, decide
//! firing. Also hosts the side-effect-free simulation path.

use crate::config::Config;
use crate::evaluation::bounded;
use crate::evaluation::condition::ConditionEvaluator;
use crate::evaluation::combiner::LogicCombiner;
use crate::evaluation::context::EvalContext;
use crate::evaluation::error::EvalError;
use crate::evaluation::firing::FireController;
use crate::models::alert::{Alert, AlertId, CompareWith, ConditionSource};
use crate::models::candle::{Candle, EventKind, MarketEvent};
use crate::models::evaluation::{EvaluationResult, FireDecision, SnapshotEntry};
use crate::services::market_data::MarketDataProvider;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

pub struct AlertEngine {
    ctx: Arc<EvalContext>,
    market_data: Arc<dyn MarketDataProvider>,
    evaluator: ConditionEvaluator,
    controller: FireController,
    config: Config,
}

impl AlertEngine {
    pub fn new(ctx: Arc<EvalContext>, market_data: Arc<dyn MarketDataProvider>) -> Self {
        let config = ctx.config().clone();
        let evaluator = ConditionEvaluator::new(market_data.clone(), ctx.cache(), config.clone());
        let controller = FireController::new(config.clone());
        Self {
            ctx,
            market_data,
            evaluator,
            controller,
            config,
        }
    }

    pub fn context(&self) -> Arc<EvalContext> {
        self.ctx.clone()
    }

    /// Live evaluation of one alert for one market event. The caller
    /// commits the fire (via [`AlertEngine::commit_fire`]) only after
    /// downstream notification is accepted.
    pub async fn evaluate_alert(
        &self,
        alert: &Alert,
        event: &MarketEvent,
    ) -> Result<EvaluationResult, EvalError> {
        self.evaluate(alert, event, false).await.map(|(result, _)| result)
    }

    /// Live evaluation returning the fire decision alongside the
    /// result, for callers that drive the notify-then-commit handshake.
    pub async fn evaluate_with_decision(
        &self,
        alert: &Alert,
        event: &MarketEvent,
    ) -> Result<(EvaluationResult, FireDecision), EvalError> {
        self.evaluate(alert, event, false).await
    }

    /// Evaluate against the latest closed bar without mutating
    /// condition states or the last-fired watermark. Repeated calls
    /// over unchanged data return identical results.
    pub async fn simulate_alert(&self, alert: &Alert) -> Result<EvaluationResult, EvalError> {
        let latest = bounded(self.config.collaborator_timeout, "market data", async {
            Ok(self
                .market_data
                .latest_closed_bar(&alert.symbol, alert.base_timeframe)
                .await?)
        })
        .await?;
        let event = MarketEvent::bar_close(alert.symbol.clone(), alert.base_timeframe, latest.timestamp);
        self.evaluate(alert, &event, true).await.map(|(result, _)| result)
    }

    /// Advance the last-fired watermark after an accepted dispatch
    pub async fn commit_fire(&self, alert_id: AlertId, fired_at: DateTime<Utc>) -> bool {
        self.ctx.commit_fire(alert_id, fired_at).await
    }

    async fn evaluate(
        &self,
        alert: &Alert,
        event: &MarketEvent,
        dry_run: bool,
    ) -> Result<(EvaluationResult, FireDecision), EvalError> {
        if !alert.is_active() {
            let snapshot: Vec<SnapshotEntry> = Vec::new();
            return Ok((
                EvaluationResult {
                    alert_id: alert.alert_id,
                    would_fire: false,
                    reasons: vec!["alert is paused".to_string()],
                    snapshot: snapshot.clone(),
                    evaluated_at: event.at,
                },
                FireDecision {
                    should_fire: false,
                    fired_at: event.at,
                    snapshot,
                },
            ));
        }

        Self::validate(alert)?;

        let (current, previous, closed) = self.event_bars(alert, event).await?;

        let mut outcomes = Vec::with_capacity(alert.conditions.len());
        for condition in &alert.conditions {
            let outcome = self
                .evaluator
                .evaluate(alert, condition, &current, previous.as_ref(), closed)
                .await?;
            outcomes.push(outcome);
        }

        let mut states = self.ctx.states_snapshot(alert.alert_id).await;
        let combined = LogicCombiner::combine(alert, &outcomes, &mut states, event.at);
        if !dry_run {
            self.ctx.store_states(alert.alert_id, states).await;
        }

        let snapshot: Vec<SnapshotEntry> = outcomes.iter().map(SnapshotEntry::from).collect();
        let last_fired = self.ctx.last_fired(alert.alert_id).await;
        let decision =
            self.controller
                .decide(alert, combined.satisfied, event, last_fired, snapshot);

        debug!(
            alert_id = alert.alert_id,
            symbol = %alert.symbol,
            satisfied = combined.satisfied,
            would_fire = decision.should_fire,
            dry_run = dry_run,
            "evaluated alert {} on {}",
            alert.alert_id,
            alert.symbol
        );

        let result = EvaluationResult {
            alert_id: alert.alert_id,
            would_fire: decision.should_fire,
            reasons: combined.reasons,
            snapshot: decision.snapshot.clone(),
            evaluated_at: event.at,
        };
        Ok((result, decision))
    }

    /// Resolve the bar pair the event refers to: the bar under
    /// evaluation plus the one before it (for edge conditions).
    async fn event_bars(
        &self,
        alert: &Alert,
        event: &MarketEvent,
    ) -> Result<(Candle, Option<Candle>, bool), EvalError> {
        let timeout = self.config.collaborator_timeout;
        match event.kind {
            EventKind::BarClose => {
                let mut bars = bounded(timeout, "market data", async {
                    Ok(self
                        .market_data
                        .closed_bars(&alert.symbol, alert.base_timeframe, 2)
                        .await?)
                })
                .await?;
                let current = bars.pop().ok_or_else(|| {
                    EvalError::Resolution(format!(
                        "no closed bars for {}/{}",
                        alert.symbol, alert.base_timeframe
                    ))
                })?;
                Ok((current, bars.pop(), true))
            }
            EventKind::Tick => {
                let forming = bounded(timeout, "market data", async {
                    Ok(self
                        .market_data
                        .forming_bar(&alert.symbol, alert.base_timeframe)
                        .await?)
                })
                .await?;
                let current = forming.ok_or_else(|| {
                    EvalError::Resolution(format!(
                        "no forming bar for {}/{}",
                        alert.symbol, alert.base_timeframe
                    ))
                })?;
                let previous = bounded(timeout, "market data", async {
                    Ok(self
                        .market_data
                        .closed_bars(&alert.symbol, alert.base_timeframe, 1)
                        .await?)
                })
                .await?
                .pop();
                Ok((current, previous, false))
            }
        }
    }

    /// Reject malformed definitions before touching any state
    fn validate(alert: &Alert) -> Result<(), EvalError> {
        if alert.symbol.trim().is_empty() {
            return Err(EvalError::Configuration("symbol is empty".to_string()));
        }
        if alert.conditions.is_empty() {
            return Err(EvalError::Configuration(
                "alert has no conditions".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for condition in &alert.conditions {
            if !seen.insert(condition.id.as_str()) {
                return Err(EvalError::Configuration(format!(
                    "duplicate condition id '{}'",
                    condition.id
                )));
            }
            if let ConditionSource::Indicator {
                name, component, ..
            } = &condition.source
            {
                if name.trim().is_empty() || component.trim().is_empty() {
                    return Err(EvalError::Configuration(format!(
                        "condition '{}' has an empty indicator reference",
                        condition.id
                    )));
                }
            }
            if let CompareWith::Indicator {
                name, component, ..
            } = &condition.compare_with
            {
                if name.trim().is_empty() || component.trim().is_empty() {
                    return Err(EvalError::Configuration(format!(
                        "condition '{}' compares with an empty indicator reference",
                        condition.id
                    )));
                }
            }
        }
        Ok(())
    }
}
