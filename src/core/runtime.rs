//! Alert runtime: registry of active alerts plus the per-event
//! evaluation fan-out with notify-then-commit firing.

use crate::evaluation::engine::AlertEngine;
use crate::evaluation::error::EvalError;
use crate::models::alert::{Alert, AlertId};
use crate::models::candle::{EventKind, MarketEvent};
use crate::models::evaluation::{EvaluationResult, FiringEvent};
use crate::services::notifier::Notifier;
use crate::services::persistence::AlertStore;
use futures_util::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

pub struct AlertRuntime {
    engine: Arc<AlertEngine>,
    store: Arc<dyn AlertStore>,
    notifier: Arc<dyn Notifier>,
    alerts: RwLock<HashMap<AlertId, Arc<Alert>>>,
    /// Per-alert evaluation locks: overlapping events for one alert
    /// are serialized, different alerts run concurrently
    locks: Mutex<HashMap<AlertId, Arc<Mutex<()>>>>,
    /// Alerts quarantined by a configuration error until their
    /// definition is replaced
    invalid: RwLock<HashSet<AlertId>>,
}

impl AlertRuntime {
    pub fn new(
        engine: Arc<AlertEngine>,
        store: Arc<dyn AlertStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            engine,
            store,
            notifier,
            alerts: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
            invalid: RwLock::new(HashSet::new()),
        }
    }

    /// Load alert definitions from the store, replacing the registry
    pub async fn load_alerts(&self) -> Result<usize, crate::services::persistence::StoreError> {
        let definitions = self.store.load_active_alerts().await?;
        let count = definitions.len();
        let mut alerts = self.alerts.write().await;
        alerts.clear();
        for alert in definitions {
            alerts.insert(alert.alert_id, Arc::new(alert));
        }
        info!(count = count, "AlertRuntime: loaded {} alerts", count);
        Ok(count)
    }

    /// Register or replace one alert definition. Replacing clears any
    /// configuration-error quarantine.
    pub async fn register_alert(&self, alert: Alert) {
        let alert_id = alert.alert_id;
        self.invalid.write().await.remove(&alert_id);
        self.alerts.write().await.insert(alert_id, Arc::new(alert));
        debug!(alert_id = alert_id, "AlertRuntime: registered alert {}", alert_id);
    }

    /// Remove an alert and evict all state owned by it
    pub async fn remove_alert(&self, alert_id: AlertId) {
        self.alerts.write().await.remove(&alert_id);
        self.locks.lock().await.remove(&alert_id);
        self.invalid.write().await.remove(&alert_id);
        self.engine.context().evict_alert(alert_id).await;
        debug!(alert_id = alert_id, "AlertRuntime: removed alert {}", alert_id);
    }

    /// Side-effect-free evaluation of one alert definition
    pub async fn simulate(&self, alert: &Alert) -> Result<EvaluationResult, EvalError> {
        self.engine.simulate_alert(alert).await
    }

    /// Evaluate all matching alerts for one market event. Failures are
    /// isolated per alert; the returned results cover the alerts that
    /// completed evaluation.
    pub async fn on_event(&self, event: &MarketEvent) -> Vec<EvaluationResult> {
        if event.kind == EventKind::Tick {
            self.engine
                .context()
                .cache()
                .invalidate_forming(&event.symbol, event.timeframe)
                .await;
        }

        let targets: Vec<Arc<Alert>> = {
            let alerts = self.alerts.read().await;
            let invalid = self.invalid.read().await;
            alerts
                .values()
                .filter(|alert| {
                    alert.symbol == event.symbol
                        && alert.base_timeframe == event.timeframe
                        && alert.is_active()
                        && !invalid.contains(&alert.alert_id)
                })
                .cloned()
                .collect()
        };

        if targets.is_empty() {
            return Vec::new();
        }

        debug!(
            symbol = %event.symbol,
            timeframe = %event.timeframe,
            kind = ?event.kind,
            count = targets.len(),
            "AlertRuntime: evaluating {} alerts for {}/{}",
            targets.len(),
            event.symbol,
            event.timeframe
        );

        let results = join_all(
            targets
                .iter()
                .map(|alert| self.process_alert(alert.clone(), event)),
        )
        .await;

        results.into_iter().flatten().collect()
    }

    async fn process_alert(
        &self,
        alert: Arc<Alert>,
        event: &MarketEvent,
    ) -> Option<EvaluationResult> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(alert.alert_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = lock.lock().await;

        let (result, decision) = match self.engine.evaluate_with_decision(&alert, event).await {
            Ok(output) => output,
            Err(err @ EvalError::Configuration(_)) => {
                error!(
                    alert_id = alert.alert_id,
                    error = %err,
                    "AlertRuntime: alert {} marked invalid: {}",
                    alert.alert_id,
                    err
                );
                self.invalid.write().await.insert(alert.alert_id);
                return None;
            }
            Err(err @ EvalError::Timeout { .. }) => {
                warn!(
                    alert_id = alert.alert_id,
                    error = %err,
                    "AlertRuntime: evaluation of alert {} skipped this cycle: {}",
                    alert.alert_id,
                    err
                );
                return None;
            }
            Err(err) => {
                warn!(
                    alert_id = alert.alert_id,
                    error = %err,
                    "AlertRuntime: evaluation of alert {} failed: {}",
                    alert.alert_id,
                    err
                );
                return None;
            }
        };

        if decision.should_fire {
            self.dispatch_fire(&alert, &result, decision.fired_at).await;
        }

        Some(result)
    }

    /// Notify downstream, then commit. A rejected dispatch leaves the
    /// last-fired watermark untouched so the next qualifying event
    /// retries (at-least-once).
    async fn dispatch_fire(
        &self,
        alert: &Alert,
        result: &EvaluationResult,
        fired_at: chrono::DateTime<chrono::Utc>,
    ) {
        let firing = FiringEvent {
            alert_id: alert.alert_id,
            symbol: alert.symbol.clone(),
            reasons: result.reasons.clone(),
            snapshot: result.snapshot.clone(),
            fired_at,
        };

        let timeout = self.engine.context().config().collaborator_timeout;
        let delivered = match tokio::time::timeout(timeout, self.notifier.notify(&firing)).await {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                warn!(
                    alert_id = alert.alert_id,
                    error = %err,
                    "AlertRuntime: notification for alert {} rejected, fire not committed",
                    alert.alert_id
                );
                false
            }
            Err(_) => {
                warn!(
                    alert_id = alert.alert_id,
                    "AlertRuntime: notification for alert {} timed out, fire not committed",
                    alert.alert_id
                );
                false
            }
        };

        if !delivered {
            return;
        }

        self.engine.commit_fire(alert.alert_id, fired_at).await;

        if let Err(err) = self.store.save_last_fired(alert.alert_id, fired_at).await {
            error!(
                alert_id = alert.alert_id,
                error = %err,
                "AlertRuntime: failed to persist last-fired for alert {}",
                alert.alert_id
            );
        }
        if let Err(err) = self.store.append_firing(&firing).await {
            error!(
                alert_id = alert.alert_id,
                error = %err,
                "AlertRuntime: failed to append firing log entry for alert {}",
                alert.alert_id
            );
        }

        info!(
            alert_id = alert.alert_id,
            symbol = %alert.symbol,
            fired_at = %fired_at,
            reasons = ?firing.reasons,
            "AlertRuntime: alert {} fired on {}",
            alert.alert_id,
            alert.symbol
        );
    }
}
