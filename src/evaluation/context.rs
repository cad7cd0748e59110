//! Injectable evaluation state: condition states, last-fired
//! watermarks, and the shared indicator cache.
//!
//! Constructed at startup and passed to every evaluation call, so
//! multiple isolated contexts (production vs simulation) can coexist
//! in one process.

use crate::cache::IndicatorCache;
use crate::config::Config;
use crate::models::alert::{AlertId, ConditionState};
use crate::services::indicators::IndicatorProvider;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

pub struct EvalContext {
    config: Config,
    cache: Arc<IndicatorCache>,
    /// Arena of per-(alert, condition) validity state
    condition_states: Mutex<HashMap<(AlertId, String), ConditionState>>,
    last_fired: Mutex<HashMap<AlertId, DateTime<Utc>>>,
}

impl EvalContext {
    pub fn new(config: Config, indicator_provider: Arc<dyn IndicatorProvider>) -> Self {
        let cache = Arc::new(IndicatorCache::new(
            indicator_provider,
            config.cache_capacity,
        ));
        Self {
            config,
            cache,
            condition_states: Mutex::new(HashMap::new()),
            last_fired: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> Arc<IndicatorCache> {
        self.cache.clone()
    }

    /// Copy of one alert's condition states, keyed by condition id
    pub async fn states_snapshot(&self, alert_id: AlertId) -> HashMap<String, ConditionState> {
        let states = self.condition_states.lock().await;
        states
            .iter()
            .filter(|((id, _), _)| *id == alert_id)
            .map(|((_, condition_id), state)| (condition_id.clone(), state.clone()))
            .collect()
    }

    /// Write back an alert's condition states after a live evaluation
    pub async fn store_states(
        &self,
        alert_id: AlertId,
        updated: HashMap<String, ConditionState>,
    ) {
        let mut states = self.condition_states.lock().await;
        for (condition_id, state) in updated {
            states.insert((alert_id, condition_id), state);
        }
    }

    pub async fn last_fired(&self, alert_id: AlertId) -> Option<DateTime<Utc>> {
        self.last_fired.lock().await.get(&alert_id).copied()
    }

    /// Advance the last-fired watermark. Called only after downstream
    /// notification was accepted; regressions are rejected.
    pub async fn commit_fire(&self, alert_id: AlertId, fired_at: DateTime<Utc>) -> bool {
        let mut last_fired = self.last_fired.lock().await;
        match last_fired.get(&alert_id) {
            Some(existing) if *existing >= fired_at => {
                debug!(
                    alert_id = alert_id,
                    fired_at = %fired_at,
                    existing = %existing,
                    "ignoring non-advancing fire commit"
                );
                false
            }
            _ => {
                last_fired.insert(alert_id, fired_at);
                true
            }
        }
    }

    /// Drop all state owned by an alert when it is deleted
    pub async fn evict_alert(&self, alert_id: AlertId) {
        self.condition_states
            .lock()
            .await
            .retain(|(id, _), _| *id != alert_id);
        self.last_fired.lock().await.remove(&alert_id);
    }
}
