//! Persistence collaborator: alert definitions, last-fired metadata,
//! and the append-only firing log.

use crate::models::alert::{Alert, AlertId};
use crate::models::evaluation::FiringEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Alert definitions eligible for evaluation
    async fn load_active_alerts(&self) -> Result<Vec<Alert>, StoreError>;

    /// Persist the last-fired watermark for an alert
    async fn save_last_fired(
        &self,
        alert_id: AlertId,
        fired_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Append one entry to the firing log
    async fn append_firing(&self, event: &FiringEvent) -> Result<(), StoreError>;
}

/// In-memory store for tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryAlertStore {
    alerts: RwLock<Vec<Alert>>,
    last_fired: RwLock<HashMap<AlertId, DateTime<Utc>>>,
    firings: RwLock<Vec<FiringEvent>>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_alert(&self, alert: Alert) {
        self.alerts.write().unwrap().push(alert);
    }

    pub fn last_fired(&self, alert_id: AlertId) -> Option<DateTime<Utc>> {
        self.last_fired.read().unwrap().get(&alert_id).copied()
    }

    pub fn firing_log(&self) -> Vec<FiringEvent> {
        self.firings.read().unwrap().clone()
    }
}

#[async_trait]
impl AlertStore for InMemoryAlertStore {
    async fn load_active_alerts(&self) -> Result<Vec<Alert>, StoreError> {
        Ok(self.alerts.read().unwrap().clone())
    }

    async fn save_last_fired(
        &self,
        alert_id: AlertId,
        fired_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.last_fired.write().unwrap().insert(alert_id, fired_at);
        Ok(())
    }

    async fn append_firing(&self, event: &FiringEvent) -> Result<(), StoreError> {
        self.firings.write().unwrap().push(event.clone());
        Ok(())
    }
}
