//! Notification collaborator. Dispatch transport (webhook, bot, email)
//! lives behind this trait; the core only needs accepted/rejected.

use crate::models::evaluation::FiringEvent;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification rejected: {0}")]
    Rejected(String),

    #[error("notifier unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a firing event. `Ok(())` means the downstream accepted
    /// it and the caller may commit the fire.
    async fn notify(&self, event: &FiringEvent) -> Result<(), NotifyError>;
}

/// Test notifier that records accepted events and can be switched to
/// reject everything.
#[derive(Default)]
pub struct CollectingNotifier {
    events: Mutex<Vec<FiringEvent>>,
    rejecting: AtomicBool,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    pub fn accepted(&self) -> Vec<FiringEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for CollectingNotifier {
    async fn notify(&self, event: &FiringEvent) -> Result<(), NotifyError> {
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(NotifyError::Rejected("notifier set to reject".to_string()));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}
