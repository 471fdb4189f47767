//! Notification dispatch seam.
//!
//! Push delivery is an external collaborator: the engine only collects
//! notifications during a transaction and hands them to a dispatcher after
//! the commit. Delivery is best-effort - failures are logged and never roll
//! back or retry the originating transaction.

use async_trait::async_trait;
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

/// A push notification addressed to a single user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(user_id: Uuid, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            user_id,
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Dispatch errors. The dispatcher owns cleanup of invalid delivery tokens;
/// the engine only ever logs these.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Delivery to {user_id} failed: {reason}")]
    DeliveryFailed { user_id: Uuid, reason: String },
}

/// Best-effort push delivery.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Dispatcher that logs deliveries instead of sending them. Used as the
/// default when no push backend is configured.
#[derive(Debug, Default)]
pub struct TracingDispatcher;

#[async_trait]
impl NotificationDispatcher for TracingDispatcher {
    async fn dispatch(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            user_id = %notification.user_id,
            title = %notification.title,
            body = %notification.body,
            "notification dispatched"
        );
        Ok(())
    }
}

/// Test double that records every dispatched notification.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<Notification>>,
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn dispatch(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .expect("dispatcher mutex")
            .push(notification.clone());
        Ok(())
    }
}

impl RecordingDispatcher {
    /// Drain and return everything dispatched so far.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.sent.lock().expect("dispatcher mutex"))
    }

    pub fn count(&self) -> usize {
        self.sent.lock().expect("dispatcher mutex").len()
    }
}
