/// Persistence seam for dispatched notifications
///
/// The dispatcher hands every record to `persist` fire-and-forget: a
/// failing store never blocks or fails delivery. The read-side HTTP
/// surface (history, unread count, mark-as-read) is served from the same
/// trait.
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Notification, SubscriberId};

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Record a dispatched notification. Callers ignore the outcome
    /// beyond logging it.
    async fn persist(&self, notification: &Notification) -> Result<()>;

    /// Most recent notifications for a subscriber, newest first.
    async fn history(&self, subscriber: &SubscriberId, limit: usize) -> Result<Vec<Notification>>;

    /// Mark a notification read; errors with `NotFound` on an unknown id.
    async fn mark_read(&self, notification_id: Uuid) -> Result<()>;

    async fn unread_count(&self, subscriber: &SubscriberId) -> Result<usize>;
}

/// In-memory reference store.
///
/// Contents are lost on restart; durability is explicitly not a property
/// of this service. Deployments needing a system of record wire their own
/// `NotificationStore` implementation.
#[derive(Default)]
pub struct InMemoryNotificationStore {
    inner: RwLock<HashMap<SubscriberId, Vec<Notification>>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn persist(&self, notification: &Notification) -> Result<()> {
        let mut records = self.inner.write().await;
        records
            .entry(notification.recipient.clone())
            .or_default()
            .push(notification.clone());
        Ok(())
    }

    async fn history(&self, subscriber: &SubscriberId, limit: usize) -> Result<Vec<Notification>> {
        let records = self.inner.read().await;
        let mut items = records.get(subscriber).cloned().unwrap_or_default();
        items.reverse();
        items.truncate(limit);
        Ok(items)
    }

    async fn mark_read(&self, notification_id: Uuid) -> Result<()> {
        let mut records = self.inner.write().await;
        for list in records.values_mut() {
            if let Some(notification) = list.iter_mut().find(|n| n.id == notification_id) {
                if !notification.is_read {
                    notification.is_read = true;
                    notification.read_at = Some(Utc::now());
                }
                return Ok(());
            }
        }
        Err(AppError::NotFound(format!(
            "notification {notification_id}"
        )))
    }

    async fn unread_count(&self, subscriber: &SubscriberId) -> Result<usize> {
        let records = self.inner.read().await;
        Ok(records
            .get(subscriber)
            .map(|list| list.iter().filter(|n| !n.is_read).count())
            .unwrap_or(0))
    }
}
