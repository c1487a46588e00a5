/// Notification dispatcher: deliver-or-queue
///
/// Accepts producer input addressed to a subscriber id, formats the
/// record, and delivers it through the registry when a live channel
/// exists; otherwise the record lands in that subscriber's pending queue
/// and is flushed, in order, when the subscriber reconnects.
///
/// Delivery is best effort. Transmission errors are treated as "channel
/// now dead": logged, and the record queued rather than dropped. Nothing
/// is ever surfaced back to the producer.
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::metrics;
use crate::models::{Notification, NotificationInput, SubscriberId};
use crate::services::NotificationStore;
use crate::websocket::ConnectionRegistry;

/// Default per-subscriber pending-queue cap. A long-offline subscriber
/// otherwise accumulates unbounded memory; beyond the cap the oldest
/// record is evicted.
pub const DEFAULT_MAX_PENDING: usize = 256;

pub struct NotificationDispatcher {
    registry: ConnectionRegistry,
    store: Arc<dyn NotificationStore>,
    pending: RwLock<HashMap<SubscriberId, VecDeque<Notification>>>,
    max_pending_per_subscriber: usize,
}

impl NotificationDispatcher {
    pub fn new(registry: ConnectionRegistry, store: Arc<dyn NotificationStore>) -> Self {
        Self::with_queue_cap(registry, store, DEFAULT_MAX_PENDING)
    }

    pub fn with_queue_cap(
        registry: ConnectionRegistry,
        store: Arc<dyn NotificationStore>,
        max_pending_per_subscriber: usize,
    ) -> Self {
        Self {
            registry,
            store,
            pending: RwLock::new(HashMap::new()),
            max_pending_per_subscriber,
        }
    }

    /// Build a record from producer input and deliver or queue it.
    ///
    /// The record is handed to the persistence hook regardless of the
    /// delivery outcome; hook failures are logged and swallowed.
    pub async fn send(&self, recipient: &SubscriberId, input: NotificationInput) -> Notification {
        let notification = Notification::from_input(recipient.clone(), input);

        if let Err(e) = self.store.persist(&notification).await {
            warn!(
                notification_id = %notification.id,
                error = %e,
                "persistence hook failed, continuing with delivery"
            );
        }

        match self.registry.lookup(recipient).await {
            Some(sender) if !sender.is_closed() => match sender.send(notification.clone()) {
                Ok(()) => {
                    metrics::observe_dispatch(notification.notification_type.as_str(), "delivered");
                    debug!(
                        subscriber = %recipient,
                        notification_id = %notification.id,
                        "notification delivered on live channel"
                    );
                }
                Err(_) => {
                    warn!(
                        subscriber = %recipient,
                        notification_id = %notification.id,
                        "channel closed during send, queueing notification"
                    );
                    self.enqueue(notification.clone()).await;
                }
            },
            _ => {
                debug!(
                    subscriber = %recipient,
                    notification_id = %notification.id,
                    "no live channel, queueing notification"
                );
                self.enqueue(notification.clone()).await;
            }
        }

        notification
    }

    /// Apply `send` independently to each recipient.
    ///
    /// No atomicity across the set: one recipient being offline never
    /// affects delivery to the others, and there is no ordering guarantee
    /// between different subscribers.
    pub async fn send_bulk(
        &self,
        recipients: &[SubscriberId],
        input: NotificationInput,
    ) -> Vec<Notification> {
        let sends = recipients
            .iter()
            .map(|recipient| self.send(recipient, input.clone()));
        futures::future::join_all(sends).await
    }

    /// Deliver every queued record for the subscriber in enqueue order,
    /// then clear the queue. Returns the number delivered.
    ///
    /// If the channel dies mid-flush, the failed record and everything
    /// behind it stay queued for the next reconnect.
    pub async fn flush_pending(&self, subscriber: &SubscriberId) -> usize {
        let Some(sender) = self.registry.lookup(subscriber).await else {
            return 0;
        };

        let mut pending = self.pending.write().await;
        let Some(queue) = pending.get_mut(subscriber) else {
            return 0;
        };

        let mut delivered = 0;
        while let Some(front) = queue.front() {
            if sender.send(front.clone()).is_ok() {
                queue.pop_front();
                delivered += 1;
            } else {
                warn!(
                    subscriber = %subscriber,
                    remaining = queue.len(),
                    "channel closed mid-flush, retaining queued notifications"
                );
                break;
            }
        }

        if queue.is_empty() {
            pending.remove(subscriber);
        }
        if delivered > 0 {
            debug!(subscriber = %subscriber, delivered, "flushed pending queue");
        }
        delivered
    }

    /// Queue depth for one subscriber.
    pub async fn pending_count(&self, subscriber: &SubscriberId) -> usize {
        self.pending
            .read()
            .await
            .get(subscriber)
            .map(VecDeque::len)
            .unwrap_or(0)
    }

    /// Queue depth across all subscribers.
    pub async fn total_pending(&self) -> usize {
        self.pending.read().await.values().map(VecDeque::len).sum()
    }

    async fn enqueue(&self, notification: Notification) {
        let mut pending = self.pending.write().await;
        let queue = pending.entry(notification.recipient.clone()).or_default();
        if queue.len() >= self.max_pending_per_subscriber {
            if let Some(evicted) = queue.pop_front() {
                metrics::observe_pending_eviction();
                warn!(
                    subscriber = %notification.recipient,
                    evicted_id = %evicted.id,
                    cap = self.max_pending_per_subscriber,
                    "pending queue full, evicting oldest notification"
                );
            }
        }
        metrics::observe_dispatch(notification.notification_type.as_str(), "queued");
        queue.push_back(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NotificationPriority, NotificationType};
    use crate::services::InMemoryNotificationStore;
    use tokio::sync::mpsc;

    fn dispatcher() -> (NotificationDispatcher, ConnectionRegistry) {
        let registry = ConnectionRegistry::new();
        let store = Arc::new(InMemoryNotificationStore::new());
        (
            NotificationDispatcher::new(registry.clone(), store),
            registry,
        )
    }

    fn subscriber(id: &str) -> SubscriberId {
        SubscriberId::from(id)
    }

    fn job_match() -> NotificationInput {
        NotificationInput::job_match("New match", "92% match")
    }

    #[tokio::test]
    async fn test_send_delivers_on_live_channel() {
        let (dispatcher, registry) = dispatcher();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register(subscriber("u1"), tx).await;

        let sent = dispatcher.send(&subscriber("u1"), job_match()).await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received, sent);
        assert_eq!(dispatcher.pending_count(&subscriber("u1")).await, 0);
    }

    #[tokio::test]
    async fn test_send_queues_when_offline() {
        let (dispatcher, _registry) = dispatcher();

        dispatcher.send(&subscriber("u1"), job_match()).await;
        dispatcher.send(&subscriber("u1"), job_match()).await;

        assert_eq!(dispatcher.pending_count(&subscriber("u1")).await, 2);
        assert_eq!(dispatcher.total_pending().await, 2);
    }

    #[tokio::test]
    async fn test_send_queues_on_closed_channel() {
        let (dispatcher, registry) = dispatcher();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.register(subscriber("u1"), tx).await;
        drop(rx);

        dispatcher.send(&subscriber("u1"), job_match()).await;
        assert_eq!(dispatcher.pending_count(&subscriber("u1")).await, 1);
    }

    #[tokio::test]
    async fn test_queue_then_register_flushes_in_order() {
        // "u42" is offline for three sends, then reconnects.
        let (dispatcher, registry) = dispatcher();
        let u42 = subscriber("u42");

        let mut sent = Vec::new();
        for _ in 0..3 {
            sent.push(dispatcher.send(&u42, job_match()).await);
        }
        assert_eq!(dispatcher.pending_count(&u42).await, 3);

        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register(u42.clone(), tx).await;
        let flushed = dispatcher.flush_pending(&u42).await;
        assert_eq!(flushed, 3);

        for expected in &sent {
            assert_eq!(&rx.recv().await.unwrap(), expected);
        }
        assert_eq!(dispatcher.pending_count(&u42).await, 0);
    }

    #[tokio::test]
    async fn test_flush_without_channel_is_noop() {
        let (dispatcher, _registry) = dispatcher();
        dispatcher.send(&subscriber("u1"), job_match()).await;

        assert_eq!(dispatcher.flush_pending(&subscriber("u1")).await, 0);
        assert_eq!(dispatcher.pending_count(&subscriber("u1")).await, 1);
    }

    #[tokio::test]
    async fn test_repeated_flush_is_noop() {
        let (dispatcher, registry) = dispatcher();
        let (tx, _rx) = mpsc::unbounded_channel();
        dispatcher.send(&subscriber("u1"), job_match()).await;
        registry.register(subscriber("u1"), tx).await;

        assert_eq!(dispatcher.flush_pending(&subscriber("u1")).await, 1);
        assert_eq!(dispatcher.flush_pending(&subscriber("u1")).await, 0);
    }

    #[tokio::test]
    async fn test_flush_on_dead_channel_retains_queue() {
        let (dispatcher, registry) = dispatcher();
        dispatcher.send(&subscriber("u1"), job_match()).await;
        dispatcher.send(&subscriber("u1"), job_match()).await;

        let (tx, rx) = mpsc::unbounded_channel();
        registry.register(subscriber("u1"), tx).await;
        drop(rx);

        assert_eq!(dispatcher.flush_pending(&subscriber("u1")).await, 0);
        assert_eq!(dispatcher.pending_count(&subscriber("u1")).await, 2);
    }

    #[tokio::test]
    async fn test_send_bulk_is_per_recipient_independent() {
        let (dispatcher, registry) = dispatcher();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register(subscriber("online"), tx).await;

        let recipients = vec![subscriber("offline"), subscriber("online")];
        let sent = dispatcher.send_bulk(&recipients, job_match()).await;

        assert_eq!(sent.len(), 2);
        // The offline recipient queues; the online one is unaffected.
        assert!(rx.recv().await.is_some());
        assert_eq!(dispatcher.pending_count(&subscriber("offline")).await, 1);
        assert_eq!(dispatcher.pending_count(&subscriber("online")).await, 0);
    }

    #[tokio::test]
    async fn test_unregister_then_send_queues() {
        let (dispatcher, registry) = dispatcher();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.register(subscriber("u1"), tx).await;
        registry.unregister(&subscriber("u1")).await;

        assert!(registry.lookup(&subscriber("u1")).await.is_none());
        dispatcher.send(&subscriber("u1"), job_match()).await;
        assert_eq!(dispatcher.pending_count(&subscriber("u1")).await, 1);
    }

    #[tokio::test]
    async fn test_queue_cap_evicts_oldest_first() {
        let registry = ConnectionRegistry::new();
        let store = Arc::new(InMemoryNotificationStore::new());
        let dispatcher = NotificationDispatcher::with_queue_cap(registry.clone(), store, 2);
        let u1 = subscriber("u1");

        let first = dispatcher.send(&u1, job_match()).await;
        let second = dispatcher.send(&u1, job_match()).await;
        let third = dispatcher.send(&u1, job_match()).await;
        assert_eq!(dispatcher.pending_count(&u1).await, 2);

        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register(u1.clone(), tx).await;
        assert_eq!(dispatcher.flush_pending(&u1).await, 2);

        assert_eq!(rx.recv().await.unwrap().id, second.id);
        assert_eq!(rx.recv().await.unwrap().id, third.id);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_send_persists_regardless_of_delivery() {
        let registry = ConnectionRegistry::new();
        let store = Arc::new(InMemoryNotificationStore::new());
        let dispatcher = NotificationDispatcher::new(registry.clone(), store.clone());
        let u1 = subscriber("u1");

        // Offline: queued, but still persisted.
        dispatcher.send(&u1, job_match()).await;
        assert_eq!(store.history(&u1, 10).await.unwrap().len(), 1);

        // Online: delivered and persisted.
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.register(u1.clone(), tx).await;
        dispatcher
            .send(
                &u1,
                NotificationInput::new(
                    NotificationType::ApplicationUpdate,
                    "Application moved forward",
                    "Acme Corp shortlisted you",
                    NotificationPriority::Medium,
                ),
            )
            .await;
        assert_eq!(store.history(&u1, 10).await.unwrap().len(), 2);
    }
}
