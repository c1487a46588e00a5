/// Connection registry
///
/// Maps a subscriber id to the live push channel for its WebSocket
/// session. The transport layer owns the socket; the registry holds only
/// the sending half of the session's channel, for routing.
///
/// Invariant: at most one channel per subscriber. A later register
/// silently replaces the earlier mapping (last writer wins).
use crate::metrics;
use crate::models::{Notification, SubscriberId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Sending half of a session's push channel
pub type PushSender = mpsc::UnboundedSender<Notification>;

#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<SubscriberId, PushSender>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route notifications for `subscriber` to `sender`.
    ///
    /// Replaces any existing mapping without error; the replaced sender is
    /// dropped here, which closes the old session's delivery path.
    pub async fn register(&self, subscriber: SubscriberId, sender: PushSender) {
        let mut connections = self.inner.write().await;
        connections.insert(subscriber, sender);
        metrics::set_connected_subscribers(connections.len() as i64);
    }

    /// Remove the mapping if present; no-op otherwise.
    ///
    /// Invoked on channel close and on channel error, so a dead channel is
    /// never routed to.
    pub async fn unregister(&self, subscriber: &SubscriberId) {
        let mut connections = self.inner.write().await;
        connections.remove(subscriber);
        metrics::set_connected_subscribers(connections.len() as i64);
    }

    /// Remove the mapping only while it still refers to `sender`.
    ///
    /// A session that was replaced by a newer connection for the same
    /// subscriber must not tear down its successor's mapping when it
    /// finally stops.
    pub async fn unregister_channel(&self, subscriber: &SubscriberId, sender: &PushSender) {
        let mut connections = self.inner.write().await;
        if connections
            .get(subscriber)
            .is_some_and(|current| current.same_channel(sender))
        {
            connections.remove(subscriber);
        }
        metrics::set_connected_subscribers(connections.len() as i64);
    }

    /// Pure read used by the dispatcher and by flush logic.
    pub async fn lookup(&self, subscriber: &SubscriberId) -> Option<PushSender> {
        self.inner.read().await.get(subscriber).cloned()
    }

    /// Whether a live, open channel exists for the subscriber.
    pub async fn is_connected(&self, subscriber: &SubscriberId) -> bool {
        self.inner
            .read()
            .await
            .get(subscriber)
            .is_some_and(|sender| !sender.is_closed())
    }

    /// Number of registered subscribers.
    pub async fn connected_count(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Ids of all registered subscribers.
    pub async fn connected_subscriber_ids(&self) -> Vec<SubscriberId> {
        self.inner.read().await.keys().cloned().collect()
    }
}
