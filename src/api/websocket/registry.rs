//! Registry of live WebSocket connections and their subscribed topic
//!
//! The map is guarded by a single mutex. Readers never iterate the map
//! outside the lock: `snapshot_for_topic` copies the matching handles out,
//! so a sweep over the snapshot cannot observe concurrent mutation.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch, Notify};

use crate::types::Topic;

/// Default capacity of a connection's outbound queue
pub const DEFAULT_SEND_QUEUE: usize = 64;

/// Process-unique connection identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Why a frame could not be queued for a connection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendFailure {
    /// The peer is not draining its queue fast enough
    Full,
    /// The connection is gone (unregistered or writer stopped)
    Closed,
}

/// Cloneable handle used to push text frames to one connection
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::Sender<String>,
    live: Arc<AtomicBool>,
    removed: Arc<Notify>,
}

impl ConnectionHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// False once the connection has been unregistered
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    /// Resolves once the connection has been removed from the registry
    pub async fn closed(&self) {
        loop {
            // Created before the check so a concurrent removal is not missed
            let removed = self.removed.notified();
            if !self.live.load(Ordering::Acquire) {
                return;
            }
            removed.await;
        }
    }

    fn mark_removed(&self) {
        self.live.store(false, Ordering::Release);
        self.removed.notify_waiters();
    }

    /// Queue a frame without waiting
    pub fn try_send(&self, frame: String) -> Result<(), SendFailure> {
        if !self.live.load(Ordering::Acquire) {
            return Err(SendFailure::Closed);
        }
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendFailure::Full,
            mpsc::error::TrySendError::Closed(_) => SendFailure::Closed,
        })
    }
}

/// Registry entry for one connection
struct Connection {
    handle: ConnectionHandle,
    topic: Option<Topic>,
    connected_at: DateTime<Utc>,
}

/// Tracks every live connection and the topic it is subscribed to
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, Connection>>,
    next_id: AtomicU64,
    send_queue: usize,
    shutdown: watch::Sender<bool>,
}

impl ConnectionRegistry {
    /// Create an empty registry whose connections buffer up to `send_queue` frames
    pub fn new(send_queue: usize) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            send_queue: send_queue.max(1),
            shutdown,
        }
    }

    /// Add a new, unsubscribed connection
    ///
    /// Returns the handle and the receiving end of its outbound queue; the
    /// caller owns the writer that drains it.
    pub fn register(&self) -> (ConnectionHandle, mpsc::Receiver<String>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.send_queue);
        let handle = ConnectionHandle {
            id,
            tx,
            live: Arc::new(AtomicBool::new(true)),
            removed: Arc::new(Notify::new()),
        };

        let previous = self.connections.lock().insert(
            id,
            Connection {
                handle: handle.clone(),
                topic: None,
                connected_at: Utc::now(),
            },
        );
        assert!(previous.is_none(), "connection id {id} registered twice");

        tracing::debug!(connection_id = %id, "Connection registered");
        (handle, rx)
    }

    /// Point the connection at a new topic; ignored if it is already gone
    pub fn set_topic(&self, id: ConnectionId, topic: impl Into<Topic>) {
        let topic = topic.into();
        let mut connections = self.connections.lock();
        match connections.get_mut(&id) {
            Some(conn) => {
                tracing::debug!(connection_id = %id, topic = %topic, "Topic set");
                conn.topic = Some(topic);
            }
            None => {
                tracing::trace!(connection_id = %id, "set_topic on removed connection");
            }
        }
    }

    /// Remove a connection and wake its session. Removing twice is a no-op.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let removed = self.connections.lock().remove(&id);
        match removed {
            Some(conn) => {
                conn.handle.mark_removed();
                let connected_for = Utc::now() - conn.connected_at;
                tracing::debug!(
                    connection_id = %id,
                    topic = ?conn.topic,
                    connected_secs = connected_for.num_seconds(),
                    "Connection unregistered"
                );
                true
            }
            None => false,
        }
    }

    /// Copy of the handles currently subscribed to `topic`
    pub fn snapshot_for_topic(&self, topic: &str) -> Vec<ConnectionHandle> {
        self.connections
            .lock()
            .values()
            .filter(|conn| conn.topic.as_deref() == Some(topic))
            .map(|conn| conn.handle.clone())
            .collect()
    }

    /// Topic a connection is currently subscribed to
    pub fn topic_of(&self, id: ConnectionId) -> Option<Topic> {
        self.connections
            .lock()
            .get(&id)
            .and_then(|conn| conn.topic.clone())
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.lock().contains_key(&id)
    }

    /// Number of registered connections
    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscriber count per topic (unsubscribed connections are not counted)
    pub fn topic_counts(&self) -> BTreeMap<Topic, usize> {
        let connections = self.connections.lock();
        let mut counts = BTreeMap::new();
        for topic in connections.values().filter_map(|conn| conn.topic.as_ref()) {
            *counts.entry(topic.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Receiver that flips to `true` when the hub shuts down
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Drain the registry and tell every session to close
    ///
    /// Returns the number of connections that were removed.
    pub fn shutdown(&self) -> usize {
        self.shutdown.send_replace(true);
        let drained: Vec<Connection> = self
            .connections
            .lock()
            .drain()
            .map(|(_, conn)| conn)
            .collect();
        for conn in &drained {
            conn.handle.mark_removed();
        }
        tracing::info!(connections = drained.len(), "Connection registry drained");
        drained.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_SEND_QUEUE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_assigns_unique_ids() {
        let registry = ConnectionRegistry::default();
        let (a, _rx_a) = registry.register();
        let (b, _rx_b) = registry.register();

        assert_ne!(a.id(), b.id());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.topic_of(a.id()), None);
        assert!(a.id().to_string().starts_with("conn-"));
    }

    #[test]
    fn test_unregistered_connection_never_in_snapshot() {
        let registry = ConnectionRegistry::default();
        let (a, _rx) = registry.register();
        assert!(registry.snapshot_for_topic("").is_empty());

        registry.set_topic(a.id(), "demo");
        assert_eq!(registry.snapshot_for_topic("demo").len(), 1);
        assert!(registry.snapshot_for_topic("other").is_empty());
    }

    #[test]
    fn test_set_topic_overwrites() {
        let registry = ConnectionRegistry::default();
        let (a, _rx) = registry.register();

        registry.set_topic(a.id(), "first");
        registry.set_topic(a.id(), "second");

        assert_eq!(registry.topic_of(a.id()).as_deref(), Some("second"));
        assert!(registry.snapshot_for_topic("first").is_empty());
        assert_eq!(registry.snapshot_for_topic("second").len(), 1);
    }

    #[test]
    fn test_set_topic_after_unregister_is_ignored() {
        let registry = ConnectionRegistry::default();
        let (a, _rx) = registry.register();
        registry.unregister(a.id());

        registry.set_topic(a.id(), "demo");

        assert!(registry.is_empty());
        assert!(registry.snapshot_for_topic("demo").is_empty());
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = ConnectionRegistry::default();
        let (a, _rx) = registry.register();

        assert!(registry.unregister(a.id()));
        assert!(!registry.unregister(a.id()));
        assert!(!a.is_live());
        assert_eq!(a.try_send("x".into()), Err(SendFailure::Closed));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let registry = ConnectionRegistry::default();
        let (a, _rx_a) = registry.register();
        let (b, _rx_b) = registry.register();
        registry.set_topic(a.id(), "demo");
        registry.set_topic(b.id(), "demo");

        let snapshot = registry.snapshot_for_topic("demo");
        registry.unregister(a.id());
        registry.set_topic(b.id(), "elsewhere");

        assert_eq!(snapshot.len(), 2);
        assert!(registry.snapshot_for_topic("demo").is_empty());
    }

    #[test]
    fn test_empty_topic_is_a_valid_subscription() {
        let registry = ConnectionRegistry::default();
        let (a, _rx) = registry.register();
        registry.set_topic(a.id(), "");

        assert_eq!(registry.topic_of(a.id()).as_deref(), Some(""));
        assert_eq!(registry.snapshot_for_topic("").len(), 1);
        assert!(registry.snapshot_for_topic("demo").is_empty());
    }

    #[tokio::test]
    async fn test_unregister_wakes_closed_waiters() {
        let registry = Arc::new(ConnectionRegistry::default());
        let (a, _rx) = registry.register();

        let waiter = tokio::spawn({
            let a = a.clone();
            async move { a.closed().await }
        });
        tokio::task::yield_now().await;
        registry.unregister(a.id());

        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("closed() never resolved")
            .unwrap();
        // Already removed: resolves immediately
        a.closed().await;
    }

    #[test]
    fn test_try_send_reports_full_queue() {
        let registry = ConnectionRegistry::new(1);
        let (a, _rx) = registry.register();

        assert_eq!(a.try_send("one".into()), Ok(()));
        assert_eq!(a.try_send("two".into()), Err(SendFailure::Full));
    }

    #[test]
    fn test_try_send_reports_dropped_receiver() {
        let registry = ConnectionRegistry::default();
        let (a, rx) = registry.register();
        drop(rx);

        assert_eq!(a.try_send("x".into()), Err(SendFailure::Closed));
        assert!(!a.is_live());
    }

    #[test]
    fn test_topic_counts() {
        let registry = ConnectionRegistry::default();
        let (a, _rx_a) = registry.register();
        let (b, _rx_b) = registry.register();
        let (_c, _rx_c) = registry.register();
        registry.set_topic(a.id(), "demo");
        registry.set_topic(b.id(), "demo");

        let counts = registry.topic_counts();
        assert_eq!(counts.get("demo"), Some(&2));
        assert_eq!(counts.len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_drains_and_signals() {
        let registry = ConnectionRegistry::default();
        let mut signal = registry.shutdown_signal();
        let (a, _rx_a) = registry.register();
        let (_b, _rx_b) = registry.register();

        assert_eq!(registry.shutdown(), 2);

        assert!(registry.is_empty());
        assert!(registry.is_shutting_down());
        assert!(!a.is_live());
        signal.changed().await.unwrap();
        assert!(*signal.borrow());
    }
}
