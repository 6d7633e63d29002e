//! WebSocket application state

use std::sync::Arc;

use crate::config::HubConfig;
use super::broadcaster::{EventBroadcaster, Publisher};
use super::registry::ConnectionRegistry;

/// Shared state handed to every request handler
///
/// Constructed once at startup; tests build as many independent hubs as
/// they need.
pub struct HubState {
    pub config: HubConfig,

    /// Live connections and their subscriptions
    pub registry: Arc<ConnectionRegistry>,

    /// Fan-out over `registry`
    pub broadcaster: Arc<EventBroadcaster>,
}

impl HubState {
    pub fn new(config: HubConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(config.send_queue));
        let broadcaster = Arc::new(EventBroadcaster::new(Arc::clone(&registry)));
        Self {
            config,
            registry,
            broadcaster,
        }
    }

    /// The publish capability for the CRUD layer
    pub fn publisher(&self) -> Arc<dyn Publisher> {
        self.broadcaster.clone()
    }

    /// Close every live connection
    pub fn shutdown(&self) -> usize {
        self.registry.shutdown()
    }
}

impl Default for HubState {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}
