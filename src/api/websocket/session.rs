//! Per-connection control state
//!
//! `Connected` → `Subscribed(topic)` → `Closed`. The session owns the
//! registry entry of its connection: it is the only writer of that
//! connection's topic, and it unregisters the connection when it closes
//! (explicitly or on drop).

use std::sync::Arc;

use super::events::{ClientMessage, ServerReply};
use super::registry::{ConnectionHandle, ConnectionId, ConnectionRegistry};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Registered but not receiving any events yet
    Connected,
    Subscribed(String),
    /// Terminal
    Closed,
}

pub struct Session {
    handle: ConnectionHandle,
    registry: Arc<ConnectionRegistry>,
    state: SessionState,
}

impl Session {
    /// Wrap an already registered connection
    pub fn new(handle: ConnectionHandle, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            handle,
            registry,
            state: SessionState::Connected,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Apply one inbound text frame
    ///
    /// Returns the reply to queue for the client, if any. Frames that do not
    /// parse are dropped and leave the state untouched.
    pub fn handle_text(&mut self, text: &str) -> Option<ServerReply> {
        if self.is_closed() {
            return None;
        }

        let Some(message) = ClientMessage::parse(text) else {
            let preview: String = text.chars().take(100).collect();
            tracing::debug!(
                connection_id = %self.id(),
                frame = %preview,
                "Ignoring malformed control frame"
            );
            return None;
        };

        match message {
            ClientMessage::Subscribe { slug } => {
                self.registry.set_topic(self.id(), slug.clone());
                self.state = SessionState::Subscribed(slug.clone());
                Some(ServerReply::Subscribed { slug })
            }
            ClientMessage::Ping => Some(ServerReply::Pong),
        }
    }

    /// Move to `Closed` and leave the registry. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.is_closed() {
            return;
        }
        self.state = SessionState::Closed;
        self.registry.unregister(self.id());
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
