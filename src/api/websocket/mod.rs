//! WebSocket module for real-time map updates
//!
//! Provides the `/ws` endpoint. Clients subscribe to one group (by slug) and
//! receive that group's events as they are published.
//!
//! ## Pieces
//! - `registry`: live connections and their topic
//! - `router`: event to topic mapping
//! - `broadcaster`: best-effort fan-out of domain events
//! - `session`: per-connection subscribe/ping state machine
//! - `handler`: axum glue (reader loop + writer task per socket)

pub mod broadcaster;
pub mod events;
pub mod handler;
pub mod registry;
pub mod router;
pub mod session;
pub mod state;

// Re-export commonly used items
pub use broadcaster::{helpers as ws_helpers, EventBroadcaster, PublishReport, Publisher};
pub use events::{ClientMessage, DomainEvent, ServerReply};
pub use registry::{ConnectionHandle, ConnectionId, ConnectionRegistry, SendFailure};
pub use session::{Session, SessionState};
pub use state::HubState;
