//! Pinmap Hub
//!
//! Real-time broadcast hub for a collaborative map-pinning service. Clients
//! connect over WebSocket, subscribe to a group by its slug, and receive that
//! group's state changes (pins, statuses, deletion) as the CRUD layer commits
//! them.
//!
//! # Features
//!
//! - **Topic routing**: every event goes only to the subscribers of its group
//! - **Non-blocking fan-out**: a slow or dead client never stalls the others
//! - **Ordered per connection**: one queue and one writer per socket
//! - **Injectable**: no global state; build as many hubs as you need
//!
//! # Modules
//!
//! - `types`: Payload snapshots (Pin, Status) and errors
//! - `api`: WebSocket hub (registry, router, broadcaster, session) and HTTP router
//! - `config`: Environment-driven configuration
//! - `utils`: Logging setup
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pinmap_hub::{DomainEvent, HubConfig, HubState, Publisher};
//!
//! #[tokio::main]
//! async fn main() -> pinmap_hub::HubResult<()> {
//!     let state = Arc::new(HubState::new(HubConfig::default()));
//!     let publisher = state.publisher();
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:5000").await?;
//!     tokio::spawn(pinmap_hub::serve(listener, Arc::clone(&state), std::future::pending()));
//!
//!     publisher.publish(&DomainEvent::GroupDeleted { slug: "demo".into() });
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use api::http::{create_router, serve};
pub use api::websocket::{
    ConnectionId, ConnectionRegistry, DomainEvent, EventBroadcaster, HubState, PublishReport,
    Publisher,
};
pub use config::HubConfig;
pub use types::{HubError, HubResult, Pin, Status};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
