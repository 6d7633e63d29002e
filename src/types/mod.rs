//! Data types shared across the hub
//!
//! Payload snapshots (pins, statuses) are produced by the CRUD layer and only
//! carried through the hub; the hub never queries storage for them.

mod error;
mod pin;
mod status;

pub use error::{HubError, HubResult};
pub use pin::Pin;
pub use status::Status;

/// Routing key: a group's slug
pub type Topic = String;
