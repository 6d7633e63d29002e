//! WebSocket message types for real-time map updates

use serde::{Deserialize, Serialize};

use crate::types::{Pin, Status};

/// Domain events that can be broadcast to subscribed clients
///
/// Every variant carries the slug of the group it targets; that slug is the
/// topic the event is routed to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// The group's status list changed (created, edited or deleted)
    StatusesChanged { slug: String, statuses: Vec<Status> },

    /// A new pin was dropped
    PinCreated { slug: String, pin: Pin },

    /// A pin received an upvote
    PinUpvoted { slug: String, id: i64, upvotes: i64 },

    /// A pin's status or description changed
    PinUpdated { slug: String, pin: Pin },

    /// Bulk refresh of every pin in the group
    PinsUpdated { slug: String, pins: Vec<Pin> },

    /// The group itself was deleted
    GroupDeleted { slug: String },
}

impl DomainEvent {
    /// Slug of the group this event targets
    pub fn slug(&self) -> &str {
        match self {
            Self::StatusesChanged { slug, .. }
            | Self::PinCreated { slug, .. }
            | Self::PinUpvoted { slug, .. }
            | Self::PinUpdated { slug, .. }
            | Self::PinsUpdated { slug, .. }
            | Self::GroupDeleted { slug } => slug,
        }
    }

    /// Wire name of the event (the `type` discriminator)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StatusesChanged { .. } => "statuses_changed",
            Self::PinCreated { .. } => "pin_created",
            Self::PinUpvoted { .. } => "pin_upvoted",
            Self::PinUpdated { .. } => "pin_updated",
            Self::PinsUpdated { .. } => "pins_updated",
            Self::GroupDeleted { .. } => "group_deleted",
        }
    }

    /// Serialize into a text frame
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Control messages sent by clients
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to a group's updates; replaces any previous subscription
    Subscribe {
        #[serde(default, deserialize_with = "slug_from_scalar")]
        slug: String,
    },

    /// Application-level heartbeat
    Ping,
}

impl ClientMessage {
    /// Parse a text frame, returning None for anything unrecognised
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}

/// Accept any JSON scalar as a slug
///
/// Falsy values (`null`, `false`, `0`, `""`, `[]`, `{}`) become the empty
/// topic; other scalars take their textual form. Non-empty arrays and objects
/// make the frame malformed.
fn slug_from_scalar<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde_json::Value;

    match Value::deserialize(deserializer)? {
        Value::Null | Value::Bool(false) => Ok(String::new()),
        Value::Bool(true) => Ok("True".to_string()),
        Value::String(s) => Ok(s),
        Value::Number(n) if n.as_f64() == Some(0.0) => Ok(String::new()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Array(items) if items.is_empty() => Ok(String::new()),
        Value::Object(map) if map.is_empty() => Ok(String::new()),
        other => Err(D::Error::custom(format!("slug must be a scalar, got {other}"))),
    }
}

/// Direct replies to a client's control messages
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerReply {
    Subscribed { slug: String },
    Pong,
}

impl ServerReply {
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
