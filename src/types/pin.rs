//! Pin snapshot carried by pin events

use serde::{Deserialize, Serialize};

/// Geotagged pin as seen by subscribed clients
///
/// The nullable fields are always serialized (as `null` when empty) so
/// clients can rely on every key being present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub id: i64,
    pub lat: f64,
    pub lng: f64,
    pub description: Option<String>,
    #[serde(default)]
    pub upvotes: i64,
    pub status_id: Option<i64>,
    /// Label of the resolved status, if any
    pub status: Option<String>,
    /// Public photo URLs
    #[serde(default)]
    pub photos: Vec<String>,
}

impl Pin {
    /// Create a pin with no description, status or photos
    pub fn new(id: i64, lat: f64, lng: f64) -> Self {
        Self {
            id,
            lat,
            lng,
            description: None,
            upvotes: 0,
            status_id: None,
            status: None,
            photos: Vec::new(),
        }
    }

    /// Attach a resolved status (id and label)
    pub fn with_status(mut self, status_id: i64, label: impl Into<String>) -> Self {
        self.status_id = Some(status_id);
        self.status = Some(label.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
