//! Status snapshot carried by `statuses_changed` events

use serde::{Deserialize, Serialize};

/// A group's pin status (label plus hex color)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: i64,
    pub label: String,
    pub color: String,
}

impl Status {
    pub fn new(id: i64, label: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            color: color.into(),
        }
    }
}
