//! Notification data models

use serde::{Deserialize, Serialize};

/// Opaque notification identifier, stable across fetches.
pub type NotificationId = String;

/// Semantic category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewListing,
    OrderUpdate,
    Promotion,
    Alert,
    /// Welcome messages and anything the backend adds later.
    #[serde(other)]
    System,
}

/// Informational priority, not used by cache logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Low,
    #[default]
    Normal,
    High,
}

/// A notification delivered to the current user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    #[serde(alias = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    /// Unix timestamp in seconds.
    pub created_at: i64,
    #[serde(default)]
    pub priority: NotificationPriority,
    /// Opaque payload (listing id, price, ...) passed through unmodified.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Notification {
    /// Create an unread notification with normal priority and no payload.
    pub fn new(
        id: impl Into<NotificationId>,
        kind: NotificationKind,
        title: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            message: None,
            is_read: false,
            created_at,
            priority: NotificationPriority::Normal,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_read(mut self, is_read: bool) -> Self {
        self.is_read = is_read;
        self
    }
}
