//! Immutable views handed to subscribers.

use serde::Serialize;

use super::models::{Notification, NotificationKind};
use crate::error::ErrorKind;

/// Filters offered by the full notification list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationFilter {
    All,
    Unread,
    Read,
    Kind(NotificationKind),
}

impl NotificationFilter {
    pub fn matches(&self, notification: &Notification) -> bool {
        match self {
            NotificationFilter::All => true,
            NotificationFilter::Unread => !notification.is_read,
            NotificationFilter::Read => notification.is_read,
            NotificationFilter::Kind(kind) => notification.kind == *kind,
        }
    }
}

/// Consistent state of the cache at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationSnapshot {
    /// Newest first.
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
    /// A refresh is in flight.
    pub loading: bool,
    /// Set by the last failed refresh or rolled back mutation.
    pub error: Option<ErrorKind>,
    /// Unix timestamp of the last applied refresh.
    pub last_synced_at: Option<i64>,
    /// Bumped on every published transition.
    pub version: u64,
}

impl NotificationSnapshot {
    pub fn empty() -> Self {
        Self {
            notifications: Vec::new(),
            unread_count: 0,
            loading: false,
            error: None,
            last_synced_at: None,
            version: 0,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.notifications.iter().find(|n| n.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    pub fn unread(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter().filter(|n| !n.is_read)
    }

    pub fn filter(&self, filter: NotificationFilter) -> Vec<&Notification> {
        self.notifications
            .iter()
            .filter(|n| filter.matches(n))
            .collect()
    }

    /// The `limit` most recent notifications, as shown by the summary bell.
    pub fn latest(&self, limit: usize) -> &[Notification] {
        &self.notifications[..limit.min(self.notifications.len())]
    }
}
