//! Canonical in-memory notification collection.
//!
//! Every state transition goes through one of the methods below, each of
//! which keeps `unread_count` equal to the number of unread records and
//! every id unique. Methods are synchronous; callers serialize access.

use std::collections::HashSet;
use thiserror::Error;
use tracing::warn;

use super::models::{Notification, NotificationId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("Notification {0} is already cached")]
    Duplicate(NotificationId),
}

/// A record taken out by [`NotificationCache::apply_delete`], with the
/// position it occupied so it can be put back.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedNotification {
    pub notification: Notification,
    pub position: usize,
}

/// Notifications ordered newest first, plus the derived unread count.
#[derive(Debug, Clone, Default)]
pub struct NotificationCache {
    notifications: Vec<Notification>,
    unread_count: usize,
}

impl NotificationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn unread_count(&self) -> usize {
        self.unread_count
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.notifications.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Replace the whole collection with a server payload.
    ///
    /// Repeated ids keep their first occurrence. Returns how many records
    /// were dropped as duplicates.
    pub fn replace_all(&mut self, notifications: Vec<Notification>) -> usize {
        let mut seen = HashSet::with_capacity(notifications.len());
        let mut kept = Vec::with_capacity(notifications.len());
        let mut dropped = 0;

        for notification in notifications {
            if seen.insert(notification.id.clone()) {
                kept.push(notification);
            } else {
                warn!(id = %notification.id, "Dropping repeated notification id from payload");
                dropped += 1;
            }
        }

        // Stable: equal timestamps keep server order
        kept.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        self.unread_count = kept.iter().filter(|n| !n.is_read).count();
        self.notifications = kept;
        dropped
    }

    /// Mark the given ids read. Absent ids are ignored.
    ///
    /// Returns the ids that actually flipped from unread to read.
    pub fn apply_read(&mut self, ids: &[NotificationId]) -> Vec<NotificationId> {
        self.set_read_state(ids, true)
    }

    /// Inverse of [`Self::apply_read`], used to roll back a failed mutation.
    pub fn apply_unread(&mut self, ids: &[NotificationId]) -> Vec<NotificationId> {
        self.set_read_state(ids, false)
    }

    /// Mark everything read. Returns the ids that flipped.
    pub fn apply_read_all(&mut self) -> Vec<NotificationId> {
        let flipped: Vec<NotificationId> = self
            .notifications
            .iter_mut()
            .filter(|n| !n.is_read)
            .map(|n| {
                n.is_read = true;
                n.id.clone()
            })
            .collect();
        self.unread_count = 0;
        flipped
    }

    /// Remove a record. Returns it with its former position, or `None` if
    /// it was not cached.
    pub fn apply_delete(&mut self, id: &str) -> Option<RemovedNotification> {
        let position = self.notifications.iter().position(|n| n.id == id)?;
        let notification = self.notifications.remove(position);
        if !notification.is_read {
            self.unread_count -= 1;
        }
        Some(RemovedNotification {
            notification,
            position,
        })
    }

    /// Insert a record ahead of the next refresh, keeping newest-first order.
    pub fn apply_insert(&mut self, notification: Notification) -> Result<(), CacheError> {
        if self.contains(&notification.id) {
            return Err(CacheError::Duplicate(notification.id));
        }

        let position = self
            .notifications
            .iter()
            .position(|n| n.created_at < notification.created_at)
            .unwrap_or(self.notifications.len());
        self.insert_at(position, notification);
        Ok(())
    }

    /// Inverse of [`Self::apply_delete`]: put a record back where it was.
    pub fn restore(&mut self, removed: RemovedNotification) -> Result<(), CacheError> {
        if self.contains(&removed.notification.id) {
            return Err(CacheError::Duplicate(removed.notification.id));
        }

        let position = removed.position.min(self.notifications.len());
        self.insert_at(position, removed.notification);
        Ok(())
    }

    fn insert_at(&mut self, position: usize, notification: Notification) {
        if !notification.is_read {
            self.unread_count += 1;
        }
        self.notifications.insert(position, notification);
    }

    fn set_read_state(&mut self, ids: &[NotificationId], is_read: bool) -> Vec<NotificationId> {
        let targets: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut flipped = Vec::new();

        for notification in self.notifications.iter_mut() {
            if notification.is_read != is_read && targets.contains(notification.id.as_str()) {
                notification.is_read = is_read;
                flipped.push(notification.id.clone());
            }
        }

        if is_read {
            self.unread_count -= flipped.len();
        } else {
            self.unread_count += flipped.len();
        }
        flipped
    }
}
