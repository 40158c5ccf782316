//! Inverse commands captured by optimistic mutations, and the ledger of
//! read intents still waiting on the remote store.

use std::collections::HashMap;

use tracing::debug;

use crate::notifications::{NotificationCache, NotificationId, RemovedNotification};

/// User intents the coordinator knows how to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    MarkRead,
    MarkAllRead,
    Delete,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::MarkRead => "mark_read",
            MutationKind::MarkAllRead => "mark_all_read",
            MutationKind::Delete => "delete",
        }
    }
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What one mutation must do to revert its own optimistic effect.
///
/// Captured before the network call; it only references the records the
/// mutation itself touched, so concurrent mutations never undo each other.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Undo {
    Nothing,
    MarkUnread(Vec<NotificationId>),
    Restore(RemovedNotification),
}

impl Undo {
    pub(crate) fn mark_unread(flipped: Vec<NotificationId>) -> Self {
        if flipped.is_empty() {
            Undo::Nothing
        } else {
            Undo::MarkUnread(flipped)
        }
    }

    /// Drop ids another in-flight mutation has already confirmed read
    /// remotely; reverting those would contradict the store.
    pub(crate) fn without_confirmed(self, reads: &PendingReads) -> Self {
        match self {
            Undo::MarkUnread(ids) => Undo::mark_unread(
                ids.into_iter()
                    .filter(|id| !reads.is_confirmed(id))
                    .collect(),
            ),
            other => other,
        }
    }

    /// Revert the optimistic effect. Returns whether the cache changed.
    pub(crate) fn apply(self, cache: &mut NotificationCache) -> bool {
        match self {
            Undo::Nothing => false,
            Undo::MarkUnread(ids) => !cache.apply_unread(&ids).is_empty(),
            Undo::Restore(removed) => {
                let id = removed.notification.id.clone();
                match cache.restore(removed) {
                    Ok(()) => true,
                    Err(e) => {
                        // A refresh landed in between and already brought it back
                        debug!(id = %id, error = %e, "Skipping restore of deleted notification");
                        false
                    }
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct PendingRead {
    in_flight: usize,
    confirmed: bool,
}

/// Read intents whose transport call has not settled yet, keyed by id.
///
/// An entry lives while at least one mark-read touching that id is in
/// flight. Once any of them is confirmed, the others must not roll the
/// record back to unread.
#[derive(Debug, Default)]
pub(crate) struct PendingReads {
    entries: HashMap<NotificationId, PendingRead>,
}

impl PendingReads {
    pub(crate) fn begin(&mut self, ids: &[NotificationId]) {
        for id in ids {
            self.entries.entry(id.clone()).or_default().in_flight += 1;
        }
    }

    /// Record that the store marked `ids` read. With `all`, every id that
    /// currently has a read in flight is confirmed too.
    ///
    /// Returns the ids now known to be read remotely.
    pub(crate) fn confirm(&mut self, ids: &[NotificationId], all: bool) -> Vec<NotificationId> {
        let mut confirmed = ids.to_vec();
        if all {
            confirmed.extend(
                self.entries
                    .keys()
                    .filter(|id| !ids.contains(id))
                    .cloned(),
            );
        }
        for id in &confirmed {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.confirmed = true;
            }
        }
        confirmed
    }

    pub(crate) fn finish(&mut self, ids: &[NotificationId]) {
        for id in ids {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.in_flight = entry.in_flight.saturating_sub(1);
                if entry.in_flight == 0 {
                    self.entries.remove(id);
                }
            }
        }
    }

    pub(crate) fn is_confirmed(&self, id: &str) -> bool {
        self.entries.get(id).is_some_and(|entry| entry.confirmed)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
