//! Owned state container shared by the scheduler, the coordinator and
//! every subscriber.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use super::cache::NotificationCache;
use super::snapshot::NotificationSnapshot;
use super::subscription::{SubscriberRegistry, Subscription, SubscriptionHandle};
use crate::error::ErrorKind;
use crate::metrics;
use crate::sync::{PendingReads, RefreshState};

/// Everything a transition may touch.
#[derive(Default)]
pub(crate) struct SyncState {
    pub(crate) cache: NotificationCache,
    pub(crate) refresh: RefreshState,
    pub(crate) error: Option<ErrorKind>,
    pub(crate) reads: PendingReads,
}

impl SyncState {
    fn capture(&self, version: u64) -> NotificationSnapshot {
        NotificationSnapshot {
            notifications: self.cache.notifications().to_vec(),
            unread_count: self.cache.unread_count(),
            loading: self.refresh.is_loading(),
            error: self.error,
            last_synced_at: self.refresh.last_synced_at(),
            version,
        }
    }
}

/// Result of a transition closure: its value and whether state changed.
pub(crate) struct Change<R> {
    value: R,
    changed: bool,
}

impl<R> Change<R> {
    pub(crate) fn changed(value: R) -> Self {
        Self {
            value,
            changed: true,
        }
    }

    pub(crate) fn unchanged(value: R) -> Self {
        Self {
            value,
            changed: false,
        }
    }

    pub(crate) fn when(changed: bool, value: R) -> Self {
        Self { value, changed }
    }
}

struct HubInner {
    state: SyncState,
    version: u64,
    latest: Arc<NotificationSnapshot>,
    subscribers: SubscriberRegistry,
}

impl HubInner {
    fn publish(&mut self) {
        self.version += 1;
        let snapshot = Arc::new(self.state.capture(self.version));
        self.latest = Arc::clone(&snapshot);

        let pruned = self.subscribers.broadcast(&snapshot);
        if pruned > 0 {
            trace!(pruned, "Pruned closed notification subscribers");
        }
        metrics::set_unread_count(snapshot.unread_count);
    }
}

/// The session's notification state.
///
/// Writers go through [`NotificationHub::update`], which runs one
/// synchronous transition under the lock and publishes the resulting
/// snapshot before releasing it. Nothing awaits while the lock is held.
pub struct NotificationHub {
    inner: Mutex<HubInner>,
}

impl NotificationHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(HubInner {
                state: SyncState::default(),
                version: 0,
                latest: Arc::new(NotificationSnapshot::empty()),
                subscribers: SubscriberRegistry::default(),
            }),
        })
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<NotificationSnapshot> {
        Arc::clone(&self.lock().latest)
    }

    /// Subscribe to snapshots; the current one is delivered first.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let mut inner = self.lock();
        let current = Arc::clone(&inner.latest);
        let (id, receiver, overflow) = inner.subscribers.register(current);
        Subscription::new(id, receiver, overflow, Arc::downgrade(self))
    }

    /// Run `listener` on a task for every snapshot, starting with the current one.
    pub fn subscribe_with<F>(self: &Arc<Self>, listener: F) -> SubscriptionHandle
    where
        F: FnMut(&NotificationSnapshot) + Send + 'static,
    {
        SubscriptionHandle::spawn(self.subscribe(), listener)
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    pub(crate) fn unsubscribe(&self, id: u64) -> bool {
        self.lock().subscribers.unregister(id)
    }

    /// Apply one atomic transition, publishing a snapshot if it changed state.
    pub(crate) fn update<R>(&self, transition: impl FnOnce(&mut SyncState) -> Change<R>) -> R {
        let mut inner = self.lock();
        let Change { value, changed } = transition(&mut inner.state);
        if changed {
            inner.publish();
        }
        value
    }

    /// Read state without publishing.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&SyncState) -> R) -> R {
        f(&self.lock().state)
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
