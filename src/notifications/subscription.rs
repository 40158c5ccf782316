//! Subscriber bookkeeping for the notification hub.
//!
//! Each subscriber owns a bounded channel; the hub pushes one snapshot per
//! transition while holding its state lock, so every subscriber sees
//! transitions in the order they happened. A subscriber that stops
//! draining does not grow without limit: once its channel is full, newer
//! snapshots collapse into a single overflow slot holding the newest one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::hub::NotificationHub;
use super::snapshot::NotificationSnapshot;

/// Snapshots queued per subscriber before newer ones start collapsing.
pub(crate) const SUBSCRIBER_BUFFER: usize = 32;

type SnapshotSender = mpsc::Sender<Arc<NotificationSnapshot>>;
pub(crate) type SnapshotReceiver = mpsc::Receiver<Arc<NotificationSnapshot>>;

/// Newest snapshot that did not fit in a full channel.
#[derive(Default)]
pub(crate) struct Overflow {
    newest: Option<Arc<NotificationSnapshot>>,
    skipped: u64,
}

#[derive(Clone, Default)]
pub(crate) struct SharedOverflow(Arc<Mutex<Overflow>>);

impl SharedOverflow {
    fn lock(&self) -> MutexGuard<'_, Overflow> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take(&self) -> Option<Arc<NotificationSnapshot>> {
        self.lock().newest.take()
    }

    fn skipped(&self) -> u64 {
        self.lock().skipped
    }
}

struct Subscriber {
    sender: SnapshotSender,
    overflow: SharedOverflow,
}

impl Subscriber {
    /// Queue `snapshot`. Returns false once the receiving side is gone.
    fn deliver(&self, snapshot: &Arc<NotificationSnapshot>) -> bool {
        let mut overflow = self.overflow.lock();
        // Once the slot is in use, queueing behind it would reorder delivery
        if overflow.newest.is_none() {
            match self.sender.try_send(Arc::clone(snapshot)) {
                Ok(()) => return true,
                Err(TrySendError::Closed(_)) => return false,
                Err(TrySendError::Full(_)) => {}
            }
        }
        if overflow.newest.replace(Arc::clone(snapshot)).is_some() {
            overflow.skipped += 1;
        }
        !self.sender.is_closed()
    }
}

/// Active subscribers keyed by subscription id.
#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    next_id: u64,
    subscribers: HashMap<u64, Subscriber>,
}

impl SubscriberRegistry {
    /// Register a subscriber and queue `current` as its first delivery.
    pub(crate) fn register(
        &mut self,
        current: Arc<NotificationSnapshot>,
    ) -> (u64, SnapshotReceiver, SharedOverflow) {
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_BUFFER);
        let subscriber = Subscriber {
            sender,
            overflow: SharedOverflow::default(),
        };
        subscriber.deliver(&current);

        self.next_id += 1;
        let overflow = subscriber.overflow.clone();
        self.subscribers.insert(self.next_id, subscriber);
        (self.next_id, receiver, overflow)
    }

    pub(crate) fn unregister(&mut self, id: u64) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    /// Deliver to every subscriber, pruning closed channels.
    ///
    /// Returns the number of subscribers that were pruned.
    pub(crate) fn broadcast(&mut self, snapshot: &Arc<NotificationSnapshot>) -> usize {
        let before = self.subscribers.len();
        self.subscribers
            .retain(|_, subscriber| subscriber.deliver(snapshot));
        before - self.subscribers.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }
}

/// A live feed of snapshots from a [`NotificationHub`].
///
/// The first item is the state at subscription time; every later item
/// follows one cache transition. If the subscriber falls more than
/// 32 snapshots behind, intermediate snapshots are
/// skipped (see [`Subscription::lagged`]) but the newest one is always
/// delivered. Dropping the subscription unsubscribes.
pub struct Subscription {
    id: u64,
    receiver: SnapshotReceiver,
    overflow: SharedOverflow,
    hub: Weak<NotificationHub>,
    active: bool,
}

impl Subscription {
    pub(crate) fn new(
        id: u64,
        receiver: SnapshotReceiver,
        overflow: SharedOverflow,
        hub: Weak<NotificationHub>,
    ) -> Self {
        Self {
            id,
            receiver,
            overflow,
            hub,
            active: true,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Snapshots skipped so far because this subscriber fell behind.
    pub fn lagged(&self) -> u64 {
        self.overflow.skipped()
    }

    /// Wait for the next snapshot. `None` once unsubscribed or the hub is gone.
    pub async fn recv(&mut self) -> Option<Arc<NotificationSnapshot>> {
        if let Some(snapshot) = self.try_recv() {
            return Some(snapshot);
        }
        match self.receiver.recv().await {
            Some(snapshot) => Some(snapshot),
            None => self.overflow.take(),
        }
    }

    /// Take the next queued snapshot without waiting.
    ///
    /// The channel is drained before the overflow slot, which only ever
    /// holds a snapshot newer than everything queued.
    pub fn try_recv(&mut self) -> Option<Arc<NotificationSnapshot>> {
        match self.receiver.try_recv() {
            Ok(snapshot) => Some(snapshot),
            Err(_) => self.overflow.take(),
        }
    }

    /// Drain everything queued and keep only the newest snapshot.
    pub fn latest(&mut self) -> Option<Arc<NotificationSnapshot>> {
        let mut newest = None;
        while let Some(snapshot) = self.try_recv() {
            newest = Some(snapshot);
        }
        newest
    }

    /// Stop delivery. Calling this more than once is a no-op.
    pub fn unsubscribe(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.id);
        }
        self.receiver.close();
        while self.receiver.try_recv().is_ok() {}
        self.overflow.take();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Handle to a listener task started by [`NotificationHub::subscribe_with`].
pub struct SubscriptionHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    pub(crate) fn spawn<F>(mut subscription: Subscription, mut listener: F) -> Self
    where
        F: FnMut(&NotificationSnapshot) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    next = subscription.recv() => match next {
                        Some(snapshot) => listener(&snapshot),
                        None => break,
                    },
                }
            }
            subscription.unsubscribe();
        });

        Self { cancel, task }
    }

    /// Stop the listener. Idempotent.
    pub fn unsubscribe(&self) {
        self.cancel.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && !self.task.is_finished()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
