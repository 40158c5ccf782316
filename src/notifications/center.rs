//! Facade over the hub, the scheduler and the mutation coordinator.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::hub::{Change, NotificationHub};
use super::models::{Notification, NotificationId};
use super::snapshot::NotificationSnapshot;
use super::subscription::{Subscription, SubscriptionHandle};
use crate::error::SyncError;
use crate::sync::{
    MutationCoordinator, PollerHandle, RefreshOutcome, RefreshTrigger, SyncScheduler, SyncSettings,
};
use crate::transport::{with_deadline, NotificationTransport};

/// Result of comparing the cached unread count with the server's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DriftReport {
    pub local: usize,
    pub remote: usize,
    /// Whether a refresh was issued to resolve the drift.
    pub refreshed: bool,
}

impl DriftReport {
    pub fn has_drift(&self) -> bool {
        self.local != self.remote
    }
}

/// Entry point for UI code: one per signed-in session.
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Clone)]
pub struct NotificationCenter {
    hub: Arc<NotificationHub>,
    scheduler: Arc<SyncScheduler>,
    coordinator: Arc<MutationCoordinator>,
    transport: Arc<dyn NotificationTransport>,
    settings: SyncSettings,
}

impl NotificationCenter {
    pub fn new(transport: Arc<dyn NotificationTransport>, settings: SyncSettings) -> Self {
        let hub = NotificationHub::new();
        let scheduler = Arc::new(SyncScheduler::new(
            Arc::clone(&hub),
            Arc::clone(&transport),
            settings.request_timeout,
        ));
        let coordinator = Arc::new(MutationCoordinator::new(
            Arc::clone(&hub),
            Arc::clone(&transport),
            settings.request_timeout,
        ));

        Self {
            hub,
            scheduler,
            coordinator,
            transport,
            settings,
        }
    }

    pub fn hub(&self) -> &Arc<NotificationHub> {
        &self.hub
    }

    pub fn scheduler(&self) -> &Arc<SyncScheduler> {
        &self.scheduler
    }

    pub fn settings(&self) -> SyncSettings {
        self.settings
    }

    pub fn snapshot(&self) -> Arc<NotificationSnapshot> {
        self.hub.snapshot()
    }

    pub fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }

    pub fn subscribe_with<F>(&self, listener: F) -> SubscriptionHandle
    where
        F: FnMut(&NotificationSnapshot) + Send + 'static,
    {
        self.hub.subscribe_with(listener)
    }

    /// Refresh now, e.g. when the user opens the notification list.
    pub async fn refresh(&self) -> Result<RefreshOutcome, SyncError> {
        self.scheduler.refresh(RefreshTrigger::OnDemand).await
    }

    /// Start background polling at the configured interval.
    pub fn start_polling(&self, shutdown: &CancellationToken) -> PollerHandle {
        self.scheduler.start(self.settings.poll_interval, shutdown)
    }

    pub async fn request_mark_read(&self, ids: &[NotificationId]) -> Result<(), SyncError> {
        self.coordinator.mark_read(ids).await
    }

    pub async fn request_mark_all_read(&self) -> Result<(), SyncError> {
        self.coordinator.mark_all_read().await
    }

    pub async fn request_delete(&self, id: &str) -> Result<(), SyncError> {
        self.coordinator.delete(id).await
    }

    /// Add a notification that arrived out of band, e.g. from a push
    /// message. Rejected if the id is already cached.
    pub fn insert(&self, notification: Notification) -> Result<(), SyncError> {
        let id = notification.id.clone();
        let result = self.hub.update(|state| match state.cache.apply_insert(notification) {
            Ok(()) => Change::changed(Ok(())),
            Err(e) => Change::unchanged(Err(e)),
        });

        result.map_err(|e| {
            warn!(id = %id, "Ignoring notification insert: {}", e);
            SyncError::from(e)
        })
    }

    /// Compare the cached unread count against the server's and refresh
    /// if they disagree.
    pub async fn verify_unread_count(&self) -> Result<DriftReport, SyncError> {
        let remote = with_deadline(self.settings.request_timeout, self.transport.fetch_unread_count())
            .await?;
        let local = self.hub.read(|state| state.cache.unread_count());

        if local == remote {
            return Ok(DriftReport {
                local,
                remote,
                refreshed: false,
            });
        }

        info!(local, remote, "Unread count drifted from server, refreshing");
        self.scheduler.refresh(RefreshTrigger::OnDemand).await?;

        Ok(DriftReport {
            local,
            remote,
            refreshed: true,
        })
    }
}
