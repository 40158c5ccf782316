use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::mutation::{MutationKind, Undo};
use crate::error::{ErrorKind, SyncError};
use crate::metrics;
use crate::notifications::{Change, NotificationHub, NotificationId};
use crate::transport::{with_deadline, NotificationTransport, TransportError};

/// Applies user intents optimistically and reconciles them with the
/// remote store.
///
/// Each mutation updates the cache right away, then issues its transport
/// call. On failure only that mutation's own effect is reverted, so
/// concurrent mutations compose.
pub struct MutationCoordinator {
    hub: Arc<NotificationHub>,
    transport: Arc<dyn NotificationTransport>,
    request_timeout: Duration,
}

impl MutationCoordinator {
    pub fn new(
        hub: Arc<NotificationHub>,
        transport: Arc<dyn NotificationTransport>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            hub,
            transport,
            request_timeout,
        }
    }

    /// Mark each id read. Every id is an independent mutation: a failure
    /// reverts only that id. Returns the first failure, if any.
    pub async fn mark_read(&self, ids: &[NotificationId]) -> Result<(), SyncError> {
        let mut seen = HashSet::new();
        let unique: Vec<&NotificationId> = ids.iter().filter(|id| seen.insert(*id)).collect();

        let results = join_all(unique.into_iter().map(|id| self.mark_one_read(id))).await;
        results.into_iter().collect()
    }

    async fn mark_one_read(&self, id: &NotificationId) -> Result<(), SyncError> {
        let ids = std::slice::from_ref(id);
        let undo = self.hub.update(|state| {
            state.reads.begin(ids);
            let flipped = state.cache.apply_read(ids);
            Change::when(!flipped.is_empty(), Undo::mark_unread(flipped))
        });

        let intent = ReadIntent {
            ids: ids.to_vec(),
            all: false,
        };
        self.execute(MutationKind::MarkRead, id, undo, Some(intent), self.transport.mark_read(ids))
            .await
    }

    /// Mark everything read. All-or-nothing: a failure reverts every
    /// notification this call flipped.
    pub async fn mark_all_read(&self) -> Result<(), SyncError> {
        let (undo, intent) = self.hub.update(|state| {
            let flipped = state.cache.apply_read_all();
            state.reads.begin(&flipped);
            let intent = ReadIntent {
                ids: flipped.clone(),
                all: true,
            };
            Change::when(!flipped.is_empty(), (Undo::mark_unread(flipped), intent))
        });

        self.execute(MutationKind::MarkAllRead, "*", undo, Some(intent), self.transport.mark_all_read())
            .await
    }

    /// Delete one notification. A remote not-found counts as success.
    pub async fn delete(&self, id: &str) -> Result<(), SyncError> {
        let undo = self.hub.update(|state| match state.cache.apply_delete(id) {
            Some(removed) => Change::changed(Undo::Restore(removed)),
            None => Change::unchanged(Undo::Nothing),
        });

        self.execute(MutationKind::Delete, id, undo, None, self.transport.delete(id))
            .await
    }

    async fn execute<F>(
        &self,
        kind: MutationKind,
        subject: &str,
        undo: Undo,
        intent: Option<ReadIntent>,
        call: F,
    ) -> Result<(), SyncError>
    where
        F: Future<Output = Result<(), TransportError>>,
    {
        match with_deadline(self.request_timeout, call).await {
            Ok(()) => {
                debug!(mutation = %kind, subject, "Notification mutation confirmed");
                if let Some(intent) = intent {
                    // Re-assert read state another read's rollback may have undone
                    self.hub.update(|state| {
                        let confirmed = state.reads.confirm(&intent.ids, intent.all);
                        state.reads.finish(&intent.ids);
                        let flipped = state.cache.apply_read(&confirmed);
                        Change::when(!flipped.is_empty(), ())
                    });
                }
                metrics::record_mutation(kind, "confirmed");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                // The remote already converged on the desired state
                info!(mutation = %kind, subject, "Notification already gone remotely, keeping local change");
                if let Some(intent) = intent {
                    self.hub.update(|state| {
                        state.reads.finish(&intent.ids);
                        Change::unchanged(())
                    });
                }
                metrics::record_mutation(kind, "converged");
                Ok(())
            }
            Err(e) => {
                warn!(mutation = %kind, subject, error = %e, "Notification mutation failed, rolling back");
                let error_kind = ErrorKind::from(e.kind);
                self.hub.update(|state| {
                    let undo = undo.without_confirmed(&state.reads);
                    if let Some(intent) = &intent {
                        state.reads.finish(&intent.ids);
                    }
                    let reverted = undo.apply(&mut state.cache);
                    let flag_changed = state.error != Some(error_kind);
                    state.error = Some(error_kind);
                    Change::when(reverted || flag_changed, ())
                });
                metrics::record_mutation(kind, "rolled_back");
                Err(SyncError::from(e))
            }
        }
    }
}

/// Ids a read mutation registered in the pending-read ledger.
struct ReadIntent {
    ids: Vec<NotificationId>,
    all: bool,
}
