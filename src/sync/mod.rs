//! Keeps the notification hub in step with the remote store.
//!
//! The [`SyncScheduler`] owns the only path that replaces the cache
//! wholesale; the [`MutationCoordinator`] applies user intents
//! optimistically and rolls each one back on its own if the store rejects it.

mod coordinator;
mod mutation;
mod scheduler;

pub use coordinator::MutationCoordinator;
pub use mutation::MutationKind;
pub(crate) use mutation::PendingReads;
pub(crate) use scheduler::RefreshState;
pub use scheduler::{PollerHandle, RefreshOutcome, RefreshTrigger, SyncScheduler};

use std::time::Duration;

/// Timing knobs for polling and transport calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Period of the background refresh.
    pub poll_interval: Duration,
    /// Deadline for a single transport call.
    pub request_timeout: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
        }
    }
}
