//! Transport adapter abstraction for the remote notification store.
//!
//! The sync engine only talks to the remote store through the
//! [`NotificationTransport`] trait, so tests and alternative backends can
//! plug in without touching the cache logic.

mod error;
mod http;

pub use error::{TransportError, TransportErrorKind};
pub use http::HttpTransport;

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::notifications::{Notification, NotificationId};

/// Read/write operations against the authoritative notification store.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Fetch every notification visible to the current user.
    async fn fetch_all(&self) -> Result<Vec<Notification>, TransportError>;

    /// Fetch the server-side unread count.
    async fn fetch_unread_count(&self) -> Result<usize, TransportError>;

    /// Mark the given notifications as read.
    async fn mark_read(&self, ids: &[NotificationId]) -> Result<(), TransportError>;

    /// Mark every notification as read. All-or-nothing.
    async fn mark_all_read(&self) -> Result<(), TransportError>;

    /// Delete a single notification.
    async fn delete(&self, id: &str) -> Result<(), TransportError>;
}

/// Bound a transport call by `deadline`; expiry counts as a network failure.
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::timeout(deadline)),
    }
}
