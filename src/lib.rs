//! Surplus marketplace notification sync engine.
//!
//! A client-held cache of user notifications kept consistent with the
//! remote notification store through periodic refresh, optimistic user
//! mutations and a shared subscription surface for UI consumers.

pub mod config;
pub mod error;
pub mod metrics;
pub mod notifications;
pub mod sync;
pub mod transport;

// Re-export commonly used types for convenience
pub use error::{ErrorKind, SyncError};
pub use notifications::{
    DriftReport, Notification, NotificationCenter, NotificationFilter, NotificationKind,
    NotificationPriority, NotificationSnapshot, Subscription, SubscriptionHandle,
};
pub use sync::{PollerHandle, RefreshOutcome, RefreshTrigger, SyncSettings};
pub use transport::{HttpTransport, NotificationTransport, TransportError, TransportErrorKind};
