//! User notifications module

mod cache;
mod center;
mod hub;
mod models;
mod snapshot;
mod subscription;

pub use cache::{CacheError, NotificationCache, RemovedNotification};
pub use center::{DriftReport, NotificationCenter};
pub use hub::NotificationHub;
pub(crate) use hub::Change;
pub use models::{Notification, NotificationId, NotificationKind, NotificationPriority};
pub use snapshot::{NotificationFilter, NotificationSnapshot};
pub use subscription::{Subscription, SubscriptionHandle};
