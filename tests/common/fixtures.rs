//! Notification fixtures

#![allow(dead_code)]

use super::constants::*;
use super::fake_transport::FakeTransport;
use std::sync::Arc;
use std::time::Duration;
use surplus_notifications::{
    Notification, NotificationCenter, NotificationKind, NotificationTransport, SyncSettings,
};

pub fn notification(id: &str, kind: NotificationKind, created_at: i64, is_read: bool) -> Notification {
    Notification::new(id, kind, format!("Title of {}", id), created_at).with_read(is_read)
}

/// Four notifications, newest first, three of them unread.
pub fn fixture_notifications() -> Vec<Notification> {
    vec![
        notification(LISTING_ID, NotificationKind::NewListing, 1_700_000_400, false),
        notification(ORDER_ID, NotificationKind::OrderUpdate, 1_700_000_300, false),
        notification(PROMO_ID, NotificationKind::Promotion, 1_700_000_200, true),
        notification(ALERT_ID, NotificationKind::Alert, 1_700_000_100, false),
    ]
}

/// Short intervals so polling tests finish quickly.
pub fn test_settings() -> SyncSettings {
    SyncSettings {
        poll_interval: Duration::from_millis(20),
        request_timeout: Duration::from_secs(2),
    }
}

pub fn center(transport: &Arc<FakeTransport>) -> NotificationCenter {
    let transport: Arc<dyn NotificationTransport> = transport.clone();
    NotificationCenter::new(transport, test_settings())
}
