//! Shared constants for integration tests
//!
//! When fixture data changes, update only this file.

#![allow(dead_code)]

/// Newest fixture notification, unread
pub const LISTING_ID: &str = "n-listing";

/// Unread order update
pub const ORDER_ID: &str = "n-order";

/// Already read promotion
pub const PROMO_ID: &str = "n-promo";

/// Oldest fixture notification, unread
pub const ALERT_ID: &str = "n-alert";

/// Unread notifications in the fixture set
pub const FIXTURE_UNREAD: usize = 3;

/// Bearer token accepted by the test server
pub const TEST_TOKEN: &str = "test-token";
