//! Common test infrastructure
//!
//! This module provides the fixtures shared by the integration tests:
//! an in-memory [`FakeTransport`] for driving the sync engine directly and a
//! [`TestServer`] speaking the notification REST API for the HTTP transport.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{fixture_notifications, FakeTransport};
//!
//! #[tokio::test]
//! async fn test_refresh() {
//!     let transport = FakeTransport::with_notifications(fixture_notifications());
//!     let center = common::center(&transport);
//!     center.refresh().await.unwrap();
//! }
//! ```

mod constants;
mod fake_transport;
mod fixtures;
mod server;

// Public API - this is what tests import
#[allow(unused_imports)]
pub use constants::*;
#[allow(unused_imports)]
pub use fake_transport::{FakeTransport, FetchGate, TransportCall};
#[allow(unused_imports)]
pub use fixtures::{center, fixture_notifications, notification, test_settings};
#[allow(unused_imports)]
pub use server::TestServer;

use std::time::Duration;

/// Poll `condition` until it holds or two seconds pass. Returns whether it held.
#[allow(dead_code)]
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
