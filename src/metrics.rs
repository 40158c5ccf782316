use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, IntCounter, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

use crate::sync::{MutationKind, RefreshTrigger};

/// Metric name prefix for all notification sync metrics
const PREFIX: &str = "surplus";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Refresh Metrics
    pub static ref NOTIFICATION_REFRESHES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_notification_refreshes_total"), "Total notification refreshes"),
        &["trigger", "outcome"]
    ).expect("Failed to create notification_refreshes_total metric");

    pub static ref NOTIFICATION_REFRESH_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_notification_refresh_duration_seconds"),
            "Notification refresh duration in seconds"
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["trigger"]
    ).expect("Failed to create notification_refresh_duration_seconds metric");

    pub static ref NOTIFICATION_STALE_RESPONSES_TOTAL: IntCounter = IntCounter::new(
        format!("{PREFIX}_notification_stale_responses_total"),
        "Refresh responses discarded because a newer refresh was issued"
    ).expect("Failed to create notification_stale_responses_total metric");

    // Mutation Metrics
    pub static ref NOTIFICATION_MUTATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_notification_mutations_total"), "Total notification mutations"),
        &["kind", "outcome"]
    ).expect("Failed to create notification_mutations_total metric");

    // Cache Metrics
    pub static ref NOTIFICATIONS_UNREAD: Gauge = Gauge::new(
        format!("{PREFIX}_notifications_unread"),
        "Unread notifications in the local cache"
    ).expect("Failed to create notifications_unread metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(NOTIFICATION_REFRESHES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(NOTIFICATION_REFRESH_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(NOTIFICATION_STALE_RESPONSES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(NOTIFICATION_MUTATIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(NOTIFICATIONS_UNREAD.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record a finished refresh. `outcome` is one of applied, discarded or failed.
pub fn record_refresh(trigger: RefreshTrigger, outcome: &str, duration: Duration) {
    let trigger = trigger.to_string();
    NOTIFICATION_REFRESHES_TOTAL
        .with_label_values(&[trigger.as_str(), outcome])
        .inc();

    NOTIFICATION_REFRESH_DURATION_SECONDS
        .with_label_values(&[trigger.as_str()])
        .observe(duration.as_secs_f64());

    if outcome == "discarded" {
        NOTIFICATION_STALE_RESPONSES_TOTAL.inc();
    }
}

/// Record how a mutation settled: confirmed, converged or rolled_back
pub fn record_mutation(kind: MutationKind, outcome: &str) {
    NOTIFICATION_MUTATIONS_TOTAL
        .with_label_values(&[kind.as_str(), outcome])
        .inc();
}

pub fn set_unread_count(count: usize) {
    NOTIFICATIONS_UNREAD.set(count as f64);
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
