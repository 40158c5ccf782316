//! Test server lifecycle management
//!
//! Serves the notification REST API from an in-memory list so the HTTP
//! transport can be exercised end to end. Each test gets its own server.

#![allow(dead_code)]

use super::constants::TEST_TOKEN;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use surplus_notifications::Notification;
use tokio::net::TcpListener;

#[derive(Default)]
struct ServerState {
    notifications: Vec<Notification>,
    forced_status: Option<StatusCode>,
    wrap_list: bool,
}

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Deserialize)]
struct MarkReadBody {
    ids: Vec<String>,
}

/// Reject the request unless it carries the test token, or return the
/// status a test forced.
fn guard(state: &SharedState, headers: &HeaderMap) -> Option<Response> {
    let expected = format!("Bearer {}", TEST_TOKEN);
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        return Some(StatusCode::UNAUTHORIZED.into_response());
    }

    let forced = state.lock().unwrap().forced_status;
    forced.map(|status| (status, "forced failure").into_response())
}

async fn list(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    if let Some(rejection) = guard(&state, &headers) {
        return rejection;
    }
    let state = state.lock().unwrap();
    if state.wrap_list {
        Json(serde_json::json!({ "notifications": state.notifications })).into_response()
    } else {
        Json(state.notifications.clone()).into_response()
    }
}

async fn unread_count(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    if let Some(rejection) = guard(&state, &headers) {
        return rejection;
    }
    let count = state
        .lock()
        .unwrap()
        .notifications
        .iter()
        .filter(|n| !n.is_read)
        .count();
    Json(serde_json::json!({ "count": count })).into_response()
}

async fn mark_read(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<MarkReadBody>,
) -> Response {
    if let Some(rejection) = guard(&state, &headers) {
        return rejection;
    }
    let mut state = state.lock().unwrap();
    if body
        .ids
        .iter()
        .any(|id| !state.notifications.iter().any(|n| &n.id == id))
    {
        return StatusCode::NOT_FOUND.into_response();
    }
    for n in state.notifications.iter_mut() {
        if body.ids.contains(&n.id) {
            n.is_read = true;
        }
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn mark_all_read(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    if let Some(rejection) = guard(&state, &headers) {
        return rejection;
    }
    for n in state.lock().unwrap().notifications.iter_mut() {
        n.is_read = true;
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn remove(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Some(rejection) = guard(&state, &headers) {
        return rejection;
    }
    let mut state = state.lock().unwrap();
    let before = state.notifications.len();
    state.notifications.retain(|n| n.id != id);
    if state.notifications.len() == before {
        return StatusCode::NOT_FOUND.into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

/// Test server instance with its own notification list
///
/// When dropped, the server gracefully shuts down.
pub struct TestServer {
    /// Base URL for the transport (e.g., "http://127.0.0.1:12345/api")
    pub base_url: String,

    state: SharedState,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port
    pub async fn spawn(notifications: Vec<Notification>) -> Self {
        let state: SharedState = Arc::new(Mutex::new(ServerState {
            notifications,
            ..Default::default()
        }));

        let app = Router::new()
            .route("/api/notifications", get(list))
            .route("/api/notifications/unread-count", get(unread_count))
            .route("/api/notifications/read", post(mark_read))
            .route("/api/notifications/read-all", post(mark_all_read))
            .route("/api/notifications/{id}", delete(remove))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}/api", port),
            state,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Answer every request with `status` until cleared.
    pub fn force_status(&self, status: Option<StatusCode>) {
        self.state.lock().unwrap().forced_status = status;
    }

    /// Serve the list wrapped in `{"notifications": [...]}`.
    pub fn wrap_list(&self, wrap: bool) {
        self.state.lock().unwrap().wrap_list = wrap;
    }

    pub fn set_notifications(&self, notifications: Vec<Notification>) {
        self.state.lock().unwrap().notifications = notifications;
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.state.lock().unwrap().notifications.clone()
    }
}
