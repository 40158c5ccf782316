//! HTTP client for the marketplace notification API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{NotificationTransport, TransportError, TransportErrorKind};
use crate::notifications::{Notification, NotificationId};

/// The list endpoint answers either with a bare array or a wrapped object.
#[derive(Deserialize)]
#[serde(untagged)]
enum NotificationsPayload {
    List(Vec<Notification>),
    Wrapped { notifications: Vec<Notification> },
}

#[derive(Deserialize)]
struct UnreadCountPayload {
    #[serde(alias = "unreadCount", alias = "unread_count")]
    count: usize,
}

#[derive(Serialize)]
struct MarkReadRequest<'a> {
    ids: &'a [NotificationId],
}

/// [`NotificationTransport`] backed by the marketplace REST API.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpTransport {
    /// Create a new HTTP transport.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the API (e.g., "https://api.example.org/api")
    /// * `timeout` - Per-request timeout
    /// * `auth_token` - Optional bearer token sent with every request
    pub fn new(base_url: String, timeout: Duration, auth_token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        // Ensure base_url doesn't have trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            auth_token,
        })
    }

    /// Get the base URL of the notification API.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, TransportError> {
        let response = builder.send().await.map_err(classify_reqwest_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), body = %body, "Notification API returned an error");
        Err(TransportError::new(
            kind_for_status(status),
            format!("status {}: {}", status.as_u16(), body),
        ))
    }
}

/// Map a non-success HTTP status onto the normalized error kind.
pub(crate) fn kind_for_status(status: StatusCode) -> TransportErrorKind {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TransportErrorKind::Unauthorized,
        StatusCode::NOT_FOUND | StatusCode::GONE => TransportErrorKind::NotFound,
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            TransportErrorKind::NetworkFailure
        }
        s if s.is_server_error() => TransportErrorKind::NetworkFailure,
        _ => TransportErrorKind::Unknown,
    }
}

/// Path of a single notification. Ids are opaque, so they are encoded to
/// stay one path segment.
fn notification_path(id: &str) -> String {
    format!("/notifications/{}", urlencoding::encode(id))
}

fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        TransportError::network(err.to_string())
    } else if err.is_decode() {
        TransportError::unknown(format!("Failed to parse response: {}", err))
    } else {
        TransportError::unknown(err.to_string())
    }
}

#[async_trait]
impl NotificationTransport for HttpTransport {
    async fn fetch_all(&self) -> Result<Vec<Notification>, TransportError> {
        let response = self
            .send(self.request(Method::GET, "/notifications"))
            .await?;
        let payload: NotificationsPayload =
            response.json().await.map_err(classify_reqwest_error)?;

        Ok(match payload {
            NotificationsPayload::List(list) => list,
            NotificationsPayload::Wrapped { notifications } => notifications,
        })
    }

    async fn fetch_unread_count(&self) -> Result<usize, TransportError> {
        let response = self
            .send(self.request(Method::GET, "/notifications/unread-count"))
            .await?;
        let payload: UnreadCountPayload =
            response.json().await.map_err(classify_reqwest_error)?;
        Ok(payload.count)
    }

    async fn mark_read(&self, ids: &[NotificationId]) -> Result<(), TransportError> {
        let builder = self
            .request(Method::POST, "/notifications/read")
            .json(&MarkReadRequest { ids });
        self.send(builder).await.map(|_| ())
    }

    async fn mark_all_read(&self) -> Result<(), TransportError> {
        self.send(self.request(Method::POST, "/notifications/read-all"))
            .await
            .map(|_| ())
    }

    async fn delete(&self, id: &str) -> Result<(), TransportError> {
        self.send(self.request(Method::DELETE, &notification_path(id)))
            .await
            .map(|_| ())
    }
}
