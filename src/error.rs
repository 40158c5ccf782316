//! Error kinds surfaced by the sync engine.

use serde::Serialize;
use thiserror::Error;

use crate::notifications::CacheError;
use crate::transport::{TransportError, TransportErrorKind};

/// Normalized error kind, carried by snapshots as the error indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Transient failure, safe to retry.
    NetworkFailure,
    /// The target no longer exists on the remote store.
    NotFound,
    /// Credentials were rejected.
    Unauthorized,
    /// Anything the transport could not classify.
    Unknown,
    /// An insert collided with a cached id.
    DuplicateKind,
}

impl ErrorKind {
    /// Whether retrying the same operation can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::NetworkFailure)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NetworkFailure => "network_failure",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Unknown => "unknown",
            ErrorKind::DuplicateKind => "duplicate",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<TransportErrorKind> for ErrorKind {
    fn from(kind: TransportErrorKind) -> Self {
        match kind {
            TransportErrorKind::NetworkFailure => ErrorKind::NetworkFailure,
            TransportErrorKind::NotFound => ErrorKind::NotFound,
            TransportErrorKind::Unauthorized => ErrorKind::Unauthorized,
            TransportErrorKind::Unknown => ErrorKind::Unknown,
        }
    }
}

/// Errors returned to callers of refresh and mutation requests.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Remote store error: {0}")]
    Unknown(String),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::NetworkFailure(_) => ErrorKind::NetworkFailure,
            SyncError::NotFound(_) => ErrorKind::NotFound,
            SyncError::Unauthorized(_) => ErrorKind::Unauthorized,
            SyncError::Unknown(_) => ErrorKind::Unknown,
            SyncError::Cache(_) => ErrorKind::DuplicateKind,
        }
    }
}

impl From<TransportError> for SyncError {
    fn from(err: TransportError) -> Self {
        match err.kind {
            TransportErrorKind::NetworkFailure => SyncError::NetworkFailure(err.message),
            TransportErrorKind::NotFound => SyncError::NotFound(err.message),
            TransportErrorKind::Unauthorized => SyncError::Unauthorized(err.message),
            TransportErrorKind::Unknown => SyncError::Unknown(err.message),
        }
    }
}
