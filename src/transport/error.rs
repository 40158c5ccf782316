use std::time::Duration;
use thiserror::Error;

/// Normalized classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    NetworkFailure,
    NotFound,
    Unauthorized,
    Unknown,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportErrorKind::NetworkFailure => write!(f, "Network failure"),
            TransportErrorKind::NotFound => write!(f, "Not found"),
            TransportErrorKind::Unauthorized => write!(f, "Unauthorized"),
            TransportErrorKind::Unknown => write!(f, "Unknown error"),
        }
    }
}

/// Error returned by a [`super::NotificationTransport`] call.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::NetworkFailure, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::NotFound, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Unauthorized, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Unknown, message)
    }

    /// A call that did not complete within its deadline.
    pub fn timeout(deadline: Duration) -> Self {
        Self::network(format!("Request timed out after {:?}", deadline))
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == TransportErrorKind::NotFound
    }
}
