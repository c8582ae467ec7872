//! Sync Error Types
//!
//! This module defines the error taxonomy shared by every component of the
//! sync core: cache, offline queue, API client, network monitor and realtime
//! channel.
//!
//! # Error Categories
//!
//! - `Network` - transient failure, no response received. Read paths fall back
//!   to the cache and write paths enqueue.
//! - `Http` - the server answered with a non-success status. A 401 is handled
//!   by the API client's refresh protocol; everything else passes through.
//! - `RefreshFailed` - the refresh token was rejected. Auth state is already
//!   cleared when this surfaces; the UI must ask the user to sign in again.
//! - `Storage` / `Serialization` - durable storage problems.
//! - `Socket` - realtime transport failures.
//!
//! # Usage
//!
//! ```rust
//! use vitalsync::shared::error::SyncError;
//!
//! let error = SyncError::http(404, "Student not found");
//! assert!(!error.is_transient());
//! ```
use thiserror::Error;

use crate::shared::config::ConfigError;

/// Result alias used throughout the crate
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors produced by the sync core
#[derive(Debug, Error)]
pub enum SyncError {
    /// No response was received (connect failure, timeout, DNS, reset)
    #[error("Network error: {message}")]
    Network {
        /// Human-readable error message
        message: String,
    },

    /// The server answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// `message` field of the error body, or the status reason
        message: String,
    },

    /// Token refresh was attempted and failed; auth state has been cleared
    #[error("Session expired: {0}")]
    RefreshFailed(Box<SyncError>),

    /// Durable storage failure
    #[error("Storage error: {message}")]
    Storage {
        /// Human-readable error message
        message: String,
    },

    /// JSON serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Realtime socket failure
    #[error("Socket error: {message}")]
    Socket {
        /// Human-readable error message
        message: String,
    },

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SyncError {
    /// Create a transient network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a socket error
    pub fn socket(message: impl Into<String>) -> Self {
        Self::Socket {
            message: message.into(),
        }
    }

    /// Whether the failure happened before any response arrived
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Whether the server rejected the credentials
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }

    /// Whether the user has to authenticate again
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::RefreshFailed(_))
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::RefreshFailed(inner) => inner.status(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::http(status.as_u16(), err.to_string()),
            None if err.is_decode() => Self::network(format!("Malformed response: {}", err)),
            None => Self::network(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        Self::storage(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SyncError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::socket(err.to_string())
    }
}
