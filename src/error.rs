//! Error Types
//!
//! Defines the error taxonomy shared by the store, the remote API client,
//! the reconciliation engine, and the network cache layer.
//!
//! # Error Categories
//!
//! - `Network` - fetch failed or the server answered non-2xx
//! - `Storage` - local database unavailable or quota exceeded
//! - `NotFound` - entity absent from both the remote API and the local store
//! - `Validation` - malformed record rejected before any I/O
//!
//! # Thread Safety
//!
//! All error types are `Send + Sync` and can be safely shared across task
//! boundaries.

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, CeritaError>;

/// Errors produced by the offline-first core
#[derive(Debug, Error)]
pub enum CeritaError {
    /// Network request failed or returned a non-success status
    #[error("network error: {message}")]
    Network {
        /// Human-readable error message
        message: String,
    },

    /// Local database unavailable, corrupt, or out of quota
    #[error("storage error: {message}")]
    Storage {
        /// Human-readable error message
        message: String,
    },

    /// Entity missing from both the remote API and the local mirror
    #[error("story not found: {id}")]
    NotFound {
        /// The identifier that could not be resolved
        id: String,
    },

    /// Record rejected at a boundary before any I/O was attempted
    #[error("validation error in field '{field}': {message}")]
    Validation {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },
}

impl CeritaError {
    /// Create a new network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// True for failures a read path may recover from by serving local data
    pub fn is_degradable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Storage { .. })
    }
}

impl From<sqlx::Error> for CeritaError {
    fn from(err: sqlx::Error) -> Self {
        Self::storage(err.to_string())
    }
}

impl From<reqwest::Error> for CeritaError {
    fn from(err: reqwest::Error) -> Self {
        Self::network(err.to_string())
    }
}

impl From<serde_json::Error> for CeritaError {
    fn from(err: serde_json::Error) -> Self {
        Self::validation("json", err.to_string())
    }
}
