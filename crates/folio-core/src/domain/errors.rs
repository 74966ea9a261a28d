//! Domain error types
//!
//! This module defines the error taxonomy shared by every Folio crate:
//! validation failures raised by domain constructors, typed failures coming
//! back from the remote storage provider, and the request-level errors the
//! front ends map onto user-facing responses.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Invalid or empty user identifier
    #[error("Invalid user ID: {0}")]
    InvalidUserId(String),

    /// Invalid folder or document name
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Failures reported by a remote storage provider
///
/// "Not found" is deliberately absent: remote operations report absence as
/// `None`, `false` or an empty listing instead of an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The user has no stored provider credentials
    #[error("Remote storage is not configured for this user")]
    NotConfigured,

    /// Credentials were rejected or could not be refreshed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Connection, DNS or timeout failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider answered with an unexpected status
    #[error("Provider returned HTTP {status}: {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// The provider response could not be parsed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Reading or writing the local side of a transfer failed
    #[error("Local I/O error during transfer: {0}")]
    Io(String),
}

impl RemoteError {
    /// Returns true for failures that may succeed when retried
    /// (transport errors, rate limiting and 5xx responses)
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Transport(_) => true,
            RemoteError::Server { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Request-level error taxonomy surfaced by use cases and services
#[derive(Debug, Error)]
pub enum FolioError {
    /// No valid session for the request
    #[error("Not authenticated")]
    Unauthenticated,

    /// A folder, document or remote object does not exist (or is not owned by the caller)
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request was well-formed but not acceptable
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Transport or credential failure talking to the remote provider
    #[error("Remote storage unavailable: {0}")]
    RemoteUnavailable(#[from] RemoteError),

    /// Physical file write or delete failure
    #[error("Local I/O failure: {0}")]
    LocalIo(#[from] std::io::Error),

    /// Persisted store failure
    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl From<DomainError> for FolioError {
    fn from(e: DomainError) -> Self {
        FolioError::InvalidInput(e.to_string())
    }
}

impl FolioError {
    /// Stable machine-readable kind, used by the JSON output of the CLI
    pub fn kind(&self) -> &'static str {
        match self {
            FolioError::Unauthenticated => "unauthenticated",
            FolioError::NotFound(_) => "not_found",
            FolioError::InvalidInput(_) => "invalid_input",
            FolioError::RemoteUnavailable(_) => "remote_unavailable",
            FolioError::LocalIo(_) => "local_io",
            FolioError::Storage(_) => "storage",
        }
    }
}
