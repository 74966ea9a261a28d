//! Folio Drive - Google Drive v3 adapter
//!
//! Provides:
//! - A typed REST client for the Drive v3 metadata and upload APIs
//! - The [`IRemoteStorage`](folio_core::ports::IRemoteStorage) implementation
//!   used by the reconciliation engine
//! - Per-user session opening with OAuth2 token refresh
//! - OS keyring credential storage
//!
//! ## Modules
//!
//! - [`auth`] - Token refresh and keyring credential storage
//! - [`client`] - Drive v3 HTTP client (listing, transfers, metadata)
//! - [`provider`] - Port implementations on top of the client
//! - [`query`] - Builders for the Drive `q` search language

pub mod auth;
pub mod client;
pub mod provider;
pub mod query;

use std::time::Duration;

use folio_core::domain::RemoteError;
use thiserror::Error;

pub use auth::{refresh_credentials, KeyringCredentialStore};
pub use client::{DriveClient, DriveFile};
pub use provider::{DriveConnector, DriveRemoteStorage};

/// Errors that can occur when talking to the Google Drive API
#[derive(Debug, Error)]
pub enum DriveError {
    /// The access token was rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The token lacks the scope or the caller lacks access
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The item does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit still exceeded after all retries
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Last advertised back-off
        retry_after: Duration,
    },

    /// Any other non-success status
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        message: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Reading the upload source or writing the download target failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The refresh token was rejected or the token endpoint failed
    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),
}

impl DriveError {
    /// Returns true if the provider reported the item as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, DriveError::NotFound(_))
    }
}

impl From<DriveError> for RemoteError {
    fn from(err: DriveError) -> Self {
        match err {
            DriveError::Unauthorized(msg) => RemoteError::Unauthorized(msg),
            DriveError::TokenRefresh(msg) => RemoteError::Unauthorized(msg),
            DriveError::Forbidden(message) => RemoteError::Server {
                status: 403,
                message,
            },
            DriveError::NotFound(message) => RemoteError::Server {
                status: 404,
                message,
            },
            DriveError::TooManyRequests { retry_after } => RemoteError::Server {
                status: 429,
                message: format!("rate limited, retry after {}s", retry_after.as_secs()),
            },
            DriveError::Status { status, message } => RemoteError::Server { status, message },
            DriveError::NetworkError(e) if e.is_decode() => {
                RemoteError::InvalidResponse(e.to_string())
            }
            DriveError::NetworkError(e) => RemoteError::Transport(e.to_string()),
            DriveError::InvalidResponse(msg) => RemoteError::InvalidResponse(msg),
            DriveError::Io(e) => RemoteError::Io(e.to_string()),
        }
    }
}
