//! Credential store port (driven/secondary port)
//!
//! Remote provider credentials are stored per user. The serialized form
//! accepts the field names used by Google's authorized-user token JSON
//! (`token`, `expiry`) so exported tokens can be imported unchanged.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::newtypes::UserId;

/// OAuth credentials for the remote storage provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCredentials {
    /// Bearer token for API requests
    #[serde(alias = "token")]
    pub access_token: String,
    /// Token for obtaining new access tokens without user interaction
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// When the access token expires (None = unknown, treated as valid)
    #[serde(default, alias = "expiry")]
    pub expires_at: Option<DateTime<Utc>>,
    /// OAuth token endpoint used for refreshes
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl RemoteCredentials {
    /// Creates credentials holding only an access token
    pub fn with_access_token(token: impl Into<String>) -> Self {
        Self {
            access_token: token.into(),
            refresh_token: None,
            expires_at: None,
            token_uri: None,
            client_id: None,
            client_secret: None,
            scopes: Vec::new(),
        }
    }

    /// Returns true if the access token expires within `margin` of `now`
    pub fn expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => now + margin >= expires_at,
            None => false,
        }
    }

    /// Returns true if a refresh can be attempted
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some() && self.client_id.is_some()
    }
}

/// Port trait for per-user credential persistence
///
/// Uses `anyhow::Result` because storage errors are adapter-specific
/// (SQLite, OS keyring) and don't need domain-level classification.
#[async_trait::async_trait]
pub trait ICredentialStore: Send + Sync {
    /// Loads the user's credentials; `None` if none are stored
    async fn load_credentials(&self, user: &UserId) -> anyhow::Result<Option<RemoteCredentials>>;

    /// Stores (or replaces) the user's credentials
    async fn save_credentials(
        &self,
        user: &UserId,
        credentials: &RemoteCredentials,
    ) -> anyhow::Result<()>;

    /// Removes the user's credentials; `false` if none were stored
    async fn clear_credentials(&self, user: &UserId) -> anyhow::Result<bool>;
}
