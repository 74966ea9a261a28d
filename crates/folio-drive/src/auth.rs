//! Credential handling for Google Drive
//!
//! - [`refresh_credentials`] - Exchanges a refresh token for a new access token
//! - [`KeyringCredentialStore`] - Per-user credentials in the system keyring
//!
//! The interactive consent flow is not handled here: credentials are
//! imported from an existing authorized-user token file.

use anyhow::Context;
use chrono::{Duration, Utc};
use folio_core::domain::UserId;
use folio_core::ports::{ICredentialStore, RemoteCredentials};
use oauth2::{
    basic::BasicClient, AuthType, ClientId, ClientSecret, RefreshToken, TokenResponse, TokenUrl,
};
use tracing::{debug, info};

use crate::DriveError;

/// Service name under which keyring entries are created
pub const KEYRING_SERVICE: &str = "folio";

/// Lifetime assumed when the token endpoint omits `expires_in`
const FALLBACK_TOKEN_LIFETIME_SECS: i64 = 3600;

// ============================================================================
// Token refresh
// ============================================================================

/// Refreshes an access token using the stored refresh token
///
/// The token endpoint recorded in the credentials wins over
/// `default_token_uri`. If the response carries no new refresh token the
/// old one is kept.
///
/// # Errors
///
/// Returns `DriveError::TokenRefresh` if the credentials cannot be
/// refreshed or the endpoint rejects the exchange.
pub async fn refresh_credentials(
    credentials: &RemoteCredentials,
    default_token_uri: &str,
) -> Result<RemoteCredentials, DriveError> {
    let refresh_token = credentials
        .refresh_token
        .as_deref()
        .ok_or_else(|| DriveError::TokenRefresh("no refresh token stored".to_string()))?;
    let client_id = credentials
        .client_id
        .as_deref()
        .ok_or_else(|| DriveError::TokenRefresh("no client ID stored".to_string()))?;
    let token_uri = credentials.token_uri.as_deref().unwrap_or(default_token_uri);

    let token_url = TokenUrl::new(token_uri.to_string())
        .map_err(|e| DriveError::TokenRefresh(format!("invalid token endpoint {token_uri}: {e}")))?;

    let mut client = BasicClient::new(ClientId::new(client_id.to_string()))
        .set_token_uri(token_url)
        .set_auth_type(AuthType::RequestBody);
    if let Some(secret) = &credentials.client_secret {
        client = client.set_client_secret(ClientSecret::new(secret.clone()));
    }

    info!(token_uri, "Refreshing access token");

    // Following redirects on the token endpoint is refused
    let http_client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    let token_result = client
        .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
        .request_async(&http_client)
        .await
        .map_err(|e| DriveError::TokenRefresh(e.to_string()))?;

    let expires_at = token_result
        .expires_in()
        .and_then(|d| Duration::from_std(d).ok())
        .map(|d| Utc::now() + d)
        .unwrap_or_else(|| Utc::now() + Duration::seconds(FALLBACK_TOKEN_LIFETIME_SECS));

    let refreshed = RemoteCredentials {
        access_token: token_result.access_token().secret().to_string(),
        refresh_token: token_result
            .refresh_token()
            .map(|t| t.secret().to_string())
            .or_else(|| Some(refresh_token.to_string())),
        expires_at: Some(expires_at),
        token_uri: Some(token_uri.to_string()),
        client_id: credentials.client_id.clone(),
        client_secret: credentials.client_secret.clone(),
        scopes: credentials.scopes.clone(),
    };

    info!(%expires_at, "Successfully refreshed access token");
    Ok(refreshed)
}

// ============================================================================
// KeyringCredentialStore
// ============================================================================

/// Stores per-user credentials in the system keyring
///
/// Credentials are serialized as JSON under the service name `folio` with
/// the user ID as the keyring username. Keyring calls block, so they run on
/// the blocking thread pool.
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service: String,
}

impl KeyringCredentialStore {
    pub fn new() -> Self {
        Self::with_service(KEYRING_SERVICE)
    }

    /// Uses a custom keyring service name
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(service: &str, user: &str) -> anyhow::Result<keyring::Entry> {
        keyring::Entry::new(service, user).context("Failed to create keyring entry")
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ICredentialStore for KeyringCredentialStore {
    async fn load_credentials(&self, user: &UserId) -> anyhow::Result<Option<RemoteCredentials>> {
        let service = self.service.clone();
        let username = user.as_str().to_string();

        tokio::task::spawn_blocking(move || -> anyhow::Result<Option<RemoteCredentials>> {
            let entry = Self::entry(&service, &username)?;
            match entry.get_password() {
                Ok(json) => {
                    let credentials: RemoteCredentials = serde_json::from_str(&json)
                        .context("Failed to deserialize credentials from keyring")?;
                    debug!(user = %username, "Loaded credentials from keyring");
                    Ok(Some(credentials))
                }
                Err(keyring::Error::NoEntry) => {
                    debug!(user = %username, "No credentials found in keyring");
                    Ok(None)
                }
                Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
            }
        })
        .await
        .context("Keyring task failed")?
    }

    async fn save_credentials(
        &self,
        user: &UserId,
        credentials: &RemoteCredentials,
    ) -> anyhow::Result<()> {
        let service = self.service.clone();
        let username = user.as_str().to_string();
        let json = serde_json::to_string(credentials).context("Failed to serialize credentials")?;

        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let entry = Self::entry(&service, &username)?;
            entry
                .set_password(&json)
                .context("Failed to store credentials in keyring")?;
            debug!(user = %username, "Stored credentials in keyring");
            Ok(())
        })
        .await
        .context("Keyring task failed")?
    }

    async fn clear_credentials(&self, user: &UserId) -> anyhow::Result<bool> {
        let service = self.service.clone();
        let username = user.as_str().to_string();

        tokio::task::spawn_blocking(move || -> anyhow::Result<bool> {
            let entry = Self::entry(&service, &username)?;
            match entry.delete_credential() {
                Ok(()) => {
                    info!(user = %username, "Cleared credentials from keyring");
                    Ok(true)
                }
                Err(keyring::Error::NoEntry) => Ok(false),
                Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
            }
        })
        .await
        .context("Keyring task failed")?
    }
}
