//! Remote storage port implementations for Google Drive
//!
//! - [`DriveRemoteStorage`] implements [`IRemoteStorage`] on top of a
//!   [`DriveClient`] holding one user's access token.
//! - [`DriveConnector`] implements [`IRemoteConnector`]: it loads the user's
//!   credentials, refreshes them when they are about to expire, persists the
//!   refreshed copy and hands out a session.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use chrono::{Duration, Utc};
use folio_core::config::DriveConfig;
use folio_core::domain::{RemoteError, RemoteId, UserId};
use folio_core::ports::{
    name_matches, FolderQuery, ICredentialStore, IRemoteConnector, IRemoteStorage, PageLimit,
    RemoteCredentials, RemoteFileRef, RemoteFolderRef, RemoteItem,
};
use tracing::{debug, info, warn};

use crate::auth::refresh_credentials;
use crate::client::{DriveClient, DriveFile};
use crate::query;

/// Credentials expiring within this window are refreshed before use
const REFRESH_MARGIN_SECS: i64 = 60;

/// Display name used when an upload has neither a name nor a file name
const FALLBACK_UPLOAD_NAME: &str = "file.pdf";

// ============================================================================
// Conversions
// ============================================================================

fn remote_id(raw: &str) -> Result<RemoteId, RemoteError> {
    RemoteId::new(raw).map_err(|e| RemoteError::InvalidResponse(e.to_string()))
}

fn folder_ref(file: DriveFile) -> Result<RemoteFolderRef, RemoteError> {
    Ok(RemoteFolderRef {
        id: remote_id(&file.id)?,
        parent_id: file.parents.first().map(|p| remote_id(p)).transpose()?,
        modified_at: file.modified_time,
        name: file.name,
    })
}

fn file_ref(file: DriveFile) -> Result<RemoteFileRef, RemoteError> {
    Ok(RemoteFileRef {
        id: remote_id(&file.id)?,
        size_bytes: file.size_bytes(),
        modified_at: file.modified_time,
        name: file.name,
        mime_type: file.mime_type,
    })
}

fn remote_item(file: DriveFile) -> Result<RemoteItem, RemoteError> {
    let parents = file
        .parents
        .iter()
        .map(|p| remote_id(p))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RemoteItem {
        id: remote_id(&file.id)?,
        is_folder: file.is_folder(),
        size_bytes: file.size_bytes(),
        modified_at: file.modified_time,
        parents,
        name: file.name,
        mime_type: file.mime_type,
    })
}

// ============================================================================
// DriveRemoteStorage
// ============================================================================

/// An authenticated Drive session for one user
pub struct DriveRemoteStorage {
    client: DriveClient,
}

impl DriveRemoteStorage {
    pub fn new(client: DriveClient) -> Self {
        Self { client }
    }

    /// Returns the underlying client
    pub fn client(&self) -> &DriveClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl IRemoteStorage for DriveRemoteStorage {
    /// Lists child folders
    ///
    /// A name filter is sent as one OR-ed `name contains` clause per case
    /// variant; results are deduplicated by ID and filtered again locally
    /// with a case-insensitive match.
    async fn list_child_folders(
        &self,
        query: &FolderQuery,
    ) -> Result<Vec<RemoteFolderRef>, RemoteError> {
        let filter = query.name_filter.as_deref();
        let q = query::folders_query(&query.parent, filter);

        let files = match self
            .client
            .list_files(&q, Some(query::order_by(query.order)), query.limit)
            .await
        {
            Ok(files) => files,
            Err(e) if e.is_not_found() => {
                debug!(parent = %query.parent, "Parent folder not found, empty listing");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut seen = HashSet::new();
        let mut folders = Vec::new();
        for file in files {
            if !seen.insert(file.id.clone()) {
                continue;
            }
            if let Some(filter) = filter {
                if !name_matches(&file.name, filter) {
                    continue;
                }
            }
            folders.push(folder_ref(file)?);
            if query.limit.is_satisfied(folders.len()) {
                break;
            }
        }

        debug!(
            parent = %query.parent,
            filter = filter.unwrap_or(""),
            count = folders.len(),
            "Listed remote folders"
        );
        Ok(folders)
    }

    async fn list_child_files(
        &self,
        parent: &RemoteId,
        mime_filter: Option<&str>,
        limit: PageLimit,
    ) -> Result<Vec<RemoteFileRef>, RemoteError> {
        let q = query::files_query(parent.as_str(), mime_filter);

        match self.client.list_files(&q, Some("name"), limit).await {
            Ok(files) => files.into_iter().map(file_ref).collect(),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_folder(
        &self,
        name: &str,
        parent: Option<&RemoteId>,
    ) -> Result<RemoteId, RemoteError> {
        let folder = self
            .client
            .create_folder(name, parent.map(RemoteId::as_str))
            .await?;
        remote_id(&folder.id)
    }

    async fn delete_folder(&self, id: &RemoteId) -> Result<bool, RemoteError> {
        Ok(self.client.delete(id.as_str()).await?)
    }

    async fn upload_file(
        &self,
        parent: &RemoteId,
        local_path: &Path,
        display_name: Option<&str>,
    ) -> Result<RemoteId, RemoteError> {
        let name = match display_name {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => local_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| FALLBACK_UPLOAD_NAME.to_string()),
        };

        let file = self
            .client
            .upload_file(parent.as_str(), local_path, &name)
            .await?;
        remote_id(&file.id)
    }

    async fn download_file(&self, id: &RemoteId, dest: &Path) -> Result<bool, RemoteError> {
        Ok(self.client.download_file(id.as_str(), dest).await?)
    }

    async fn delete_file(&self, id: &RemoteId) -> Result<bool, RemoteError> {
        Ok(self.client.delete(id.as_str()).await?)
    }

    async fn get_metadata(&self, id: &RemoteId) -> Result<Option<RemoteItem>, RemoteError> {
        match self.client.get_file(id.as_str()).await? {
            Some(file) if file.trashed => {
                debug!(id = %id, "Drive item is trashed");
                Ok(None)
            }
            Some(file) => Ok(Some(remote_item(file)?)),
            None => Ok(None),
        }
    }
}

// ============================================================================
// DriveConnector
// ============================================================================

/// Opens Drive sessions from stored per-user credentials
pub struct DriveConnector {
    credentials: Arc<dyn ICredentialStore>,
    config: DriveConfig,
}

impl DriveConnector {
    /// Creates a new connector
    ///
    /// # Arguments
    /// * `credentials` - Where user credentials are loaded from and refreshed copies saved to
    /// * `config` - Endpoint and paging settings
    pub fn new(credentials: Arc<dyn ICredentialStore>, config: DriveConfig) -> Self {
        Self {
            credentials,
            config,
        }
    }

    /// Loads the user's credentials, refreshing them if they are about to expire
    ///
    /// # Errors
    ///
    /// - `RemoteError::NotConfigured` if the user has no credentials
    /// - `RemoteError::Unauthorized` if the token is expired and cannot be refreshed
    pub async fn usable_credentials(&self, user: &UserId) -> Result<RemoteCredentials, RemoteError> {
        let stored = self
            .credentials
            .load_credentials(user)
            .await
            .map_err(|e| RemoteError::Io(format!("failed to load credentials: {e:#}")))?;
        let Some(credentials) = stored else {
            return Err(RemoteError::NotConfigured);
        };

        let now = Utc::now();
        if !credentials.expires_within(now, Duration::seconds(REFRESH_MARGIN_SECS)) {
            return Ok(credentials);
        }

        if !credentials.can_refresh() {
            if credentials.expires_within(now, Duration::zero()) {
                return Err(RemoteError::Unauthorized(
                    "access token expired and no refresh token is stored".to_string(),
                ));
            }
            return Ok(credentials);
        }

        let refreshed = refresh_credentials(&credentials, &self.config.token_uri).await?;
        if let Err(e) = self.credentials.save_credentials(user, &refreshed).await {
            warn!(user = %user, error = %e, "Failed to persist refreshed credentials");
        } else {
            info!(user = %user, "Persisted refreshed credentials");
        }
        Ok(refreshed)
    }
}

#[async_trait::async_trait]
impl IRemoteConnector for DriveConnector {
    async fn connect(&self, user: &UserId) -> Result<Arc<dyn IRemoteStorage>, RemoteError> {
        let credentials = self.usable_credentials(user).await?;

        let client = DriveClient::with_base_urls(
            credentials.access_token,
            &self.config.api_base_url,
            &self.config.upload_base_url,
        )
        .with_page_size(self.config.page_size);

        debug!(user = %user, "Opened Drive session");
        Ok(Arc::new(DriveRemoteStorage::new(client)))
    }
}
