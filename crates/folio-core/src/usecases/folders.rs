//! Folder management use case
//!
//! Creates, links, and deletes local folders together with their remote
//! counterparts. Remote side effects follow two different policies:
//!
//! - Creation is best-effort remotely: the local folder always exists
//!   afterwards, and a warning is attached when it could not be linked.
//! - Deletion is remote-first: if a linked remote folder cannot be deleted,
//!   nothing is deleted locally.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{
    newtypes::{DocumentId, FolderId, RemoteId, UserId},
    FolioError, LocalDocument, LocalFolder, RequestContext,
};
use crate::ports::{IDocumentStorage, IFolderStore, IRemoteConnector};

/// Attached to a created folder that could not be linked remotely
pub const LOCAL_ONLY_WARNING: &str =
    "Folder created locally only. Connect Google Drive to synchronize it.";

/// Name used when neither the caller nor the provider supplies one
pub const DEFAULT_REMOTE_FOLDER_NAME: &str = "Drive folder";

// ============================================================================
// Ownership lookups
// ============================================================================

/// Loads a folder owned by the caller
///
/// Folders owned by another user are reported as missing.
pub async fn owned_folder(
    store: &dyn IFolderStore,
    ctx: &RequestContext,
    id: &FolderId,
) -> Result<LocalFolder, FolioError> {
    match store.get_folder(id).await? {
        Some(folder) if folder.is_owned_by(ctx.user_id()) => Ok(folder),
        _ => Err(FolioError::NotFound(format!("folder {id}"))),
    }
}

/// Loads a document whose folder is owned by the caller, with that folder
pub async fn owned_document(
    store: &dyn IFolderStore,
    ctx: &RequestContext,
    id: &DocumentId,
) -> Result<(LocalDocument, LocalFolder), FolioError> {
    let not_found = || FolioError::NotFound(format!("document {id}"));
    let document = store.get_document(id).await?.ok_or_else(not_found)?;
    match store.get_folder(document.folder_id()).await? {
        Some(folder) if folder.is_owned_by(ctx.user_id()) => Ok((document, folder)),
        _ => Err(not_found()),
    }
}

// ============================================================================
// Result types
// ============================================================================

/// Folder listing entry
#[derive(Debug, Clone, Serialize)]
pub struct FolderSummary {
    pub id: FolderId,
    pub name: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub document_count: u64,
    pub remote_folder_id: Option<RemoteId>,
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl FolderSummary {
    /// Builds the summary of `folder`, counting its documents
    pub async fn load(store: &dyn IFolderStore, folder: &LocalFolder) -> anyhow::Result<Self> {
        Ok(Self {
            id: *folder.id(),
            name: folder.name().to_string(),
            user_id: folder.user_id().clone(),
            created_at: folder.created_at(),
            document_count: store.count_documents(folder.id()).await?,
            remote_folder_id: folder.remote_folder_id().cloned(),
            last_sync_at: folder.last_sync_at(),
        })
    }
}

/// Outcome of [`ManageFoldersUseCase::create_folder`]
#[derive(Debug, Clone)]
pub struct CreatedFolder {
    pub folder: LocalFolder,
    /// Set when the remote folder could not be created
    pub remote_warning: Option<String>,
}

/// Outcome of removing a folder and its documents locally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FolderPurge {
    pub documents_removed: usize,
    /// Stored files that could not be deleted from disk
    pub files_left_behind: usize,
}

/// Deletes every document of `folder` (files best-effort) and then the folder
pub async fn purge_folder(
    store: &dyn IFolderStore,
    storage: &dyn IDocumentStorage,
    folder: &FolderId,
) -> anyhow::Result<FolderPurge> {
    let mut purge = FolderPurge::default();
    for document in store.list_documents(folder).await? {
        if !matches!(storage.remove(document.file_path()).await, Ok(true)) {
            purge.files_left_behind += 1;
        }
        purge.documents_removed += 1;
    }
    store.delete_folder(folder).await?;
    Ok(purge)
}

// ============================================================================
// ManageFoldersUseCase
// ============================================================================

/// Use case for creating, linking and deleting folders
pub struct ManageFoldersUseCase {
    store: Arc<dyn IFolderStore>,
    storage: Arc<dyn IDocumentStorage>,
    connector: Arc<dyn IRemoteConnector>,
}

impl ManageFoldersUseCase {
    pub fn new(
        store: Arc<dyn IFolderStore>,
        storage: Arc<dyn IDocumentStorage>,
        connector: Arc<dyn IRemoteConnector>,
    ) -> Self {
        Self {
            store,
            storage,
            connector,
        }
    }

    /// Creates a folder, mirroring it remotely when possible
    ///
    /// # Errors
    /// `InvalidInput` for an empty or oversized name; remote failures only
    /// produce a warning
    pub async fn create_folder(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> Result<CreatedFolder, FolioError> {
        let mut folder = LocalFolder::new(ctx.user_id().clone(), name)?;

        let remote_id = match self.connector.connect(ctx.user_id()).await {
            Ok(remote) => remote.create_folder(folder.name(), None).await.ok(),
            Err(_) => None,
        };

        let remote_warning = match remote_id {
            Some(id) => {
                folder.link_remote(id);
                None
            }
            None => Some(LOCAL_ONLY_WARNING.to_string()),
        };

        self.store.save_folder(&folder).await?;
        Ok(CreatedFolder {
            folder,
            remote_warning,
        })
    }

    /// Deletes a folder and its documents
    ///
    /// A linked remote folder is deleted first; a remote folder that is
    /// already gone does not block the local deletion.
    ///
    /// # Errors
    /// `NotFound` if the folder is missing or not owned, `RemoteUnavailable`
    /// if the remote deletion fails (nothing is deleted locally)
    pub async fn delete_folder(
        &self,
        ctx: &RequestContext,
        id: &FolderId,
    ) -> Result<FolderPurge, FolioError> {
        let folder = owned_folder(self.store.as_ref(), ctx, id).await?;

        if let Some(remote_id) = folder.remote_folder_id() {
            let remote = self.connector.connect(ctx.user_id()).await?;
            remote.delete_folder(remote_id).await?;
        }

        let purge = purge_folder(self.store.as_ref(), self.storage.as_ref(), id).await?;
        Ok(purge)
    }

    /// Links an existing local folder to a remote folder
    ///
    /// # Errors
    /// `NotFound` if the folder is missing or not owned, `InvalidInput` if
    /// another of the user's folders already links `remote_id`
    pub async fn link_folder(
        &self,
        ctx: &RequestContext,
        id: &FolderId,
        remote_id: RemoteId,
    ) -> Result<LocalFolder, FolioError> {
        let mut folder = owned_folder(self.store.as_ref(), ctx, id).await?;

        if let Some(existing) = self
            .store
            .find_folder_by_remote(ctx.user_id(), &remote_id)
            .await?
        {
            if existing.id() != folder.id() {
                return Err(FolioError::InvalidInput(format!(
                    "remote folder {remote_id} is already linked to folder {}",
                    existing.id()
                )));
            }
        }

        folder.link_remote(remote_id);
        self.store.save_folder(&folder).await?;
        Ok(folder)
    }

    /// Creates a local folder linked to an existing remote folder
    ///
    /// Without a name, the remote folder's name is used. The remote item
    /// must be a folder; if its metadata cannot be fetched at all, the
    /// default name is used instead.
    ///
    /// # Errors
    /// `InvalidInput` if the remote item is not a folder or is already
    /// linked to another of the user's folders
    pub async fn create_folder_from_remote(
        &self,
        ctx: &RequestContext,
        remote_id: RemoteId,
        name: Option<&str>,
    ) -> Result<LocalFolder, FolioError> {
        if self
            .store
            .find_folder_by_remote(ctx.user_id(), &remote_id)
            .await?
            .is_some()
        {
            return Err(FolioError::InvalidInput(format!(
                "remote folder {remote_id} is already linked"
            )));
        }

        let requested = name.map(str::trim).filter(|n| !n.is_empty());
        let name = match requested {
            Some(name) => name.to_string(),
            None => self.remote_folder_name(ctx, &remote_id).await?,
        };

        let mut folder = LocalFolder::new(ctx.user_id().clone(), &name)?;
        folder.link_remote(remote_id);
        self.store.save_folder(&folder).await?;
        Ok(folder)
    }

    async fn remote_folder_name(
        &self,
        ctx: &RequestContext,
        remote_id: &RemoteId,
    ) -> Result<String, FolioError> {
        let remote = match self.connector.connect(ctx.user_id()).await {
            Ok(remote) => remote,
            Err(_) => return Ok(DEFAULT_REMOTE_FOLDER_NAME.to_string()),
        };
        match remote.get_metadata(remote_id).await {
            Ok(Some(item)) if item.is_folder => Ok(if item.name.trim().is_empty() {
                DEFAULT_REMOTE_FOLDER_NAME.to_string()
            } else {
                item.name
            }),
            Ok(_) => Err(FolioError::InvalidInput(format!(
                "{remote_id} is not a remote folder"
            ))),
            Err(_) => Ok(DEFAULT_REMOTE_FOLDER_NAME.to_string()),
        }
    }
}
