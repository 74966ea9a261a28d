//! Folder store port (driven/secondary port)
//!
//! This module defines the interface for persisting local folders and the
//! documents they contain.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   and don't need domain-level classification.
//! - Each write commits on its own; there is no multi-statement transaction
//!   in the port. Same-folder passes are serialized by the caller.
//! - Deleting a folder cascades to its documents. Physical files are the
//!   caller's responsibility.
//! - Implementations enforce the link invariants: a remote folder ID is
//!   linked by at most one folder per user, and a remote file ID by at most
//!   one document per folder. A violating write fails.

use crate::domain::{
    newtypes::{DocumentId, FolderId, RemoteId, UserId},
    LocalDocument, LocalFolder,
};

/// Port trait for folder and document persistence
#[async_trait::async_trait]
pub trait IFolderStore: Send + Sync {
    // --- Folder operations ---

    /// Saves a folder (insert or update)
    async fn save_folder(&self, folder: &LocalFolder) -> anyhow::Result<()>;

    /// Retrieves a folder by ID
    async fn get_folder(&self, id: &FolderId) -> anyhow::Result<Option<LocalFolder>>;

    /// Lists a user's folders ordered by creation time, then ID
    async fn list_folders(&self, user: &UserId) -> anyhow::Result<Vec<LocalFolder>>;

    /// Finds the user's folder linked to `remote_id`
    async fn find_folder_by_remote(
        &self,
        user: &UserId,
        remote_id: &RemoteId,
    ) -> anyhow::Result<Option<LocalFolder>>;

    /// Deletes a folder and its document records; `false` if it did not exist
    async fn delete_folder(&self, id: &FolderId) -> anyhow::Result<bool>;

    // --- Document operations ---

    /// Saves a document (insert or update)
    async fn save_document(&self, document: &LocalDocument) -> anyhow::Result<()>;

    /// Retrieves a document by ID
    async fn get_document(&self, id: &DocumentId) -> anyhow::Result<Option<LocalDocument>>;

    /// Lists a folder's documents ordered by upload time, then ID
    async fn list_documents(&self, folder: &FolderId) -> anyhow::Result<Vec<LocalDocument>>;

    /// Deletes a document record; `false` if it did not exist
    async fn delete_document(&self, id: &DocumentId) -> anyhow::Result<bool>;

    /// Counts a folder's documents
    async fn count_documents(&self, folder: &FolderId) -> anyhow::Result<u64>;
}
