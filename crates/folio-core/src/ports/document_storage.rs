//! Document storage port (driven/secondary port)
//!
//! Physical PDF files live in a single upload directory under unique,
//! generated names. The original display name is kept on the record only.

use std::path::{Path, PathBuf};

use crate::domain::StoredFile;

/// A unique, not yet written location in the upload directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedPath {
    pub stored_name: String,
    pub path: PathBuf,
}

/// Port trait for physical document files
///
/// Uses `anyhow::Result` because filesystem errors are adapter-specific.
/// Removal is best-effort for callers: they log failures and carry on.
#[async_trait::async_trait]
pub trait IDocumentStorage: Send + Sync {
    /// Reserves a unique destination path; nothing is written yet
    fn reserve(&self) -> ReservedPath;

    /// Confirms a reserved path was written and returns its handle
    ///
    /// # Errors
    /// Fails if nothing exists at the reserved path.
    async fn commit(&self, reserved: ReservedPath) -> anyhow::Result<StoredFile>;

    /// Copies an external file into the upload directory
    async fn import_file(&self, source: &Path) -> anyhow::Result<StoredFile>;

    /// Size of a file in bytes; `None` if it does not exist
    async fn file_size(&self, path: &Path) -> anyhow::Result<Option<u64>>;

    /// Removes a stored file; `false` if it was already gone
    async fn remove(&self, path: &Path) -> anyhow::Result<bool>;
}
