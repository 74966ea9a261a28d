//! Remote storage port (driven/secondary port)
//!
//! This module defines the listing, transfer and metadata contract that the
//! reconciliation engine consumes. The primary implementation targets Google
//! Drive, but nothing here is provider specific.
//!
//! ## Design Notes
//!
//! - Every operation returns `Result<T, RemoteError>` so callers branch on
//!   failure explicitly.
//! - Absence is not an error: missing items come back as `None`, `false` or
//!   an empty listing.
//! - Sessions are per user. [`IRemoteConnector`] turns a user into an
//!   authenticated [`IRemoteStorage`].

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    errors::RemoteError,
    newtypes::{RemoteId, RemoteParent, UserId},
};

/// Fallback page limit for non-positive requests other than `-1`
pub const DEFAULT_PAGE_LIMIT: usize = 20;

// ============================================================================
// Listing DTOs
// ============================================================================

/// Snapshot of a remote folder, valid only for the call that returned it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFolderRef {
    pub id: RemoteId,
    pub name: String,
    /// First parent reported by the provider (None for root-level shared items)
    pub parent_id: Option<RemoteId>,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Snapshot of a remote file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileRef {
    pub id: RemoteId,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: Option<u64>,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Metadata for a single remote item (file or folder)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    pub id: RemoteId,
    pub name: String,
    pub mime_type: String,
    pub is_folder: bool,
    pub parents: Vec<RemoteId>,
    pub size_bytes: Option<u64>,
    pub modified_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Query parameters
// ============================================================================

/// How many results a listing may return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLimit {
    /// Follow page tokens until the listing is exhausted
    Unbounded,
    /// Stop once this many results have been collected
    Max(usize),
}

impl PageLimit {
    /// Interprets a raw caller-supplied limit
    ///
    /// `-1` means unbounded, any other non-positive value falls back to
    /// [`DEFAULT_PAGE_LIMIT`], positive values are a cap.
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            -1 => PageLimit::Unbounded,
            n if n <= 0 => PageLimit::Max(DEFAULT_PAGE_LIMIT),
            n => PageLimit::Max(usize::try_from(n).unwrap_or(usize::MAX)),
        }
    }

    /// Returns true once `collected` results satisfy the limit
    pub fn is_satisfied(&self, collected: usize) -> bool {
        match self {
            PageLimit::Unbounded => false,
            PageLimit::Max(max) => collected >= *max,
        }
    }

    /// The cap, if any
    pub fn cap(&self) -> Option<usize> {
        match self {
            PageLimit::Unbounded => None,
            PageLimit::Max(max) => Some(*max),
        }
    }
}

impl Default for PageLimit {
    fn default() -> Self {
        PageLimit::Max(DEFAULT_PAGE_LIMIT)
    }
}

/// Result ordering for folder listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListOrder {
    /// Most recently modified first
    #[default]
    ModifiedDesc,
    /// Least recently modified first
    ModifiedAsc,
    /// Alphabetical by display name
    Name,
}

/// Parameters for [`IRemoteStorage::list_child_folders`]
///
/// # Example
///
/// ```
/// use folio_core::domain::RemoteParent;
/// use folio_core::ports::{FolderQuery, PageLimit};
///
/// // Search the whole drive for folders whose name contains "thesis"
/// let query = FolderQuery::new(RemoteParent::Any)
///     .with_name_filter("thesis")
///     .with_limit(PageLimit::Unbounded);
/// assert!(query.name_filter.is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderQuery {
    pub parent: RemoteParent,
    /// Case-insensitive substring filter on the display name
    pub name_filter: Option<String>,
    pub limit: PageLimit,
    pub order: ListOrder,
}

impl FolderQuery {
    /// Creates a query for the children of `parent` with default limit and order
    pub fn new(parent: RemoteParent) -> Self {
        Self {
            parent,
            ..Self::default()
        }
    }

    /// Sets the name filter; blank filters are ignored
    pub fn with_name_filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        let trimmed = filter.trim();
        self.name_filter = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    /// Sets the page limit
    pub fn with_limit(mut self, limit: PageLimit) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the result ordering
    pub fn with_order(mut self, order: ListOrder) -> Self {
        self.order = order;
        self
    }
}

/// Returns the distinct case variants used to work around case-sensitive
/// provider filters: original, lower, upper and title case.
pub fn case_variants(filter: &str) -> Vec<String> {
    let mut variants: Vec<String> = Vec::with_capacity(4);
    for candidate in [
        filter.to_string(),
        filter.to_lowercase(),
        filter.to_uppercase(),
        title_case(filter),
    ] {
        if !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphanumeric() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Case-insensitive substring match used as the final local filter
pub fn name_matches(name: &str, filter: &str) -> bool {
    name.to_lowercase().contains(&filter.to_lowercase())
}

// ============================================================================
// IRemoteStorage trait
// ============================================================================

/// Port trait for an authenticated remote storage session
///
/// ## Implementation Notes
///
/// - `list_child_files` is non-recursive; see [`list_files_recursive`].
/// - `download_file` must not leave a partial file at `dest` on failure.
/// - Implementations refresh credentials before the session is handed out;
///   methods assume a usable access token.
#[async_trait::async_trait]
pub trait IRemoteStorage: Send + Sync {
    /// Lists child folders of `query.parent`, honoring filter, limit and order
    async fn list_child_folders(
        &self,
        query: &FolderQuery,
    ) -> Result<Vec<RemoteFolderRef>, RemoteError>;

    /// Lists files directly inside `parent`, optionally restricted to one media type
    async fn list_child_files(
        &self,
        parent: &RemoteId,
        mime_filter: Option<&str>,
        limit: PageLimit,
    ) -> Result<Vec<RemoteFileRef>, RemoteError>;

    /// Creates a folder under `parent` (root when `None`) and returns its ID
    async fn create_folder(
        &self,
        name: &str,
        parent: Option<&RemoteId>,
    ) -> Result<RemoteId, RemoteError>;

    /// Deletes a folder; `false` if it did not exist
    async fn delete_folder(&self, id: &RemoteId) -> Result<bool, RemoteError>;

    /// Uploads a local file under `parent` and returns the new file ID
    ///
    /// `display_name` defaults to the local file name.
    async fn upload_file(
        &self,
        parent: &RemoteId,
        local_path: &Path,
        display_name: Option<&str>,
    ) -> Result<RemoteId, RemoteError>;

    /// Downloads a file's content to `dest`; `false` if the file does not exist
    async fn download_file(&self, id: &RemoteId, dest: &Path) -> Result<bool, RemoteError>;

    /// Deletes a file; `false` if it did not exist
    async fn delete_file(&self, id: &RemoteId) -> Result<bool, RemoteError>;

    /// Fetches item metadata; `None` if the item does not exist or is trashed
    async fn get_metadata(&self, id: &RemoteId) -> Result<Option<RemoteItem>, RemoteError>;
}

/// Opens per-user remote storage sessions
#[async_trait::async_trait]
pub trait IRemoteConnector: Send + Sync {
    /// Returns a session for `user`
    ///
    /// # Errors
    /// `RemoteError::NotConfigured` when the user has no stored credentials,
    /// `RemoteError::Unauthorized` when they cannot be refreshed.
    async fn connect(&self, user: &UserId) -> Result<Arc<dyn IRemoteStorage>, RemoteError>;
}

/// Lists every file below `root` by depth-first descent
///
/// Files of a folder come before the files of its subfolders, and
/// subfolders are visited in listing order. The hierarchy is assumed to be
/// acyclic.
pub async fn list_files_recursive(
    storage: &dyn IRemoteStorage,
    root: &RemoteId,
    mime_filter: Option<&str>,
) -> Result<Vec<RemoteFileRef>, RemoteError> {
    let mut files = Vec::new();
    let mut stack = vec![root.clone()];

    while let Some(folder) = stack.pop() {
        files.extend(
            storage
                .list_child_files(&folder, mime_filter, PageLimit::Unbounded)
                .await?,
        );

        let query = FolderQuery::new(RemoteParent::Id(folder))
            .with_limit(PageLimit::Unbounded)
            .with_order(ListOrder::Name);
        let children = storage.list_child_folders(&query).await?;
        stack.extend(children.into_iter().rev().map(|child| child.id));
    }

    Ok(files)
}
