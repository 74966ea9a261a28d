//! Remote browsing use case
//!
//! Lets a user pick a remote folder before linking or importing it. The
//! listing policy is:
//!
//! - A non-empty search term always searches the whole drive (`Any`) with
//!   no limit, so matches are found even outside the recent folders.
//! - Without a search term the caller's limit applies (default from config),
//!   `"all"` or `-1` meaning unbounded.
//! - An unscoped search without a term returns nothing rather than listing
//!   the entire drive.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::{newtypes::RemoteId, FolioError, RemoteParent, RequestContext, PDF_MIME_TYPE};
use crate::ports::{
    list_files_recursive, FolderQuery, IRemoteConnector, PageLimit, RemoteFileRef,
    RemoteFolderRef, DEFAULT_PAGE_LIMIT,
};

/// Note returned when an unscoped search has no term
pub const EMPTY_SEARCH_NOTE: &str = "Provide at least 1 character to search the whole drive.";

/// Raw browse parameters as received from a front end
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowseRequest {
    /// Parent folder ID, `"root"` or `"any"`; root when absent
    pub parent: Option<String>,
    /// Name search term
    pub q: Option<String>,
    /// Limit as text: a number or `"all"`
    pub limit: Option<String>,
}

/// Resolved listing plan for a [`BrowseRequest`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowsePlan {
    /// Query to run; `None` when the answer is known to be empty
    pub query: Option<FolderQuery>,
    /// Limit exactly as the caller should see it echoed back
    pub raw_limit: String,
    pub parent: RemoteParent,
    pub note: Option<String>,
}

/// Result of browsing remote folders
#[derive(Debug, Clone, Serialize)]
pub struct BrowseResponse {
    pub folders: Vec<RemoteFolderRef>,
    pub limit: String,
    pub parent: String,
    pub q: Option<String>,
    pub note: Option<String>,
}

/// Result of listing the files of a remote folder
#[derive(Debug, Clone, Serialize)]
pub struct RemoteFilesResponse {
    pub files: Vec<RemoteFileRef>,
    pub recursive: bool,
}

/// Parses a caller-supplied limit
///
/// `"all"` (any case) and `-1` are unbounded, other non-positive numbers and
/// unparsable text fall back to [`DEFAULT_PAGE_LIMIT`].
pub fn parse_limit(raw: &str) -> PageLimit {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("all") {
        return PageLimit::Unbounded;
    }
    match raw.parse::<i64>() {
        Ok(n) => PageLimit::from_raw(n),
        Err(_) => PageLimit::Max(DEFAULT_PAGE_LIMIT),
    }
}

fn recency_note(limit: PageLimit) -> String {
    match limit {
        PageLimit::Unbounded => {
            "Showing every folder, most recent first. Use search to narrow the list.".to_string()
        }
        PageLimit::Max(n) => {
            format!("Showing the {n} most recent folders. Use search to find others.")
        }
    }
}

/// Applies the browse policy to a request
///
/// # Errors
/// `FolioError::InvalidInput` if the parent is not a valid remote ID
pub fn plan_browse(request: &BrowseRequest, default_limit: i64) -> Result<BrowsePlan, FolioError> {
    let term = request
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty());

    if let Some(term) = term {
        let query = FolderQuery::new(RemoteParent::Any)
            .with_name_filter(term)
            .with_limit(PageLimit::Unbounded);
        return Ok(BrowsePlan {
            query: Some(query),
            raw_limit: "all".to_string(),
            parent: RemoteParent::Any,
            note: None,
        });
    }

    let parent: RemoteParent = request.parent.as_deref().unwrap_or_default().parse()?;
    let raw_limit = request
        .limit
        .clone()
        .unwrap_or_else(|| default_limit.to_string());

    if parent.is_any() {
        return Ok(BrowsePlan {
            query: None,
            raw_limit,
            parent,
            note: Some(EMPTY_SEARCH_NOTE.to_string()),
        });
    }

    let limit = parse_limit(&raw_limit);
    Ok(BrowsePlan {
        query: Some(FolderQuery::new(parent.clone()).with_limit(limit)),
        raw_limit,
        parent,
        note: Some(recency_note(limit)),
    })
}

/// Use case for browsing the user's remote storage
pub struct BrowseRemoteUseCase {
    connector: Arc<dyn IRemoteConnector>,
    default_limit: i64,
}

impl BrowseRemoteUseCase {
    /// Creates the use case; `default_limit` applies when no limit and no
    /// search term are given
    pub fn new(connector: Arc<dyn IRemoteConnector>, default_limit: i64) -> Self {
        Self {
            connector,
            default_limit,
        }
    }

    /// Lists remote folders according to the browse policy
    ///
    /// # Errors
    /// `InvalidInput` for a malformed parent, `RemoteUnavailable` when the
    /// session cannot be opened or the listing fails
    pub async fn browse_folders(
        &self,
        ctx: &RequestContext,
        request: &BrowseRequest,
    ) -> Result<BrowseResponse, FolioError> {
        let plan = plan_browse(request, self.default_limit)?;

        let folders = match &plan.query {
            Some(query) => {
                let remote = self.connector.connect(ctx.user_id()).await?;
                remote.list_child_folders(query).await?
            }
            None => Vec::new(),
        };

        Ok(BrowseResponse {
            folders,
            limit: plan.raw_limit,
            parent: plan.parent.to_string(),
            q: request.q.clone(),
            note: plan.note,
        })
    }

    /// Lists the PDFs of a remote folder, descending into subfolders when
    /// `recursive` is set
    pub async fn list_files(
        &self,
        ctx: &RequestContext,
        remote_folder_id: &RemoteId,
        recursive: bool,
    ) -> Result<RemoteFilesResponse, FolioError> {
        let remote = self.connector.connect(ctx.user_id()).await?;
        let files = if recursive {
            list_files_recursive(remote.as_ref(), remote_folder_id, Some(PDF_MIME_TYPE)).await?
        } else {
            remote
                .list_child_files(remote_folder_id, Some(PDF_MIME_TYPE), PageLimit::Unbounded)
                .await?
        };
        Ok(RemoteFilesResponse { files, recursive })
    }
}
