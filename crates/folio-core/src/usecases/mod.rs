//! Use cases (interactors) for Folio
//!
//! This module contains the request-level operations that do not involve a
//! reconciliation pass. Use cases are thin coordinators that delegate
//! business rules to domain methods and I/O to ports; each takes the caller's
//! [`RequestContext`](crate::domain::RequestContext) explicitly.
//!
//! ## Use Cases
//!
//! - [`BrowseRemoteUseCase`] - Remote folder browsing and file listing
//! - [`FolderContextUseCase`] - Folder text and overview for the chat assistant
//! - [`ManageFoldersUseCase`] - Folder creation, linking and deletion
//! - [`ManageDocumentsUseCase`] - PDF upload, preview and deletion
//! - [`SearchFolderUseCase`] - Text search within a folder

pub mod browse;
pub mod context;
pub mod documents;
pub mod folders;
pub mod search;

#[cfg(test)]
mod mocks;

pub use browse::{
    parse_limit, plan_browse, BrowsePlan, BrowseRemoteUseCase, BrowseRequest, BrowseResponse,
    RemoteFilesResponse,
};
pub use context::{
    DocumentRef, DocumentText, FolderContext, FolderContextUseCase, FolderOverview, FolderText,
};
pub use documents::{DocumentDeletion, DocumentView, ManageDocumentsUseCase, UploadOutcome};
pub use folders::{
    owned_document, owned_folder, purge_folder, CreatedFolder, FolderPurge, FolderSummary,
    ManageFoldersUseCase, DEFAULT_REMOTE_FOLDER_NAME, LOCAL_ONLY_WARNING,
};
pub use search::{find_with_context, SearchFolderUseCase, SearchHit, SearchResponse, TextMatch};
