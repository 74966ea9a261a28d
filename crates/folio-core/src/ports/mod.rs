//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteStorage`] / [`IRemoteConnector`] - Remote listing, transfers and metadata
//! - [`IFolderStore`] - Persistent storage for folders and documents
//! - [`IDocumentStorage`] - Physical PDF files in the upload directory
//! - [`ICredentialStore`] - Per-user remote provider credentials
//! - [`ITextExtractor`] - PDF text extraction

pub mod credentials;
pub mod document_storage;
pub mod folder_store;
pub mod remote_storage;
pub mod text_extractor;

pub use credentials::{ICredentialStore, RemoteCredentials};
pub use document_storage::{IDocumentStorage, ReservedPath};
pub use folder_store::IFolderStore;
pub use remote_storage::{
    case_variants, list_files_recursive, name_matches, FolderQuery, IRemoteConnector,
    IRemoteStorage, ListOrder, PageLimit, RemoteFileRef, RemoteFolderRef, RemoteItem,
    DEFAULT_PAGE_LIMIT,
};
pub use text_extractor::ITextExtractor;
