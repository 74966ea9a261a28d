//! Domain entities and business logic
//!
//! This module contains the core domain types for Folio:
//! - Newtypes for type-safe identifiers and validated domain types
//! - Local folders and their scheduling state
//! - Local documents and stored-file handles
//! - The explicit per-request context
//! - Domain-specific error types

pub mod context;
pub mod document;
pub mod errors;
pub mod folder;
pub mod newtypes;

// Re-export commonly used types
pub use context::RequestContext;
pub use document::{
    document_display_name, ensure_pdf_extension, has_pdf_extension, secure_file_name,
    LocalDocument, StoredFile, PDF_MIME_TYPE,
};
pub use errors::{DomainError, FolioError, RemoteError};
pub use folder::{normalize_name, FolderSyncState, LocalFolder};
pub use newtypes::*;
