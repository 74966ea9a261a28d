//! Folio Sync - Folder reconciliation with a remote drive
//!
//! Provides:
//! - The reconciliation engine that brings a linked folder in line with its
//!   remote counterpart
//! - A throttled scheduler that runs passes when folders are listed
//! - Per-folder mutual exclusion
//! - Local document storage and PDF text extraction adapters
//! - The request-level [`FolderService`](service::FolderService) facade
//!
//! ## Modules
//!
//! - [`engine`] - Reconciliation passes and their reports
//! - [`scheduler`] - Due/cooling decisions and background import passes
//! - [`lock`] - Per-folder async locks
//! - [`filesystem`] - Upload directory adapter (unique names, atomic import)
//! - [`extractor`] - PDF text extraction adapter
//! - [`service`] - Facade combining the engine with the core use cases

pub mod engine;
pub mod extractor;
pub mod filesystem;
pub mod lock;
pub mod scheduler;
pub mod service;

use folio_core::domain::{FolderId, FolioError, RemoteError};
use thiserror::Error;

pub use engine::{
    ReconciliationEngine, SkipReason, SkippedItem, SyncOptions, SyncReport, Throttle,
};
pub use extractor::PdfTextExtractor;
pub use filesystem::LocalDocumentStorage;
pub use lock::FolderLocks;
pub use scheduler::{ScheduledRun, SyncScheduler};
pub use service::{FolderService, ImportOutcome};

/// Errors that abort a reconciliation pass
///
/// Failures of individual files never show up here; they are counted in the
/// [`SyncReport`].
#[derive(Debug, Error)]
pub enum SyncError {
    /// The folder does not exist (anymore)
    #[error("Folder not found: {0}")]
    FolderNotFound(FolderId),

    /// The folder has no remote link
    #[error("Folder {0} is not linked to a remote folder")]
    NotLinked(FolderId),

    /// Listing or verifying the remote folder failed
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// The folder store failed
    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl From<SyncError> for FolioError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::FolderNotFound(id) => FolioError::NotFound(format!("folder {id}")),
            SyncError::NotLinked(id) => {
                FolioError::InvalidInput(format!("folder {id} is not linked to a remote folder"))
            }
            SyncError::Remote(e) => FolioError::RemoteUnavailable(e),
            SyncError::Storage(e) => FolioError::Storage(e),
        }
    }
}
