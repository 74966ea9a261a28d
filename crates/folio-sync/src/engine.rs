//! Reconciliation engine
//!
//! The [`ReconciliationEngine`] brings one linked local folder in line with
//! its remote folder. Which steps run is chosen by [`SyncOptions`]:
//!
//! ## Pass Flow
//!
//! 1. **Verify** (full mode): the remote folder must still exist and be a
//!    folder. If it is gone, the local folder and all of its documents are
//!    deleted and the pass ends.
//! 2. **List**: fetch the flat PDF listing of the remote folder.
//! 3. **Delete** (full mode): linked documents whose remote file is gone.
//! 4. **Push** (full mode): upload local-only documents and link them.
//! 5. **Import / update**: download remote files not linked yet (bounded by
//!    the import cap); with `overwrite`, refresh already linked ones.
//! 6. **Bookkeeping**: record the pass time on the folder.
//!
//! Documents are matched strictly by remote ID. Per-file failures are
//! logged and counted in the report; they never abort the pass. Only
//! failing to verify or list the remote folder, or a folder store failure
//! outside per-file work, aborts with a [`SyncError`].

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use folio_core::domain::{
    document_display_name, ensure_pdf_extension, FolderId, FolderSyncState, LocalDocument,
    LocalFolder, RemoteId, StoredFile, PDF_MIME_TYPE,
};
use folio_core::ports::{
    IDocumentStorage, IFolderStore, IRemoteStorage, ITextExtractor, PageLimit, RemoteFileRef,
};
use folio_core::usecases::purge_folder;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::lock::FolderLocks;
use crate::SyncError;

/// Recorded name of a remote file that has none
const FALLBACK_DOCUMENT_NAME: &str = "file.pdf";

// ============================================================================
// SyncOptions
// ============================================================================

/// Selects which steps of a pass run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Check that the remote folder still exists; delete the local folder if not
    pub verify_remote: bool,
    /// Delete linked documents whose remote file is gone
    pub delete_missing: bool,
    /// Upload local-only documents
    pub push_local: bool,
    /// Re-download already linked files and replace their content
    pub overwrite: bool,
    /// Maximum number of new imports in this pass
    pub import_cap: Option<usize>,
    /// Reduce remote names to safe file names before recording them
    pub sanitize_names: bool,
    /// Skip the pass if the folder is still cooling down
    pub throttle: Option<Throttle>,
}

/// Cooldown re-checked once the folder lock is held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    pub min_interval: Duration,
    /// Reference time of the scheduling decision
    pub as_of: DateTime<Utc>,
}

impl SyncOptions {
    /// Full bidirectional pass used by explicit imports
    pub fn full(overwrite: bool) -> Self {
        Self {
            verify_remote: true,
            delete_missing: true,
            push_local: true,
            overwrite,
            import_cap: None,
            sanitize_names: false,
            throttle: None,
        }
    }

    /// Import-only pass: no deletes, no pushes, no overwrite
    pub fn import_only(import_cap: Option<usize>) -> Self {
        Self {
            verify_remote: false,
            delete_missing: false,
            push_local: false,
            overwrite: false,
            import_cap,
            sanitize_names: true,
            throttle: None,
        }
    }

    /// Skips the pass if, at `as_of`, the folder is cooling down
    ///
    /// A scheduler decides eligibility before taking the folder lock; a pass
    /// that finished while it waited makes the folder cool again.
    pub fn throttled(mut self, min_interval: Duration, as_of: DateTime<Utc>) -> Self {
        self.throttle = Some(Throttle {
            min_interval,
            as_of,
        });
        self
    }
}

// ============================================================================
// SyncReport
// ============================================================================

/// Why a remote file was not imported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Already linked and overwrite is off
    AlreadyImported,
    /// The download failed or the file vanished meanwhile
    DownloadFailed,
    /// The file or its record could not be stored locally
    StoreFailed,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::AlreadyImported => write!(f, "already_imported"),
            SkipReason::DownloadFailed => write!(f, "download_failed"),
            SkipReason::StoreFailed => write!(f, "store_failed"),
        }
    }
}

/// A remote file the pass did not import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedItem {
    pub id: RemoteId,
    pub name: String,
    pub reason: SkipReason,
}

impl SkippedItem {
    fn new(file: &RemoteFileRef, reason: SkipReason) -> Self {
        Self {
            id: file.id.clone(),
            name: file.name.clone(),
            reason,
        }
    }
}

/// Summary of a reconciliation pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub imported: usize,
    pub updated: usize,
    pub deleted: usize,
    pub pushed: usize,
    /// Per-file operations skipped because of an error
    pub failed: usize,
    /// The remote folder was gone and the local folder was deleted
    pub deleted_folder: bool,
    /// The folder had been synced too recently; nothing ran
    pub throttled: bool,
    pub skipped: Vec<SkippedItem>,
    /// Messages of the per-file failures
    pub errors: Vec<String>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
}

impl SyncReport {
    /// True if some per-file operation failed
    pub fn is_partial(&self) -> bool {
        self.failed > 0
    }

    fn record_failure(&mut self, message: String) {
        self.failed += 1;
        self.errors.push(message);
    }
}

// ============================================================================
// ReconciliationEngine
// ============================================================================

/// Applies remote state to linked local folders
///
/// ## Dependencies
///
/// - `store`: folder and document records
/// - `storage`: physical files in the upload directory
/// - `extractor`: text extraction for downloaded PDFs
/// - `locks`: per-folder locks, held for the whole pass
pub struct ReconciliationEngine {
    store: Arc<dyn IFolderStore>,
    storage: Arc<dyn IDocumentStorage>,
    extractor: Arc<dyn ITextExtractor>,
    locks: FolderLocks,
}

impl ReconciliationEngine {
    pub fn new(
        store: Arc<dyn IFolderStore>,
        storage: Arc<dyn IDocumentStorage>,
        extractor: Arc<dyn ITextExtractor>,
        locks: FolderLocks,
    ) -> Self {
        Self {
            store,
            storage,
            extractor,
            locks,
        }
    }

    /// The lock registry shared with other folder mutations
    pub fn locks(&self) -> &FolderLocks {
        &self.locks
    }

    /// Runs one pass for `folder_id` against an open remote session
    ///
    /// The folder is re-read after the lock is acquired, so a pass that
    /// waited for another one sees its results.
    ///
    /// # Errors
    ///
    /// - `SyncError::FolderNotFound` / `SyncError::NotLinked` for an
    ///   unusable folder
    /// - `SyncError::Remote` if the remote folder cannot be verified or listed
    /// - `SyncError::Storage` if the folder store fails outside per-file work
    #[tracing::instrument(skip(self, remote, options), fields(folder_id = %folder_id))]
    pub async fn reconcile(
        &self,
        remote: &dyn IRemoteStorage,
        folder_id: &FolderId,
        options: SyncOptions,
    ) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let _guard = self.locks.lock(folder_id).await;

        // Step 1: Load the folder under the lock
        let folder = self
            .store
            .get_folder(folder_id)
            .await?
            .ok_or(SyncError::FolderNotFound(*folder_id))?;
        let remote_folder = folder
            .remote_folder_id()
            .cloned()
            .ok_or(SyncError::NotLinked(*folder_id))?;

        let mut report = SyncReport::default();

        if let Some(throttle) = options.throttle {
            if folder.sync_state(throttle.as_of, throttle.min_interval) == FolderSyncState::Cooling {
                debug!("Folder synced recently, skipping pass");
                report.throttled = true;
                report.last_sync_at = folder.last_sync_at();
                return Ok(report);
            }
        }

        // Step 2: Verify the remote folder
        if options.verify_remote {
            let exists = matches!(
                remote.get_metadata(&remote_folder).await?,
                Some(item) if item.is_folder
            );
            if !exists {
                warn!(remote_folder = %remote_folder, "Remote folder is gone, deleting local folder");
                let purge =
                    purge_folder(self.store.as_ref(), self.storage.as_ref(), folder_id).await?;
                report.deleted = purge.documents_removed;
                report.deleted_folder = true;
                report.duration_ms = elapsed_ms(started);
                info!(
                    documents_removed = purge.documents_removed,
                    files_left_behind = purge.files_left_behind,
                    "Local folder deleted"
                );
                return Ok(report);
            }
        }

        // Step 3: Remote listing and local state
        let listing: Vec<RemoteFileRef> = remote
            .list_child_files(&remote_folder, Some(PDF_MIME_TYPE), PageLimit::Unbounded)
            .await?
            .into_iter()
            .filter(|file| file.mime_type == PDF_MIME_TYPE)
            .collect();
        let remote_ids: HashSet<&RemoteId> = listing.iter().map(|f| &f.id).collect();

        let mut linked: HashMap<RemoteId, LocalDocument> = HashMap::new();
        let mut local_only: Vec<LocalDocument> = Vec::new();
        for document in self.store.list_documents(folder_id).await? {
            match document.remote_file_id().cloned() {
                Some(id) => {
                    linked.insert(id, document);
                }
                None => local_only.push(document),
            }
        }
        debug!(
            remote_files = listing.len(),
            linked = linked.len(),
            local_only = local_only.len(),
            "Computed reconciliation inputs"
        );

        // Step 4: Deletions
        if options.delete_missing {
            let gone: Vec<RemoteId> = linked
                .keys()
                .filter(|id| !remote_ids.contains(id))
                .cloned()
                .collect();
            for id in gone {
                if let Some(document) = linked.remove(&id) {
                    self.delete_document(&document, &mut report).await;
                }
            }
        }

        // Step 5: Pushes
        if options.push_local {
            for mut document in local_only {
                self.push_document(remote, &remote_folder, &mut document, &mut report)
                    .await;
            }
        }

        // Step 6: Imports and updates
        for file in &listing {
            match linked.get_mut(&file.id) {
                Some(document) if options.overwrite => {
                    self.update_document(remote, file, document, &options, &mut report)
                        .await;
                }
                Some(_) => report
                    .skipped
                    .push(SkippedItem::new(file, SkipReason::AlreadyImported)),
                None => {
                    if let Some(cap) = options.import_cap {
                        if report.imported >= cap {
                            continue;
                        }
                    }
                    self.import_document(remote, &folder, file, &options, &mut report)
                        .await;
                }
            }
        }

        // Step 7: Record the pass
        report.last_sync_at = self.record_pass(folder_id).await?;
        report.duration_ms = elapsed_ms(started);

        info!(
            imported = report.imported,
            updated = report.updated,
            deleted = report.deleted,
            pushed = report.pushed,
            failed = report.failed,
            duration_ms = report.duration_ms,
            "Reconciliation pass complete"
        );
        Ok(report)
    }

    /// Stamps the folder with the pass time; `None` if it was deleted meanwhile
    async fn record_pass(&self, folder_id: &FolderId) -> Result<Option<DateTime<Utc>>, SyncError> {
        let Some(mut folder) = self.store.get_folder(folder_id).await? else {
            return Ok(None);
        };
        let at = folder.record_sync(Utc::now());
        self.store.save_folder(&folder).await?;
        Ok(Some(at))
    }

    // ========================================================================
    // Per-file operations
    // ========================================================================

    async fn delete_document(&self, document: &LocalDocument, report: &mut SyncReport) {
        if let Err(e) = self.store.delete_document(document.id()).await {
            warn!(document_id = %document.id(), error = %e, "Failed to delete document record");
            report.record_failure(format!("delete {}: {e:#}", document.original_name()));
            return;
        }
        self.discard_file(document.file_path()).await;
        report.deleted += 1;
        debug!(document_id = %document.id(), "Deleted document whose remote file is gone");
    }

    async fn push_document(
        &self,
        remote: &dyn IRemoteStorage,
        remote_folder: &RemoteId,
        document: &mut LocalDocument,
        report: &mut SyncReport,
    ) {
        let remote_id = match remote
            .upload_file(
                remote_folder,
                document.file_path(),
                Some(document.original_name()),
            )
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(document_id = %document.id(), error = %e, "Failed to push document");
                report.record_failure(format!("push {}: {e}", document.original_name()));
                return;
            }
        };

        document.link_remote(remote_id);
        if let Err(e) = self.store.save_document(document).await {
            warn!(document_id = %document.id(), error = %e, "Pushed document but failed to store its link");
            report.record_failure(format!("link {}: {e:#}", document.original_name()));
            return;
        }
        report.pushed += 1;
    }

    async fn import_document(
        &self,
        remote: &dyn IRemoteStorage,
        folder: &LocalFolder,
        file: &RemoteFileRef,
        options: &SyncOptions,
        report: &mut SyncReport,
    ) {
        let Some(stored) = self.fetch(remote, file, report).await else {
            return;
        };
        let content = self.extractor.extract_text(&stored.path).await;

        let mut document = LocalDocument::new(
            *folder.id(),
            stored,
            display_name(&file.name, options),
            content,
        );
        document.link_remote(file.id.clone());

        if let Err(e) = self.store.save_document(&document).await {
            warn!(remote_id = %file.id, error = %e, "Failed to save imported document");
            self.discard_file(document.file_path()).await;
            report.record_failure(format!("save {}: {e:#}", file.name));
            report
                .skipped
                .push(SkippedItem::new(file, SkipReason::StoreFailed));
            return;
        }

        debug!(remote_id = %file.id, document_id = %document.id(), "Imported remote file");
        report.imported += 1;
    }

    async fn update_document(
        &self,
        remote: &dyn IRemoteStorage,
        file: &RemoteFileRef,
        document: &mut LocalDocument,
        options: &SyncOptions,
        report: &mut SyncReport,
    ) {
        let Some(stored) = self.fetch(remote, file, report).await else {
            return;
        };
        let content = self.extractor.extract_text(&stored.path).await;

        let previous = document.replace_content(stored, display_name(&file.name, options), content);
        if let Err(e) = self.store.save_document(document).await {
            warn!(document_id = %document.id(), error = %e, "Failed to save updated document");
            self.discard_file(document.file_path()).await;
            report.record_failure(format!("update {}: {e:#}", file.name));
            return;
        }

        self.discard_file(&previous).await;
        debug!(document_id = %document.id(), "Replaced document content");
        report.updated += 1;
    }

    /// Downloads a remote file into a fresh stored file
    ///
    /// Returns `None` (after recording the failure) if the download or the
    /// commit fails; no partial file is left behind.
    async fn fetch(
        &self,
        remote: &dyn IRemoteStorage,
        file: &RemoteFileRef,
        report: &mut SyncReport,
    ) -> Option<StoredFile> {
        let reserved = self.storage.reserve();

        let failure = match remote.download_file(&file.id, &reserved.path).await {
            Ok(true) => None,
            Ok(false) => Some("remote file no longer exists".to_string()),
            Err(e) => Some(e.to_string()),
        };
        if let Some(reason) = failure {
            warn!(remote_id = %file.id, reason = %reason, "Download failed");
            self.discard_file(&reserved.path).await;
            report.record_failure(format!("download {}: {reason}", file.name));
            report
                .skipped
                .push(SkippedItem::new(file, SkipReason::DownloadFailed));
            return None;
        }

        let path = reserved.path.clone();
        match self.storage.commit(reserved).await {
            Ok(stored) => Some(stored),
            Err(e) => {
                warn!(remote_id = %file.id, error = %e, "Downloaded file could not be stored");
                self.discard_file(&path).await;
                report.record_failure(format!("store {}: {e:#}", file.name));
                report
                    .skipped
                    .push(SkippedItem::new(file, SkipReason::StoreFailed));
                None
            }
        }
    }

    /// Best-effort removal of a stored file
    async fn discard_file(&self, path: &Path) {
        if let Err(e) = self.storage.remove(path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove stored file");
        }
    }
}

fn display_name(remote_name: &str, options: &SyncOptions) -> String {
    if options.sanitize_names {
        return document_display_name(remote_name);
    }
    match remote_name.trim() {
        "" => FALLBACK_DOCUMENT_NAME.to_string(),
        name => ensure_pdf_extension(name),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
