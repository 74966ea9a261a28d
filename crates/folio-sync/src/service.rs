//! Request-level facade over the engine, scheduler and core use cases
//!
//! [`FolderService`] is what a front end talks to. Every method takes the
//! caller's [`RequestContext`]; operations that touch a folder's contents
//! take that folder's lock, either directly or through the engine.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use folio_core::config::Config;
use folio_core::domain::{
    DocumentId, FolderId, FolioError, LocalFolder, RemoteId, RequestContext,
};
use folio_core::ports::{IDocumentStorage, IFolderStore, IRemoteConnector, ITextExtractor};
use folio_core::usecases::{
    owned_document, owned_folder, BrowseRemoteUseCase, BrowseRequest, BrowseResponse,
    CreatedFolder, DocumentDeletion, DocumentView, FolderContext, FolderContextUseCase,
    FolderOverview, FolderPurge, FolderSummary, ManageDocumentsUseCase,
    ManageFoldersUseCase, RemoteFilesResponse, SearchFolderUseCase, SearchResponse,
    UploadOutcome, DEFAULT_REMOTE_FOLDER_NAME,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::engine::{ReconciliationEngine, SyncOptions, SyncReport};
use crate::lock::FolderLocks;
use crate::scheduler::SyncScheduler;

/// Outcome of [`FolderService::import_folder`]
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    /// The local folder after the pass; `None` if it was deleted because
    /// the remote folder is gone
    pub folder: Option<FolderSummary>,
    /// True if the local folder was created by this import
    pub created: bool,
    pub report: SyncReport,
}

/// Folder and document operations for one deployment
pub struct FolderService {
    store: Arc<dyn IFolderStore>,
    connector: Arc<dyn IRemoteConnector>,
    engine: Arc<ReconciliationEngine>,
    scheduler: SyncScheduler,
    folders: ManageFoldersUseCase,
    documents: ManageDocumentsUseCase,
    browse: BrowseRemoteUseCase,
    search: SearchFolderUseCase,
    context: FolderContextUseCase,
}

impl FolderService {
    /// Wires the service from its adapters and the loaded configuration
    pub fn new(
        config: &Config,
        store: Arc<dyn IFolderStore>,
        storage: Arc<dyn IDocumentStorage>,
        extractor: Arc<dyn ITextExtractor>,
        connector: Arc<dyn IRemoteConnector>,
    ) -> Self {
        let engine = Arc::new(ReconciliationEngine::new(
            store.clone(),
            storage.clone(),
            extractor.clone(),
            FolderLocks::new(),
        ));
        let scheduler = SyncScheduler::new(engine.clone(), connector.clone(), &config.sync);

        Self {
            folders: ManageFoldersUseCase::new(store.clone(), storage.clone(), connector.clone()),
            documents: ManageDocumentsUseCase::new(
                store.clone(),
                storage,
                extractor,
                connector.clone(),
                config.max_upload_bytes(),
                config.documents.preview_chars,
            ),
            browse: BrowseRemoteUseCase::new(connector.clone(), config.drive.default_browse_limit),
            search: SearchFolderUseCase::new(store.clone(), config.documents.search_context_chars),
            context: FolderContextUseCase::new(store.clone()),
            store,
            connector,
            engine,
            scheduler,
        }
    }

    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    pub fn scheduler(&self) -> &SyncScheduler {
        &self.scheduler
    }

    // ========================================================================
    // Folders
    // ========================================================================

    /// Lists the caller's folders after running due background passes
    #[tracing::instrument(skip(self, ctx), fields(user = %ctx.user_id(), request_id = %ctx.request_id()))]
    pub async fn list_folders(&self, ctx: &RequestContext) -> Result<Vec<FolderSummary>, FolioError> {
        let folders = self.store.list_folders(ctx.user_id()).await?;
        let runs = self.scheduler.run_due(ctx.user_id(), &folders, Utc::now()).await;
        debug!(passes = runs.iter().filter(|r| r.report.is_some()).count(), "Background passes done");

        let mut summaries = Vec::new();
        for folder in self.store.list_folders(ctx.user_id()).await? {
            summaries.push(FolderSummary::load(self.store.as_ref(), &folder).await?);
        }
        Ok(summaries)
    }

    /// Runs an import-only pass on a linked folder now, ignoring the throttle
    ///
    /// # Errors
    /// `NotFound` for a missing or foreign folder, `InvalidInput` if the
    /// folder is not linked, `RemoteUnavailable` if no session can be opened
    #[tracing::instrument(skip(self, ctx), fields(user = %ctx.user_id(), request_id = %ctx.request_id()))]
    pub async fn sync_folder(
        &self,
        ctx: &RequestContext,
        folder_id: &FolderId,
    ) -> Result<SyncReport, FolioError> {
        let folder = owned_folder(self.store.as_ref(), ctx, folder_id).await?;
        if !folder.is_linked() {
            return Err(FolioError::InvalidInput(format!(
                "folder {folder_id} is not linked to a remote folder"
            )));
        }

        let remote = self.connector.connect(ctx.user_id()).await?;
        let report = self
            .engine
            .reconcile(remote.as_ref(), folder_id, SyncOptions::import_only(None))
            .await?;
        Ok(report)
    }

    /// Imports a remote folder with a full bidirectional pass
    ///
    /// This method:
    /// 1. Looks up the local folder linked to `remote_id`
    /// 2. Without one, checks that the remote folder exists and creates a
    ///    linked local folder (name: `name`, then the remote name, then a
    ///    default)
    /// 3. Runs a full pass; if the remote folder is gone, the existing local
    ///    folder is deleted and reported as such
    ///
    /// # Errors
    /// `NotFound` if the remote folder does not exist and nothing links it
    #[tracing::instrument(skip(self, ctx), fields(user = %ctx.user_id(), request_id = %ctx.request_id()))]
    pub async fn import_folder(
        &self,
        ctx: &RequestContext,
        remote_id: RemoteId,
        name: Option<&str>,
        overwrite: bool,
    ) -> Result<ImportOutcome, FolioError> {
        let remote = self.connector.connect(ctx.user_id()).await?;

        let existing = self
            .store
            .find_folder_by_remote(ctx.user_id(), &remote_id)
            .await?;
        let (folder_id, created) = match existing {
            Some(folder) => (*folder.id(), false),
            None => {
                let item = remote
                    .get_metadata(&remote_id)
                    .await?
                    .filter(|item| item.is_folder)
                    .ok_or_else(|| FolioError::NotFound(format!("remote folder {remote_id}")))?;

                let requested = name.map(str::trim).filter(|n| !n.is_empty());
                let remote_name = Some(item.name.trim()).filter(|n| !n.is_empty());
                let folder_name = requested
                    .or(remote_name)
                    .unwrap_or(DEFAULT_REMOTE_FOLDER_NAME);

                let mut folder = LocalFolder::new(ctx.user_id().clone(), folder_name)?;
                folder.link_remote(remote_id.clone());
                self.store.save_folder(&folder).await?;
                info!(folder_id = %folder.id(), remote_id = %remote_id, "Created folder for import");
                (*folder.id(), true)
            }
        };

        let report = self
            .engine
            .reconcile(remote.as_ref(), &folder_id, SyncOptions::full(overwrite))
            .await?;

        let folder = match self.store.get_folder(&folder_id).await? {
            Some(folder) if !report.deleted_folder => {
                Some(FolderSummary::load(self.store.as_ref(), &folder).await?)
            }
            _ => None,
        };

        Ok(ImportOutcome {
            folder,
            created,
            report,
        })
    }

    pub async fn create_folder(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> Result<CreatedFolder, FolioError> {
        self.folders.create_folder(ctx, name).await
    }

    /// Deletes a folder, holding its lock so no pass runs concurrently
    #[tracing::instrument(skip(self, ctx), fields(user = %ctx.user_id(), request_id = %ctx.request_id()))]
    pub async fn delete_folder(
        &self,
        ctx: &RequestContext,
        folder_id: &FolderId,
    ) -> Result<FolderPurge, FolioError> {
        let locks = self.engine.locks();
        let purge = {
            let _guard = locks.lock(folder_id).await;
            self.folders.delete_folder(ctx, folder_id).await?
        };
        locks.forget(folder_id);
        info!(
            folder_id = %folder_id,
            documents_removed = purge.documents_removed,
            "Folder deleted"
        );
        Ok(purge)
    }

    pub async fn link_folder(
        &self,
        ctx: &RequestContext,
        folder_id: &FolderId,
        remote_id: RemoteId,
    ) -> Result<LocalFolder, FolioError> {
        self.folders.link_folder(ctx, folder_id, remote_id).await
    }

    pub async fn create_folder_from_remote(
        &self,
        ctx: &RequestContext,
        remote_id: RemoteId,
        name: Option<&str>,
    ) -> Result<LocalFolder, FolioError> {
        self.folders
            .create_folder_from_remote(ctx, remote_id, name)
            .await
    }

    // ========================================================================
    // Remote browsing
    // ========================================================================

    pub async fn browse_remote_folders(
        &self,
        ctx: &RequestContext,
        request: &BrowseRequest,
    ) -> Result<BrowseResponse, FolioError> {
        self.browse.browse_folders(ctx, request).await
    }

    pub async fn list_remote_files(
        &self,
        ctx: &RequestContext,
        remote_folder_id: &RemoteId,
        recursive: bool,
    ) -> Result<RemoteFilesResponse, FolioError> {
        self.browse
            .list_files(ctx, remote_folder_id, recursive)
            .await
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Uploads a PDF into a folder, under the folder's lock
    pub async fn upload_document(
        &self,
        ctx: &RequestContext,
        folder_id: &FolderId,
        source: &Path,
        display_name: Option<&str>,
    ) -> Result<UploadOutcome, FolioError> {
        let _guard = self.engine.locks().lock(folder_id).await;
        self.documents
            .upload_document(ctx, folder_id, source, display_name)
            .await
    }

    pub async fn get_document(
        &self,
        ctx: &RequestContext,
        document_id: &DocumentId,
    ) -> Result<DocumentView, FolioError> {
        self.documents.get_document(ctx, document_id).await
    }

    /// Deletes a document under its folder's lock
    ///
    /// A pass on the folder finishes before the record goes, so it cannot
    /// write the document back.
    pub async fn delete_document(
        &self,
        ctx: &RequestContext,
        document_id: &DocumentId,
    ) -> Result<DocumentDeletion, FolioError> {
        let (document, _) = owned_document(self.store.as_ref(), ctx, document_id).await?;
        let _guard = self.engine.locks().lock(document.folder_id()).await;
        self.documents.delete_document(ctx, document_id).await
    }

    pub async fn search_folder(
        &self,
        ctx: &RequestContext,
        folder_id: &FolderId,
        query: &str,
    ) -> Result<SearchResponse, FolioError> {
        self.search.search(ctx, folder_id, query).await
    }

    // ========================================================================
    // Assistant context
    // ========================================================================

    /// Text of the selected folders the caller owns
    pub async fn folder_context(
        &self,
        ctx: &RequestContext,
        folder_ids: &[FolderId],
    ) -> Result<FolderContext, FolioError> {
        self.context.folder_context(ctx, folder_ids).await
    }

    /// The caller's folders with their documents, without running passes
    pub async fn folders_overview(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<FolderOverview>, FolioError> {
        self.context.folders_overview(ctx).await
    }
}
