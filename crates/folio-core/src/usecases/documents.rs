//! Document management use case
//!
//! Uploads, inspects and deletes the PDF documents of a folder. An upload is
//! stored and indexed locally first; pushing it to the linked remote folder
//! is best-effort and never fails the upload.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::domain::{
    document_display_name, has_pdf_extension,
    newtypes::{DocumentId, FolderId, RemoteId},
    FolioError, LocalDocument, RequestContext,
};
use crate::ports::{IDocumentStorage, IFolderStore, IRemoteConnector, ITextExtractor};

use super::folders::{owned_document, owned_folder};

/// Outcome of [`ManageDocumentsUseCase::upload_document`]
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub document: LocalDocument,
    /// Set when the document could not be pushed to the linked remote folder
    pub remote_warning: Option<String>,
}

/// Document metadata with a short text preview
#[derive(Debug, Clone, Serialize)]
pub struct DocumentView {
    pub id: DocumentId,
    pub folder_id: FolderId,
    pub original_name: String,
    pub stored_name: String,
    pub size_bytes: u64,
    pub remote_file_id: Option<RemoteId>,
    pub uploaded_at: DateTime<Utc>,
    pub content_preview: String,
}

/// Outcome of [`ManageDocumentsUseCase::delete_document`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentDeletion {
    pub file_removed: bool,
    pub remote_warning: Option<String>,
}

/// Use case for uploading, showing and deleting documents
pub struct ManageDocumentsUseCase {
    store: Arc<dyn IFolderStore>,
    storage: Arc<dyn IDocumentStorage>,
    extractor: Arc<dyn ITextExtractor>,
    connector: Arc<dyn IRemoteConnector>,
    max_upload_bytes: u64,
    preview_chars: usize,
}

impl ManageDocumentsUseCase {
    pub fn new(
        store: Arc<dyn IFolderStore>,
        storage: Arc<dyn IDocumentStorage>,
        extractor: Arc<dyn ITextExtractor>,
        connector: Arc<dyn IRemoteConnector>,
        max_upload_bytes: u64,
        preview_chars: usize,
    ) -> Self {
        Self {
            store,
            storage,
            extractor,
            connector,
            max_upload_bytes,
            preview_chars,
        }
    }

    /// Uploads a PDF from `source` into a folder
    ///
    /// This method:
    /// 1. Checks ownership, the `.pdf` extension and the size limit
    /// 2. Copies the file into document storage under a unique name
    /// 3. Extracts its text and saves the document record
    /// 4. Pushes it to the folder's remote folder, if linked
    ///
    /// # Arguments
    ///
    /// * `display_name` - Name to record; defaults to the source file name
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing folder, `InvalidInput` for a non-PDF, missing
    /// or oversized source, `Storage` if the file cannot be stored or saved
    pub async fn upload_document(
        &self,
        ctx: &RequestContext,
        folder_id: &FolderId,
        source: &Path,
        display_name: Option<&str>,
    ) -> Result<UploadOutcome, FolioError> {
        let folder = owned_folder(self.store.as_ref(), ctx, folder_id).await?;

        // Step 1: Validate the source
        let raw_name = match display_name {
            Some(name) => name.to_string(),
            None => source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        if !has_pdf_extension(raw_name.trim()) {
            return Err(FolioError::InvalidInput(
                "only PDF files are allowed".to_string(),
            ));
        }
        let size = self
            .storage
            .file_size(source)
            .await?
            .ok_or_else(|| FolioError::InvalidInput(format!("{} does not exist", source.display())))?;
        if size > self.max_upload_bytes {
            return Err(FolioError::InvalidInput(format!(
                "file is too large (maximum {} MB)",
                self.max_upload_bytes / (1024 * 1024)
            )));
        }

        // Step 2: Store under a unique name
        let stored = self.storage.import_file(source).await?;

        // Step 3: Extract and record
        let content = self.extractor.extract_text(&stored.path).await;
        let stored_path = stored.path.clone();
        let mut document =
            LocalDocument::new(*folder.id(), stored, document_display_name(&raw_name), content);
        if let Err(e) = self.store.save_document(&document).await {
            if let Err(cleanup) = self.storage.remove(&stored_path).await {
                warn!(path = %stored_path.display(), error = %cleanup, "Failed to remove stored file");
            }
            return Err(e.into());
        }

        // Step 4: Best-effort push
        let remote_warning = match folder.remote_folder_id() {
            None => None,
            Some(remote_folder) => {
                let pushed = match self.connector.connect(ctx.user_id()).await {
                    Ok(remote) => remote
                        .upload_file(
                            remote_folder,
                            document.file_path(),
                            Some(document.original_name()),
                        )
                        .await
                        .map_err(FolioError::from),
                    Err(e) => Err(e.into()),
                };
                match pushed {
                    Ok(remote_id) => {
                        document.link_remote(remote_id);
                        self.store.save_document(&document).await?;
                        None
                    }
                    Err(e) => Some(format!("document was not pushed to remote storage: {e}")),
                }
            }
        };

        Ok(UploadOutcome {
            document,
            remote_warning,
        })
    }

    /// Returns document metadata and a preview of its text
    ///
    /// The preview is cut at the configured number of characters and ends
    /// with `...` when the text was longer.
    pub async fn get_document(
        &self,
        ctx: &RequestContext,
        id: &DocumentId,
    ) -> Result<DocumentView, FolioError> {
        let (document, _) = owned_document(self.store.as_ref(), ctx, id).await?;

        let preview = document.preview(self.preview_chars);
        let content_preview = if preview.len() < document.content().len() {
            format!("{preview}...")
        } else {
            preview.to_string()
        };

        Ok(DocumentView {
            id: *document.id(),
            folder_id: *document.folder_id(),
            original_name: document.original_name().to_string(),
            stored_name: document.stored_name().to_string(),
            size_bytes: document.size_bytes(),
            remote_file_id: document.remote_file_id().cloned(),
            uploaded_at: document.uploaded_at(),
            content_preview,
        })
    }

    /// Deletes a document, its stored file and its remote copy
    ///
    /// The record goes first; file and remote deletion are best-effort
    /// afterwards.
    pub async fn delete_document(
        &self,
        ctx: &RequestContext,
        id: &DocumentId,
    ) -> Result<DocumentDeletion, FolioError> {
        let (document, _) = owned_document(self.store.as_ref(), ctx, id).await?;

        self.store.delete_document(id).await?;

        let file_removed = match self.storage.remove(document.file_path()).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(document_id = %id, error = %e, "Failed to remove stored file");
                false
            }
        };

        let remote_warning = match document.remote_file_id() {
            None => None,
            Some(remote_id) => {
                let deleted = match self.connector.connect(ctx.user_id()).await {
                    Ok(remote) => remote.delete_file(remote_id).await.map(|_| ()),
                    Err(e) => Err(e),
                };
                deleted
                    .err()
                    .map(|e| format!("remote file was not deleted: {e}"))
            }
        };

        Ok(DocumentDeletion {
            file_removed,
            remote_warning,
        })
    }
}
