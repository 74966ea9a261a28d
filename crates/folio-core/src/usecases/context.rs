//! Folder text for the chat assistant
//!
//! The assistant answers from the extracted text of the folders a user
//! selects. [`FolderContextUseCase::folder_context`] gathers that text with a
//! header per folder and per document; [`FolderContextUseCase::folders_overview`]
//! lists every folder of the user with the documents it holds, for picking
//! folders in the first place.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::domain::{
    newtypes::{DocumentId, FolderId, RemoteId},
    FolioError, RequestContext,
};
use crate::ports::IFolderStore;

/// Text of one document inside a [`FolderText`]
#[derive(Debug, Clone, Serialize)]
pub struct DocumentText {
    pub id: DocumentId,
    pub name: String,
    pub content: String,
}

/// Text of one selected folder
#[derive(Debug, Clone, Serialize)]
pub struct FolderText {
    pub id: FolderId,
    pub name: String,
    pub documents: Vec<DocumentText>,
}

/// Text of the selected folders the caller owns
#[derive(Debug, Clone, Default, Serialize)]
pub struct FolderContext {
    pub folders: Vec<FolderText>,
}

impl FolderContext {
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// Renders the context as plain text
    ///
    /// Each folder starts with `=== FOLDER: <name> ===` and each document
    /// with `--- DOCUMENT: <name> ---`, followed by its text. An empty
    /// context renders as an empty string.
    pub fn render(&self) -> String {
        let mut parts = Vec::new();
        for folder in &self.folders {
            parts.push(format!("\n=== FOLDER: {} ===\n", folder.name));
            for document in &folder.documents {
                parts.push(format!("\n--- DOCUMENT: {} ---\n", document.name));
                parts.push(document.content.clone());
                parts.push("\n".to_string());
            }
        }
        parts.join("\n")
    }
}

/// Document reference in a [`FolderOverview`]
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRef {
    pub id: DocumentId,
    pub name: String,
}

/// A folder with the documents it holds
#[derive(Debug, Clone, Serialize)]
pub struct FolderOverview {
    pub id: FolderId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub remote_folder_id: Option<RemoteId>,
    pub documents: Vec<DocumentRef>,
}

/// Read-only use case over the folder store
pub struct FolderContextUseCase {
    store: Arc<dyn IFolderStore>,
}

impl FolderContextUseCase {
    pub fn new(store: Arc<dyn IFolderStore>) -> Self {
        Self { store }
    }

    /// Collects the text of the selected folders
    ///
    /// Folders keep the order of `folder_ids`; repeated IDs are used once.
    /// Missing folders and folders of other users are skipped, not reported.
    pub async fn folder_context(
        &self,
        ctx: &RequestContext,
        folder_ids: &[FolderId],
    ) -> Result<FolderContext, FolioError> {
        let mut context = FolderContext::default();
        let mut seen: Vec<FolderId> = Vec::with_capacity(folder_ids.len());

        for folder_id in folder_ids {
            if seen.contains(folder_id) {
                continue;
            }
            seen.push(*folder_id);

            let folder = match self.store.get_folder(folder_id).await? {
                Some(folder) if folder.is_owned_by(ctx.user_id()) => folder,
                _ => {
                    debug!(folder_id = %folder_id, user = %ctx.user_id(), "Skipping folder outside the caller's reach");
                    continue;
                }
            };

            let documents = self
                .store
                .list_documents(folder_id)
                .await?
                .into_iter()
                .map(|document| DocumentText {
                    id: *document.id(),
                    name: document.original_name().to_string(),
                    content: document.content().to_string(),
                })
                .collect();

            context.folders.push(FolderText {
                id: *folder.id(),
                name: folder.name().to_string(),
                documents,
            });
        }

        Ok(context)
    }

    /// Lists the caller's folders with the ID and name of each document
    pub async fn folders_overview(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<FolderOverview>, FolioError> {
        let folders = self.store.list_folders(ctx.user_id()).await?;
        let mut overview = Vec::with_capacity(folders.len());

        for folder in folders {
            let documents = self
                .store
                .list_documents(folder.id())
                .await?
                .iter()
                .map(|document| DocumentRef {
                    id: *document.id(),
                    name: document.original_name().to_string(),
                })
                .collect();

            overview.push(FolderOverview {
                id: *folder.id(),
                name: folder.name().to_string(),
                created_at: folder.created_at(),
                remote_folder_id: folder.remote_folder_id().cloned(),
                documents,
            });
        }

        Ok(overview)
    }
}
