//! In-memory port doubles shared by the use case tests

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::{
    newtypes::{DocumentId, FolderId, RemoteId, UserId},
    LocalDocument, LocalFolder, RemoteError, StoredFile,
};
use crate::ports::{
    FolderQuery, IDocumentStorage, IFolderStore, IRemoteConnector, IRemoteStorage,
    ITextExtractor, PageLimit, RemoteFileRef, RemoteFolderRef, RemoteItem, ReservedPath,
};

// ============================================================================
// Store
// ============================================================================

#[derive(Default)]
pub struct MockStore {
    folders: Mutex<HashMap<FolderId, LocalFolder>>,
    documents: Mutex<HashMap<DocumentId, LocalDocument>>,
    failing_document_writes: AtomicBool,
}

impl MockStore {
    pub fn documents(&self) -> Vec<LocalDocument> {
        self.documents.lock().unwrap().values().cloned().collect()
    }

    /// Makes `save_document` and `delete_document` fail from now on
    pub fn fail_document_writes(&self) {
        self.failing_document_writes.store(true, Ordering::SeqCst);
    }

    fn check_document_write(&self) -> anyhow::Result<()> {
        if self.failing_document_writes.load(Ordering::SeqCst) {
            anyhow::bail!("database is locked");
        }
        Ok(())
    }
}

#[async_trait]
impl IFolderStore for MockStore {
    async fn save_folder(&self, folder: &LocalFolder) -> anyhow::Result<()> {
        self.folders
            .lock()
            .unwrap()
            .insert(*folder.id(), folder.clone());
        Ok(())
    }

    async fn get_folder(&self, id: &FolderId) -> anyhow::Result<Option<LocalFolder>> {
        Ok(self.folders.lock().unwrap().get(id).cloned())
    }

    async fn list_folders(&self, user: &UserId) -> anyhow::Result<Vec<LocalFolder>> {
        let mut folders: Vec<LocalFolder> = self
            .folders
            .lock()
            .unwrap()
            .values()
            .filter(|f| f.is_owned_by(user))
            .cloned()
            .collect();
        folders.sort_by_key(|f| (f.created_at(), *f.id()));
        Ok(folders)
    }

    async fn find_folder_by_remote(
        &self,
        user: &UserId,
        remote_id: &RemoteId,
    ) -> anyhow::Result<Option<LocalFolder>> {
        Ok(self
            .folders
            .lock()
            .unwrap()
            .values()
            .find(|f| f.is_owned_by(user) && f.remote_folder_id() == Some(remote_id))
            .cloned())
    }

    async fn delete_folder(&self, id: &FolderId) -> anyhow::Result<bool> {
        self.documents
            .lock()
            .unwrap()
            .retain(|_, d| d.folder_id() != id);
        Ok(self.folders.lock().unwrap().remove(id).is_some())
    }

    async fn save_document(&self, document: &LocalDocument) -> anyhow::Result<()> {
        self.check_document_write()?;
        self.documents
            .lock()
            .unwrap()
            .insert(*document.id(), document.clone());
        Ok(())
    }

    async fn get_document(&self, id: &DocumentId) -> anyhow::Result<Option<LocalDocument>> {
        Ok(self.documents.lock().unwrap().get(id).cloned())
    }

    async fn list_documents(&self, folder: &FolderId) -> anyhow::Result<Vec<LocalDocument>> {
        let mut docs: Vec<LocalDocument> = self
            .documents
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.folder_id() == folder)
            .cloned()
            .collect();
        docs.sort_by_key(|d| (d.uploaded_at(), *d.id()));
        Ok(docs)
    }

    async fn delete_document(&self, id: &DocumentId) -> anyhow::Result<bool> {
        self.check_document_write()?;
        Ok(self.documents.lock().unwrap().remove(id).is_some())
    }

    async fn count_documents(&self, folder: &FolderId) -> anyhow::Result<u64> {
        Ok(self.list_documents(folder).await?.len() as u64)
    }
}

// ============================================================================
// Document storage
// ============================================================================

/// Tracks "files" by path and size without touching the disk
#[derive(Default)]
pub struct MockStorage {
    files: Mutex<HashMap<PathBuf, u64>>,
    counter: Mutex<u32>,
}

impl MockStorage {
    pub fn add_source(&self, path: impl Into<PathBuf>, size: u64) {
        self.files.lock().unwrap().insert(path.into(), size);
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }
}

#[async_trait]
impl IDocumentStorage for MockStorage {
    fn reserve(&self) -> ReservedPath {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        let stored_name = format!("stored-{counter}.pdf");
        ReservedPath {
            path: PathBuf::from("/uploads").join(&stored_name),
            stored_name,
        }
    }

    async fn commit(&self, reserved: ReservedPath) -> anyhow::Result<StoredFile> {
        let size = self
            .files
            .lock()
            .unwrap()
            .get(&reserved.path)
            .copied()
            .unwrap_or(0);
        Ok(StoredFile {
            stored_name: reserved.stored_name,
            path: reserved.path,
            size_bytes: size,
        })
    }

    async fn import_file(&self, source: &Path) -> anyhow::Result<StoredFile> {
        let size = self
            .files
            .lock()
            .unwrap()
            .get(source)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("missing source"))?;
        let reserved = self.reserve();
        self.files
            .lock()
            .unwrap()
            .insert(reserved.path.clone(), size);
        self.commit(reserved).await
    }

    async fn file_size(&self, path: &Path) -> anyhow::Result<Option<u64>> {
        Ok(self.files.lock().unwrap().get(path).copied())
    }

    async fn remove(&self, path: &Path) -> anyhow::Result<bool> {
        Ok(self.files.lock().unwrap().remove(path).is_some())
    }
}

pub struct MockExtractor;

#[async_trait]
impl ITextExtractor for MockExtractor {
    async fn extract_text(&self, path: &Path) -> String {
        format!("text of {}", path.display())
    }
}

// ============================================================================
// Remote
// ============================================================================

#[derive(Default)]
pub struct MockRemote {
    pub fail_writes: bool,
    pub items: Mutex<HashMap<RemoteId, RemoteItem>>,
    pub calls: Mutex<Vec<String>>,
    counter: Mutex<u32>,
}

impl MockRemote {
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn with_folder(self, id: &str, name: &str) -> Self {
        let id = RemoteId::new(id).unwrap();
        self.items.lock().unwrap().insert(
            id.clone(),
            RemoteItem {
                id,
                name: name.to_string(),
                mime_type: "application/vnd.google-apps.folder".to_string(),
                is_folder: true,
                parents: Vec::new(),
                size_bytes: None,
                modified_at: None,
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(call);
        if self.fail_writes {
            Err(RemoteError::Server {
                status: 500,
                message: "backend error".to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn next_id(&self, prefix: &str) -> RemoteId {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        RemoteId::new(format!("{prefix}{counter}")).unwrap()
    }
}

#[async_trait]
impl IRemoteStorage for MockRemote {
    async fn list_child_folders(
        &self,
        _query: &FolderQuery,
    ) -> Result<Vec<RemoteFolderRef>, RemoteError> {
        Ok(Vec::new())
    }

    async fn list_child_files(
        &self,
        _parent: &RemoteId,
        _mime_filter: Option<&str>,
        _limit: PageLimit,
    ) -> Result<Vec<RemoteFileRef>, RemoteError> {
        Ok(Vec::new())
    }

    async fn create_folder(
        &self,
        name: &str,
        _parent: Option<&RemoteId>,
    ) -> Result<RemoteId, RemoteError> {
        self.record(format!("create_folder:{name}"))?;
        Ok(self.next_id("folder"))
    }

    async fn delete_folder(&self, id: &RemoteId) -> Result<bool, RemoteError> {
        self.record(format!("delete_folder:{id}"))?;
        Ok(self.items.lock().unwrap().remove(id).is_some())
    }

    async fn upload_file(
        &self,
        parent: &RemoteId,
        _local_path: &Path,
        display_name: Option<&str>,
    ) -> Result<RemoteId, RemoteError> {
        self.record(format!("upload:{parent}:{}", display_name.unwrap_or_default()))?;
        Ok(self.next_id("file"))
    }

    async fn download_file(&self, _id: &RemoteId, _dest: &Path) -> Result<bool, RemoteError> {
        Ok(false)
    }

    async fn delete_file(&self, id: &RemoteId) -> Result<bool, RemoteError> {
        self.record(format!("delete_file:{id}"))?;
        Ok(true)
    }

    async fn get_metadata(&self, id: &RemoteId) -> Result<Option<RemoteItem>, RemoteError> {
        Ok(self.items.lock().unwrap().get(id).cloned())
    }
}

/// Connector that hands out one shared session, or none at all
pub struct MockConnector {
    remote: Option<Arc<MockRemote>>,
}

impl MockConnector {
    pub fn with(remote: Arc<MockRemote>) -> Self {
        Self {
            remote: Some(remote),
        }
    }

    pub fn unconfigured() -> Self {
        Self { remote: None }
    }
}

#[async_trait]
impl IRemoteConnector for MockConnector {
    async fn connect(&self, _user: &UserId) -> Result<Arc<dyn IRemoteStorage>, RemoteError> {
        match &self.remote {
            Some(remote) => Ok(remote.clone() as Arc<dyn IRemoteStorage>),
            None => Err(RemoteError::NotConfigured),
        }
    }
}
