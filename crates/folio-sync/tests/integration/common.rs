//! Shared fixtures for folio-sync integration tests
//!
//! [`FakeDrive`] keeps remote folders and files in memory and can be told to
//! fail individual downloads or listings. [`Harness`] wires it to a real
//! store and document storage.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Notify;

use folio_core::config::{Config, ConfigBuilder};
use folio_core::domain::{
    LocalDocument, LocalFolder, RemoteError, RemoteId, RemoteParent, RequestContext, UserId,
    PDF_MIME_TYPE,
};
use folio_core::ports::{
    name_matches, FolderQuery, IDocumentStorage, IFolderStore, IRemoteConnector, IRemoteStorage,
    ITextExtractor, PageLimit, RemoteFileRef, RemoteFolderRef, RemoteItem,
};
use folio_store::{DatabasePool, SqliteFolderStore};
use folio_sync::{FolderLocks, FolderService, LocalDocumentStorage, ReconciliationEngine};

pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

pub fn rid(s: &str) -> RemoteId {
    RemoteId::new(s).unwrap()
}

pub fn alice() -> UserId {
    UserId::new("alice").unwrap()
}

pub fn ctx() -> RequestContext {
    RequestContext::new(alice())
}

// ============================================================================
// FakeDrive
// ============================================================================

#[derive(Debug, Clone)]
pub struct FakeFile {
    pub parent: RemoteId,
    pub name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

#[derive(Default)]
struct DriveState {
    folders: HashMap<RemoteId, String>,
    files: HashMap<RemoteId, FakeFile>,
    failing_downloads: HashSet<RemoteId>,
    failing_listings: HashSet<RemoteId>,
    list_calls: usize,
    download_calls: usize,
    uploads: Vec<String>,
    counter: u32,
}

/// Holds uploads until released
#[derive(Default)]
pub struct UploadGate {
    /// Notified when an upload reaches the gate
    pub started: Notify,
    pub release: Notify,
}

/// In-memory remote storage
#[derive(Default)]
pub struct FakeDrive {
    state: Mutex<DriveState>,
    upload_gate: Mutex<Option<Arc<UploadGate>>>,
}

impl FakeDrive {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_folder(&self, id: &str, name: &str) {
        self.state
            .lock()
            .unwrap()
            .folders
            .insert(rid(id), name.to_string());
    }

    pub fn remove_folder(&self, id: &str) {
        let mut state = self.state.lock().unwrap();
        state.folders.remove(&rid(id));
        state.files.retain(|_, f| f.parent != rid(id));
    }

    pub fn add_file(&self, parent: &str, id: &str, name: &str, mime_type: &str, content: &str) {
        self.state.lock().unwrap().files.insert(
            rid(id),
            FakeFile {
                parent: rid(parent),
                name: name.to_string(),
                mime_type: mime_type.to_string(),
                content: content.as_bytes().to_vec(),
            },
        );
    }

    /// Adds a PDF whose extracted text (see [`RawTextExtractor`]) is `text`
    pub fn add_pdf(&self, parent: &str, id: &str, name: &str, text: &str) {
        self.add_file(parent, id, name, PDF_MIME_TYPE, text);
    }

    pub fn rename_file(&self, id: &str, name: &str) {
        if let Some(file) = self.state.lock().unwrap().files.get_mut(&rid(id)) {
            file.name = name.to_string();
        }
    }

    pub fn set_content(&self, id: &str, text: &str) {
        if let Some(file) = self.state.lock().unwrap().files.get_mut(&rid(id)) {
            file.content = text.as_bytes().to_vec();
        }
    }

    pub fn remove_file(&self, id: &str) {
        self.state.lock().unwrap().files.remove(&rid(id));
    }

    /// Makes every following upload wait at the returned gate
    pub fn hold_uploads(&self) -> Arc<UploadGate> {
        let gate = Arc::new(UploadGate::default());
        *self.upload_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn fail_download(&self, id: &str) {
        self.state.lock().unwrap().failing_downloads.insert(rid(id));
    }

    pub fn fail_listing(&self, folder: &str) {
        self.state.lock().unwrap().failing_listings.insert(rid(folder));
    }

    pub fn files_in(&self, folder: &str) -> Vec<FakeFile> {
        self.state
            .lock()
            .unwrap()
            .files
            .values()
            .filter(|f| f.parent == rid(folder))
            .cloned()
            .collect()
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    pub fn download_calls(&self) -> usize {
        self.state.lock().unwrap().download_calls
    }

    pub fn uploads(&self) -> Vec<String> {
        self.state.lock().unwrap().uploads.clone()
    }

    fn next_id(state: &mut DriveState, prefix: &str) -> RemoteId {
        state.counter += 1;
        rid(&format!("{prefix}{}", state.counter))
    }
}

#[async_trait]
impl IRemoteStorage for FakeDrive {
    async fn list_child_folders(
        &self,
        query: &FolderQuery,
    ) -> Result<Vec<RemoteFolderRef>, RemoteError> {
        let state = self.state.lock().unwrap();
        let mut folders: Vec<RemoteFolderRef> = state
            .folders
            .iter()
            .filter(|(_, name)| {
                query
                    .name_filter
                    .as_deref()
                    .map_or(true, |filter| name_matches(name, filter))
            })
            .filter(|_| !matches!(query.parent, RemoteParent::Id(_)))
            .map(|(id, name)| RemoteFolderRef {
                id: id.clone(),
                name: name.clone(),
                parent_id: None,
                modified_at: None,
            })
            .collect();
        folders.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(cap) = query.limit.cap() {
            folders.truncate(cap);
        }
        Ok(folders)
    }

    async fn list_child_files(
        &self,
        parent: &RemoteId,
        mime_filter: Option<&str>,
        limit: PageLimit,
    ) -> Result<Vec<RemoteFileRef>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        if state.failing_listings.contains(parent) {
            return Err(RemoteError::Server {
                status: 500,
                message: "backend error".to_string(),
            });
        }

        let mut files: Vec<RemoteFileRef> = state
            .files
            .iter()
            .filter(|(_, f)| &f.parent == parent)
            .filter(|(_, f)| mime_filter.map_or(true, |m| f.mime_type == m))
            .map(|(id, f)| RemoteFileRef {
                id: id.clone(),
                name: f.name.clone(),
                mime_type: f.mime_type.clone(),
                size_bytes: Some(f.content.len() as u64),
                modified_at: None,
            })
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        if let Some(cap) = limit.cap() {
            files.truncate(cap);
        }
        Ok(files)
    }

    async fn create_folder(
        &self,
        name: &str,
        _parent: Option<&RemoteId>,
    ) -> Result<RemoteId, RemoteError> {
        let mut state = self.state.lock().unwrap();
        let id = Self::next_id(&mut state, "folder");
        state.folders.insert(id.clone(), name.to_string());
        Ok(id)
    }

    async fn delete_folder(&self, id: &RemoteId) -> Result<bool, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.files.retain(|_, f| &f.parent != id);
        Ok(state.folders.remove(id).is_some())
    }

    async fn upload_file(
        &self,
        parent: &RemoteId,
        local_path: &Path,
        display_name: Option<&str>,
    ) -> Result<RemoteId, RemoteError> {
        let gate = self.upload_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }

        let content = std::fs::read(local_path).map_err(|e| RemoteError::Io(e.to_string()))?;
        let name = display_name.unwrap_or("file.pdf").to_string();

        let mut state = self.state.lock().unwrap();
        let id = Self::next_id(&mut state, "file");
        state.uploads.push(name.clone());
        state.files.insert(
            id.clone(),
            FakeFile {
                parent: parent.clone(),
                name,
                mime_type: PDF_MIME_TYPE.to_string(),
                content,
            },
        );
        Ok(id)
    }

    async fn download_file(&self, id: &RemoteId, dest: &Path) -> Result<bool, RemoteError> {
        let content = {
            let mut state = self.state.lock().unwrap();
            state.download_calls += 1;
            if state.failing_downloads.contains(id) {
                return Err(RemoteError::Transport("connection reset".to_string()));
            }
            match state.files.get(id) {
                Some(file) => file.content.clone(),
                None => return Ok(false),
            }
        };

        // Let concurrent passes interleave with the transfer
        tokio::task::yield_now().await;
        tokio::fs::write(dest, content)
            .await
            .map_err(|e| RemoteError::Io(e.to_string()))?;
        Ok(true)
    }

    async fn delete_file(&self, id: &RemoteId) -> Result<bool, RemoteError> {
        Ok(self.state.lock().unwrap().files.remove(id).is_some())
    }

    async fn get_metadata(&self, id: &RemoteId) -> Result<Option<RemoteItem>, RemoteError> {
        let state = self.state.lock().unwrap();
        if let Some(name) = state.folders.get(id) {
            return Ok(Some(RemoteItem {
                id: id.clone(),
                name: name.clone(),
                mime_type: FOLDER_MIME.to_string(),
                is_folder: true,
                parents: Vec::new(),
                size_bytes: None,
                modified_at: None,
            }));
        }
        Ok(state.files.get(id).map(|f| RemoteItem {
            id: id.clone(),
            name: f.name.clone(),
            mime_type: f.mime_type.clone(),
            is_folder: false,
            parents: vec![f.parent.clone()],
            size_bytes: Some(f.content.len() as u64),
            modified_at: None,
        }))
    }
}

/// Connector handing out the shared fake drive, or nothing
pub struct FakeConnector {
    drive: Option<Arc<FakeDrive>>,
}

impl FakeConnector {
    pub fn with(drive: Arc<FakeDrive>) -> Arc<Self> {
        Arc::new(Self { drive: Some(drive) })
    }

    pub fn unconfigured() -> Arc<Self> {
        Arc::new(Self { drive: None })
    }
}

#[async_trait]
impl IRemoteConnector for FakeConnector {
    async fn connect(&self, _user: &UserId) -> Result<Arc<dyn IRemoteStorage>, RemoteError> {
        match &self.drive {
            Some(drive) => Ok(drive.clone() as Arc<dyn IRemoteStorage>),
            None => Err(RemoteError::NotConfigured),
        }
    }
}

/// Treats the stored bytes as the document text
pub struct RawTextExtractor;

#[async_trait]
impl ITextExtractor for RawTextExtractor {
    async fn extract_text(&self, path: &Path) -> String {
        tokio::fs::read(path)
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub drive: Arc<FakeDrive>,
    pub store: Arc<SqliteFolderStore>,
    pub storage: Arc<LocalDocumentStorage>,
    pub engine: ReconciliationEngine,
    pub dir: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let pool = DatabasePool::in_memory().await.unwrap();
        let store = Arc::new(SqliteFolderStore::new(pool.pool().clone()));
        let storage = Arc::new(LocalDocumentStorage::new(dir.path().join("uploads")));
        storage.ensure_dir().await.unwrap();

        let engine = ReconciliationEngine::new(
            store.clone(),
            storage.clone(),
            Arc::new(RawTextExtractor),
            FolderLocks::new(),
        );

        Self {
            drive: FakeDrive::new(),
            store,
            storage,
            engine,
            dir,
        }
    }

    pub fn config(&self) -> Config {
        ConfigBuilder::new()
            .storage_upload_dir(self.upload_dir())
            .build()
    }

    /// A service over the same store and storage, connected to the fake drive
    pub fn service(&self) -> FolderService {
        self.service_with(FakeConnector::with(self.drive.clone()))
    }

    pub fn service_with(&self, connector: Arc<dyn IRemoteConnector>) -> FolderService {
        FolderService::new(
            &self.config(),
            self.store.clone(),
            self.storage.clone(),
            Arc::new(RawTextExtractor),
            connector,
        )
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    /// Creates a remote folder and a local folder linked to it
    pub async fn linked_folder(&self, remote_id: &str, name: &str) -> LocalFolder {
        self.drive.add_folder(remote_id, name);
        let mut folder = LocalFolder::new(alice(), name).unwrap();
        folder.link_remote(rid(remote_id));
        self.store.save_folder(&folder).await.unwrap();
        folder
    }

    /// Stores a local-only document in `folder`
    pub async fn local_document(&self, folder: &LocalFolder, name: &str, text: &str) -> LocalDocument {
        let source = self.dir.path().join(name);
        tokio::fs::write(&source, text).await.unwrap();
        let stored = self.storage.import_file(&source).await.unwrap();
        let document = LocalDocument::new(*folder.id(), stored, name, text);
        self.store.save_document(&document).await.unwrap();
        document
    }

    pub async fn documents(&self, folder: &LocalFolder) -> Vec<LocalDocument> {
        self.store.list_documents(folder.id()).await.unwrap()
    }

    pub async fn reload(&self, folder: &LocalFolder) -> Option<LocalFolder> {
        self.store.get_folder(folder.id()).await.unwrap()
    }

    /// Number of regular files in the upload directory
    pub fn stored_files(&self) -> usize {
        std::fs::read_dir(self.upload_dir())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().is_file())
            .count()
    }
}
