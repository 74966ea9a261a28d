//! Per-folder mutual exclusion
//!
//! Reconciliation passes and folder deletion for the same folder must not
//! interleave. [`FolderLocks`] hands out one async mutex per folder ID; the
//! owned guard is held for the whole operation.

use std::sync::Arc;

use dashmap::DashMap;
use folio_core::domain::FolderId;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

/// Registry of per-folder locks, cheap to clone and share
#[derive(Debug, Clone, Default)]
pub struct FolderLocks {
    inner: Arc<DashMap<FolderId, Arc<Mutex<()>>>>,
}

impl FolderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn mutex_for(&self, folder: &FolderId) -> Arc<Mutex<()>> {
        self.inner
            .entry(*folder)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Waits for and acquires the folder's lock
    pub async fn lock(&self, folder: &FolderId) -> OwnedMutexGuard<()> {
        let mutex = self.mutex_for(folder);
        trace!(folder_id = %folder, "Waiting for folder lock");
        mutex.lock_owned().await
    }

    /// Acquires the folder's lock if nobody holds it
    pub fn try_lock(&self, folder: &FolderId) -> Option<OwnedMutexGuard<()>> {
        self.mutex_for(folder).try_lock_owned().ok()
    }

    /// Drops the registry entry of a folder that no longer exists
    ///
    /// Entries still held or awaited are kept.
    pub fn forget(&self, folder: &FolderId) {
        self.inner
            .remove_if(folder, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    /// Number of folders with a registered lock
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
