//! Throttled background import passes
//!
//! Listing a user's folders gives every linked folder a chance to pick up
//! new remote files. The [`SyncScheduler`] decides which folders are due,
//! opens one remote session for all of them and runs an import-only pass
//! on each:
//!
//! ```text
//! list folders ──→ SyncScheduler::run_due ──→ due? ──→ ReconciliationEngine
//!                                              │
//!                                         cooling: skipped
//! ```
//!
//! A folder's first pass may import up to `first_sync_import_cap` files;
//! later passes import at most `steady_import_cap`. Failures are logged per
//! folder and never reach the caller.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use folio_core::config::SyncConfig;
use folio_core::domain::{FolderId, FolderSyncState, LocalFolder, RemoteError, UserId};
use folio_core::ports::{IRemoteConnector, IRemoteStorage};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::engine::{ReconciliationEngine, SyncOptions, SyncReport};
use crate::SyncError;

/// What the scheduler did for one linked folder
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledRun {
    pub folder_id: FolderId,
    /// State at the scheduling decision
    pub state: FolderSyncState,
    /// Report of the pass, if one ran
    pub report: Option<SyncReport>,
    /// Why the pass failed, if it did
    pub error: Option<String>,
}

impl ScheduledRun {
    fn skipped(folder_id: FolderId, state: FolderSyncState) -> Self {
        Self {
            folder_id,
            state,
            report: None,
            error: None,
        }
    }
}

/// Runs import-only passes on due folders
pub struct SyncScheduler {
    engine: Arc<ReconciliationEngine>,
    connector: Arc<dyn IRemoteConnector>,
    min_interval: Duration,
    first_sync_import_cap: usize,
    steady_import_cap: usize,
}

impl SyncScheduler {
    pub fn new(
        engine: Arc<ReconciliationEngine>,
        connector: Arc<dyn IRemoteConnector>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            engine,
            connector,
            min_interval: Duration::from_secs(config.min_interval_secs),
            first_sync_import_cap: config.first_sync_import_cap,
            steady_import_cap: config.steady_import_cap,
        }
    }

    /// Import cap for a folder's next automatic pass
    pub fn import_cap_for(&self, folder: &LocalFolder) -> usize {
        if folder.last_sync_at().is_none() {
            self.first_sync_import_cap
        } else {
            self.steady_import_cap
        }
    }

    /// Runs a pass on every due folder of `user`, as of `now`
    ///
    /// Folders are visited in creation order. Unlinked folders are ignored;
    /// cooling folders are reported without a pass. The remote session is
    /// only opened once a due folder is found, and an unconfigured remote
    /// skips the whole round quietly.
    #[tracing::instrument(skip(self, folders), fields(user = %user, folders = folders.len()))]
    pub async fn run_due(
        &self,
        user: &UserId,
        folders: &[LocalFolder],
        now: DateTime<Utc>,
    ) -> Vec<ScheduledRun> {
        let mut ordered: Vec<&LocalFolder> =
            folders.iter().filter(|f| f.is_owned_by(user)).collect();
        ordered.sort_by_key(|f| (f.created_at(), *f.id()));

        let mut runs = Vec::new();
        let mut session: Option<Arc<dyn IRemoteStorage>> = None;

        for folder in ordered {
            let state = folder.sync_state(now, self.min_interval);
            match state {
                FolderSyncState::Unlinked => continue,
                FolderSyncState::Cooling => {
                    debug!(folder_id = %folder.id(), "Folder is cooling down");
                    runs.push(ScheduledRun::skipped(*folder.id(), state));
                    continue;
                }
                FolderSyncState::Due => {}
            }

            let remote = match &session {
                Some(remote) => remote.clone(),
                None => match self.connector.connect(user).await {
                    Ok(remote) => {
                        session = Some(remote.clone());
                        remote
                    }
                    Err(RemoteError::NotConfigured) => {
                        debug!("Remote storage not configured, skipping background passes");
                        return runs;
                    }
                    Err(e) => {
                        warn!(error = %e, "Could not open remote session for background passes");
                        return runs;
                    }
                },
            };

            let cap = self.import_cap_for(folder);
            let options = SyncOptions::import_only(Some(cap)).throttled(self.min_interval, now);

            let run = match self.engine.reconcile(remote.as_ref(), folder.id(), options).await {
                Ok(report) => {
                    if report.imported > 0 {
                        info!(
                            folder_id = %folder.id(),
                            imported = report.imported,
                            cap,
                            "Background pass imported files"
                        );
                    }
                    ScheduledRun {
                        folder_id: *folder.id(),
                        state,
                        report: Some(report),
                        error: None,
                    }
                }
                Err(e) => {
                    log_failure(folder.id(), &e);
                    ScheduledRun {
                        folder_id: *folder.id(),
                        state,
                        report: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            runs.push(run);
        }

        runs
    }
}

fn log_failure(folder_id: &FolderId, err: &SyncError) {
    match err {
        SyncError::FolderNotFound(_) => {
            debug!(folder_id = %folder_id, "Folder deleted before its background pass")
        }
        _ => warn!(folder_id = %folder_id, error = %err, "Background pass failed"),
    }
}
