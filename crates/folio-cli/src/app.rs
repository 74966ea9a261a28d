//! Wiring of adapters for commands that touch folders, documents or Drive
//!
//! [`Environment`] carries what every command gets from the command line:
//! the loaded configuration and the acting user. Adapters are only opened
//! by the commands that need them.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use folio_core::config::Config;
use folio_core::domain::RequestContext;
use folio_core::ports::ICredentialStore;
use folio_drive::{DriveConnector, KeyringCredentialStore};
use folio_store::{DatabasePool, SqliteFolderStore};
use folio_sync::{FolderService, LocalDocumentStorage, PdfTextExtractor};
use tracing::debug;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Credential backend that keeps tokens in the system keyring
pub const KEYRING_BACKEND: &str = "keyring";

pub struct Environment {
    pub config: Config,
    pub config_path: PathBuf,
    user: Option<String>,
    quiet: bool,
}

impl Environment {
    pub fn new(config: Config, config_path: PathBuf, user: Option<String>, quiet: bool) -> Self {
        Self {
            config,
            config_path,
            user,
            quiet,
        }
    }

    pub fn formatter(&self, format: OutputFormat) -> Box<dyn OutputFormatter> {
        get_formatter(format, self.quiet)
    }

    /// The caller's request context
    ///
    /// # Errors
    /// Fails if no user was given on the command line or in `FOLIO_USER`
    pub fn request_context(&self) -> Result<RequestContext> {
        RequestContext::from_session(self.user.as_deref())
            .context("No user given: pass --user or set FOLIO_USER")
    }

    /// Opens (and migrates) the metadata database
    pub async fn open_store(&self) -> Result<Arc<SqliteFolderStore>> {
        let db_path = &self.config.storage.database_path;
        debug!(db_path = %db_path.display(), "Opening database");
        let pool = DatabasePool::new(db_path)
            .await
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;
        Ok(Arc::new(SqliteFolderStore::new(pool.pool().clone())))
    }

    /// The credential store selected by `drive.credential_backend`
    pub fn credential_store(&self, store: Arc<SqliteFolderStore>) -> Arc<dyn ICredentialStore> {
        if self.config.drive.credential_backend == KEYRING_BACKEND {
            Arc::new(KeyringCredentialStore::new())
        } else {
            store
        }
    }

    /// Builds the folder service over SQLite, the upload directory and Drive
    pub async fn service(&self) -> Result<FolderService> {
        let store = self.open_store().await?;

        let storage = Arc::new(LocalDocumentStorage::new(&self.config.storage.upload_dir));
        storage.ensure_dir().await?;

        let credentials = self.credential_store(store.clone());
        let connector = Arc::new(DriveConnector::new(credentials, self.config.drive.clone()));

        Ok(FolderService::new(
            &self.config,
            store,
            storage,
            Arc::new(PdfTextExtractor::new()),
            connector,
        ))
    }
}
