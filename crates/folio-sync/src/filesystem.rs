//! Upload directory adapter (secondary/driven adapter)
//!
//! Implements [`IDocumentStorage`] using `tokio::fs`.
//!
//! ## Design Decisions
//!
//! - **Unique names**: every stored file is named `<uuid-hex>.pdf`, so
//!   concurrent imports never collide and original names never reach the
//!   filesystem.
//! - **Atomic import**: external files are copied to `<name>.tmp` and
//!   renamed into place.
//! - **Confinement**: only files inside the upload directory are removed.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use folio_core::domain::StoredFile;
use folio_core::ports::{IDocumentStorage, ReservedPath};
use tracing::{debug, instrument};
use uuid::Uuid;

/// Stores documents in a single flat upload directory
#[derive(Debug, Clone)]
pub struct LocalDocumentStorage {
    upload_dir: PathBuf,
}

impl LocalDocumentStorage {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Creates the upload directory if it does not exist
    pub async fn ensure_dir(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create upload directory {}",
                    self.upload_dir.display()
                )
            })
    }

    fn unique_name() -> String {
        format!("{}.pdf", Uuid::new_v4().simple())
    }
}

fn tmp_path(target: &Path) -> PathBuf {
    let mut p = target.as_os_str().to_owned();
    p.push(".tmp");
    PathBuf::from(p)
}

#[async_trait::async_trait]
impl IDocumentStorage for LocalDocumentStorage {
    fn reserve(&self) -> ReservedPath {
        let stored_name = Self::unique_name();
        ReservedPath {
            path: self.upload_dir.join(&stored_name),
            stored_name,
        }
    }

    async fn commit(&self, reserved: ReservedPath) -> anyhow::Result<StoredFile> {
        let metadata = tokio::fs::metadata(&reserved.path)
            .await
            .with_context(|| format!("Nothing was written to {}", reserved.path.display()))?;
        if !metadata.is_file() {
            bail!("{} is not a regular file", reserved.path.display());
        }

        Ok(StoredFile {
            stored_name: reserved.stored_name,
            path: reserved.path,
            size_bytes: metadata.len(),
        })
    }

    #[instrument(skip(self), fields(source = %source.display()))]
    async fn import_file(&self, source: &Path) -> anyhow::Result<StoredFile> {
        self.ensure_dir().await?;

        let reserved = self.reserve();
        let tmp = tmp_path(&reserved.path);

        debug!(?tmp, "copying to temporary file");
        if let Err(e) = tokio::fs::copy(source, &tmp).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(anyhow::Error::new(e)
                .context(format!("Failed to copy {} into storage", source.display())));
        }

        if let Err(e) = tokio::fs::rename(&tmp, &reserved.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(anyhow::Error::new(e).context("Failed to move imported file into place"));
        }

        debug!(stored_name = %reserved.stored_name, "import complete");
        self.commit(reserved).await
    }

    async fn file_size(&self, path: &Path) -> anyhow::Result<Option<u64>> {
        match tokio::fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => Ok(Some(metadata.len())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("Failed to stat {}", path.display()))),
        }
    }

    async fn remove(&self, path: &Path) -> anyhow::Result<bool> {
        if !path.starts_with(&self.upload_dir) {
            bail!(
                "Refusing to remove {} outside the upload directory",
                path.display()
            );
        }

        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed stored file");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("Failed to remove {}", path.display()))),
        }
    }
}
