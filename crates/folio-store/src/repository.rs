//! SQLite implementation of IFolderStore and ICredentialStore
//!
//! ## Type Mapping
//!
//! | Domain Type            | SQL Type | Strategy                                   |
//! |------------------------|----------|--------------------------------------------|
//! | FolderId, DocumentId   | TEXT     | UUID string via `.to_string()` / `FromStr` |
//! | UserId, RemoteId       | TEXT     | String via `.as_str()` / `new()`           |
//! | PathBuf                | TEXT     | Lossy UTF-8 path string                    |
//! | DateTime<Utc>          | TEXT     | RFC 3339 with fixed nanosecond precision   |
//! | RemoteCredentials      | TEXT     | serde_json serialization                   |
//!
//! Timestamps are written with a fixed width so that text ordering in SQL
//! matches chronological ordering.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use folio_core::domain::{
    newtypes::{DocumentId, FolderId, RemoteId, UserId},
    LocalDocument, LocalFolder,
};
use folio_core::ports::{ICredentialStore, IFolderStore, RemoteCredentials};

use crate::StoreError;

/// SQLite-based implementation of the folder store and credential store ports
#[derive(Clone)]
pub struct SqliteFolderStore {
    pool: SqlitePool,
}

impl SqliteFolderStore {
    /// Creates a new store over the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a DateTime<Utc> from an ISO 8601 string
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // SQLite's own CURRENT_TIMESTAMP format
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| {
            StoreError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

fn parse_optional_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}

fn parse_optional_remote_id(s: Option<String>) -> Result<Option<RemoteId>, StoreError> {
    s.map(|id| {
        RemoteId::new(id).map_err(|e| StoreError::SerializationError(e.to_string()))
    })
    .transpose()
}

// ============================================================================
// Row mapping functions
// ============================================================================

fn folder_from_row(row: &SqliteRow) -> Result<LocalFolder, StoreError> {
    let id_str: String = row.get("id");
    let user_str: String = row.get("user_id");
    let name: String = row.get("name");
    let remote_str: Option<String> = row.get("remote_folder_id");
    let last_sync_str: Option<String> = row.get("last_sync_at");
    let created_str: String = row.get("created_at");

    let id = FolderId::from_str(&id_str)
        .map_err(|e| StoreError::SerializationError(e.to_string()))?;
    let user_id =
        UserId::new(user_str).map_err(|e| StoreError::SerializationError(e.to_string()))?;

    Ok(LocalFolder::with_id(
        id,
        user_id,
        name,
        parse_optional_remote_id(remote_str)?,
        parse_optional_datetime(last_sync_str)?,
        parse_datetime(&created_str)?,
    ))
}

fn document_from_row(row: &SqliteRow) -> Result<LocalDocument, StoreError> {
    let id_str: String = row.get("id");
    let folder_str: String = row.get("folder_id");
    let stored_name: String = row.get("stored_name");
    let original_name: String = row.get("original_name");
    let file_path: String = row.get("file_path");
    let content: String = row.get("content");
    let size_bytes: i64 = row.get("size_bytes");
    let remote_str: Option<String> = row.get("remote_file_id");
    let uploaded_str: String = row.get("uploaded_at");

    let id = DocumentId::from_str(&id_str)
        .map_err(|e| StoreError::SerializationError(e.to_string()))?;
    let folder_id = FolderId::from_str(&folder_str)
        .map_err(|e| StoreError::SerializationError(e.to_string()))?;

    Ok(LocalDocument::with_id(
        id,
        folder_id,
        stored_name,
        original_name,
        PathBuf::from(file_path),
        content,
        size_bytes.max(0) as u64,
        parse_optional_remote_id(remote_str)?,
        parse_datetime(&uploaded_str)?,
    ))
}

// ============================================================================
// IFolderStore implementation
// ============================================================================

#[async_trait::async_trait]
impl IFolderStore for SqliteFolderStore {
    // --- Folder operations ---

    async fn save_folder(&self, folder: &LocalFolder) -> anyhow::Result<()> {
        let id = folder.id().to_string();
        let remote = folder.remote_folder_id().map(|r| r.as_str().to_string());
        let last_sync = folder.last_sync_at().map(|dt| format_datetime(&dt));

        // last_sync_at only ever moves forward, even across concurrent writers
        sqlx::query(
            "INSERT INTO folders \
             (id, user_id, name, remote_folder_id, last_sync_at, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
               name = excluded.name, \
               remote_folder_id = excluded.remote_folder_id, \
               last_sync_at = CASE \
                 WHEN folders.last_sync_at IS NULL \
                   OR excluded.last_sync_at > folders.last_sync_at \
                 THEN excluded.last_sync_at \
                 ELSE folders.last_sync_at END",
        )
        .bind(&id)
        .bind(folder.user_id().as_str())
        .bind(folder.name())
        .bind(&remote)
        .bind(&last_sync)
        .bind(format_datetime(&folder.created_at()))
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        tracing::trace!(folder_id = %id, "Saved folder");
        Ok(())
    }

    async fn get_folder(&self, id: &FolderId) -> anyhow::Result<Option<LocalFolder>> {
        let row = sqlx::query("SELECT * FROM folders WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(folder_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn list_folders(&self, user: &UserId) -> anyhow::Result<Vec<LocalFolder>> {
        let rows = sqlx::query(
            "SELECT * FROM folders WHERE user_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut folders = Vec::with_capacity(rows.len());
        for row in &rows {
            folders.push(folder_from_row(row)?);
        }
        Ok(folders)
    }

    async fn find_folder_by_remote(
        &self,
        user: &UserId,
        remote_id: &RemoteId,
    ) -> anyhow::Result<Option<LocalFolder>> {
        let row = sqlx::query("SELECT * FROM folders WHERE user_id = ? AND remote_folder_id = ?")
            .bind(user.as_str())
            .bind(remote_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(folder_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn delete_folder(&self, id: &FolderId) -> anyhow::Result<bool> {
        let id_str = id.to_string();

        // Documents go with the folder through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM folders WHERE id = ?")
            .bind(&id_str)
            .execute(&self.pool)
            .await?;

        tracing::trace!(folder_id = %id_str, "Deleted folder");
        Ok(result.rows_affected() > 0)
    }

    // --- Document operations ---

    async fn save_document(&self, document: &LocalDocument) -> anyhow::Result<()> {
        let id = document.id().to_string();
        let remote = document.remote_file_id().map(|r| r.as_str().to_string());
        let file_path = document.file_path().to_string_lossy().into_owned();
        let size_bytes = i64::try_from(document.size_bytes()).unwrap_or(i64::MAX);

        sqlx::query(
            "INSERT INTO documents \
             (id, folder_id, stored_name, original_name, file_path, content, \
              size_bytes, remote_file_id, uploaded_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
               stored_name = excluded.stored_name, \
               original_name = excluded.original_name, \
               file_path = excluded.file_path, \
               content = excluded.content, \
               size_bytes = excluded.size_bytes, \
               remote_file_id = excluded.remote_file_id, \
               uploaded_at = excluded.uploaded_at",
        )
        .bind(&id)
        .bind(document.folder_id().to_string())
        .bind(document.stored_name())
        .bind(document.original_name())
        .bind(&file_path)
        .bind(document.content())
        .bind(size_bytes)
        .bind(&remote)
        .bind(format_datetime(&document.uploaded_at()))
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        tracing::trace!(document_id = %id, "Saved document");
        Ok(())
    }

    async fn get_document(&self, id: &DocumentId) -> anyhow::Result<Option<LocalDocument>> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(document_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn list_documents(&self, folder: &FolderId) -> anyhow::Result<Vec<LocalDocument>> {
        let rows = sqlx::query(
            "SELECT * FROM documents WHERE folder_id = ? ORDER BY uploaded_at ASC, id ASC",
        )
        .bind(folder.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in &rows {
            documents.push(document_from_row(row)?);
        }
        Ok(documents)
    }

    async fn delete_document(&self, id: &DocumentId) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_documents(&self, folder: &FolderId) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE folder_id = ?")
            .bind(folder.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

// ============================================================================
// ICredentialStore implementation
// ============================================================================

#[async_trait::async_trait]
impl ICredentialStore for SqliteFolderStore {
    async fn load_credentials(&self, user: &UserId) -> anyhow::Result<Option<RemoteCredentials>> {
        let json: Option<String> =
            sqlx::query_scalar("SELECT credentials_json FROM remote_credentials WHERE user_id = ?")
                .bind(user.as_str())
                .fetch_optional(&self.pool)
                .await?;

        match json {
            Some(json) => {
                let credentials = serde_json::from_str(&json).map_err(|e| {
                    StoreError::SerializationError(format!("Invalid credentials JSON: {e}"))
                })?;
                Ok(Some(credentials))
            }
            None => Ok(None),
        }
    }

    async fn save_credentials(
        &self,
        user: &UserId,
        credentials: &RemoteCredentials,
    ) -> anyhow::Result<()> {
        let json = serde_json::to_string(credentials)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;

        sqlx::query(
            "INSERT INTO remote_credentials (user_id, credentials_json, updated_at) \
             VALUES (?, ?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET \
               credentials_json = excluded.credentials_json, \
               updated_at = excluded.updated_at",
        )
        .bind(user.as_str())
        .bind(&json)
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool)
        .await?;

        tracing::debug!(user_id = %user, "Saved remote credentials");
        Ok(())
    }

    async fn clear_credentials(&self, user: &UserId) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM remote_credentials WHERE user_id = ?")
            .bind(user.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
