//! Folio Store - Local metadata persistence
//!
//! SQLite-based store for:
//! - Local folders and their remote links
//! - Documents with their extracted text
//! - Per-user remote provider credentials
//!
//! ## Architecture
//!
//! This crate implements the `IFolderStore` and `ICredentialStore` ports
//! from `folio-core` using SQLite as the storage backend. It is a driven
//! (secondary) adapter in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteFolderStore`] - `IFolderStore` and `ICredentialStore` implementation
//! - [`StoreError`] - Error types for store operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use folio_store::{DatabasePool, SqliteFolderStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/home/user/.local/share/folio/folio.db")).await?;
//! let store = SqliteFolderStore::new(pool.pool().clone());
//! // Use store as IFolderStore...
//! # Ok(())
//! # }
//! ```

pub mod pool;
pub mod repository;

pub use pool::DatabasePool;
pub use repository::SqliteFolderStore;

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored row could not be turned back into a domain value
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A uniqueness rule was violated (duplicate remote link)
    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::ConstraintViolation(db.message().to_string())
            }
            _ => StoreError::QueryFailed(e.to_string()),
        }
    }
}
