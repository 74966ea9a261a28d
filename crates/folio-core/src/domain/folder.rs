//! LocalFolder domain entity
//!
//! A LocalFolder groups a user's documents and may be linked to a folder
//! on the remote storage provider. Linked folders take part in scheduled
//! reconciliation; unlinked folders are purely local.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    errors::DomainError,
    newtypes::{FolderId, RemoteId, UserId},
};

/// Maximum length of a folder display name, in characters
pub const MAX_NAME_LEN: usize = 255;

/// Scheduling state of a folder with respect to automatic reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderSyncState {
    /// No remote link; never scheduled
    Unlinked,
    /// Linked and eligible for a pass
    Due,
    /// Linked, synced less than the minimum interval ago
    Cooling,
}

impl std::fmt::Display for FolderSyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FolderSyncState::Unlinked => write!(f, "unlinked"),
            FolderSyncState::Due => write!(f, "due"),
            FolderSyncState::Cooling => write!(f, "cooling"),
        }
    }
}

/// Validates and normalizes a display name for folders and documents
///
/// # Errors
/// Returns `DomainError::InvalidName` if the trimmed name is empty or too long
pub fn normalize_name(name: &str) -> Result<String, DomainError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidName("name cannot be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::InvalidName(format!(
            "name exceeds {MAX_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// A user's local folder, optionally linked to a remote folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFolder {
    /// Unique identifier for this folder
    id: FolderId,
    /// Owning user
    user_id: UserId,
    /// Display name
    name: String,
    /// Linked remote folder (None = local-only)
    remote_folder_id: Option<RemoteId>,
    /// Completion time of the last reconciliation pass (None = never synced)
    last_sync_at: Option<DateTime<Utc>>,
    /// When this folder was created
    created_at: DateTime<Utc>,
}

impl LocalFolder {
    /// Creates a new unlinked folder
    ///
    /// # Errors
    /// Returns `DomainError::InvalidName` for an empty or oversized name
    pub fn new(user_id: UserId, name: &str) -> Result<Self, DomainError> {
        Ok(Self {
            id: FolderId::new(),
            user_id,
            name: normalize_name(name)?,
            remote_folder_id: None,
            last_sync_at: None,
            created_at: Utc::now(),
        })
    }

    /// Creates a folder with a specific ID (for reconstitution from storage)
    pub fn with_id(
        id: FolderId,
        user_id: UserId,
        name: impl Into<String>,
        remote_folder_id: Option<RemoteId>,
        last_sync_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            name: name.into(),
            remote_folder_id,
            last_sync_at,
            created_at,
        }
    }

    // --- Getters ---

    /// Returns the folder's unique identifier
    pub fn id(&self) -> &FolderId {
        &self.id
    }

    /// Returns the owning user
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the linked remote folder, if any
    pub fn remote_folder_id(&self) -> Option<&RemoteId> {
        self.remote_folder_id.as_ref()
    }

    /// Returns the last sync timestamp, if any
    pub fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        self.last_sync_at
    }

    /// Returns when the folder was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns true if the folder holds a remote link
    pub fn is_linked(&self) -> bool {
        self.remote_folder_id.is_some()
    }

    /// Returns true if the folder belongs to `user`
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.user_id == user
    }

    // --- Mutations ---

    /// Links the folder to a remote folder
    pub fn link_remote(&mut self, remote_id: RemoteId) {
        self.remote_folder_id = Some(remote_id);
    }

    /// Renames the folder
    ///
    /// # Errors
    /// Returns `DomainError::InvalidName` for an empty or oversized name
    pub fn rename(&mut self, name: &str) -> Result<(), DomainError> {
        self.name = normalize_name(name)?;
        Ok(())
    }

    /// Records a completed reconciliation pass
    ///
    /// The stored timestamp never moves backwards: an `at` older than the
    /// current value leaves it untouched. Returns the effective timestamp.
    pub fn record_sync(&mut self, at: DateTime<Utc>) -> DateTime<Utc> {
        let effective = match self.last_sync_at {
            Some(previous) if previous > at => previous,
            _ => at,
        };
        self.last_sync_at = Some(effective);
        effective
    }

    /// Computes the scheduling state at `now`
    ///
    /// Unlinked folders have no schedule. Never-synced folders are always
    /// due; otherwise the folder is due once `min_interval` has elapsed since
    /// the last pass.
    pub fn sync_state(&self, now: DateTime<Utc>, min_interval: Duration) -> FolderSyncState {
        if !self.is_linked() {
            return FolderSyncState::Unlinked;
        }
        match self.last_sync_at {
            None => FolderSyncState::Due,
            Some(last) => {
                let interval = chrono::Duration::from_std(min_interval)
                    .unwrap_or_else(|_| chrono::Duration::days(365 * 1000));
                if now.signed_duration_since(last) >= interval {
                    FolderSyncState::Due
                } else {
                    FolderSyncState::Cooling
                }
            }
        }
    }
}
