//! LocalDocument domain entity
//!
//! A LocalDocument is a stored PDF plus its extracted text. Documents belong
//! to exactly one folder and may be linked to a file on the remote provider.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{DocumentId, FolderId, RemoteId};

/// Media type of every document Folio manages
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Handle to a file written by the document storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Unique file name inside the upload directory
    pub stored_name: String,
    /// Absolute path of the stored file
    pub path: PathBuf,
    /// Size on disk, in bytes
    pub size_bytes: u64,
}

/// Returns `name` with a `.pdf` extension, appending one when missing
pub fn ensure_pdf_extension(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.to_lowercase().ends_with(".pdf") {
        trimmed.to_string()
    } else {
        format!("{trimmed}.pdf")
    }
}

/// Reduces an untrusted file name to a safe display name
///
/// Path separators become spaces, runs of whitespace become `_`, and only
/// ASCII letters, digits, `.`, `-` and `_` survive. Leading and trailing
/// dots and underscores are stripped.
pub fn secure_file_name(name: &str) -> String {
    let flattened: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Display name for a document taken from an untrusted remote name
///
/// Falls back to `file.pdf` when nothing safe remains and always carries a
/// `.pdf` extension.
pub fn document_display_name(remote_name: &str) -> String {
    let secured = secure_file_name(remote_name);
    if secured.is_empty() {
        "file.pdf".to_string()
    } else {
        ensure_pdf_extension(&secured)
    }
}

/// Returns true if the file name has a `.pdf` extension (case-insensitive)
pub fn has_pdf_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// A stored document with its extracted text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalDocument {
    id: DocumentId,
    folder_id: FolderId,
    stored_name: String,
    original_name: String,
    file_path: PathBuf,
    content: String,
    size_bytes: u64,
    remote_file_id: Option<RemoteId>,
    uploaded_at: DateTime<Utc>,
}

impl LocalDocument {
    /// Creates a new, unlinked document from a stored file
    pub fn new(
        folder_id: FolderId,
        stored: StoredFile,
        original_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: DocumentId::new(),
            folder_id,
            stored_name: stored.stored_name,
            original_name: original_name.into(),
            file_path: stored.path,
            content: content.into(),
            size_bytes: stored.size_bytes,
            remote_file_id: None,
            uploaded_at: Utc::now(),
        }
    }

    /// Creates a document with a specific ID (for reconstitution from storage)
    #[allow(clippy::too_many_arguments)]
    pub fn with_id(
        id: DocumentId,
        folder_id: FolderId,
        stored_name: impl Into<String>,
        original_name: impl Into<String>,
        file_path: PathBuf,
        content: impl Into<String>,
        size_bytes: u64,
        remote_file_id: Option<RemoteId>,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            folder_id,
            stored_name: stored_name.into(),
            original_name: original_name.into(),
            file_path,
            content: content.into(),
            size_bytes,
            remote_file_id,
            uploaded_at,
        }
    }

    // --- Getters ---

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn folder_id(&self) -> &FolderId {
        &self.folder_id
    }

    pub fn stored_name(&self) -> &str {
        &self.stored_name
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn remote_file_id(&self) -> Option<&RemoteId> {
        self.remote_file_id.as_ref()
    }

    pub fn uploaded_at(&self) -> DateTime<Utc> {
        self.uploaded_at
    }

    pub fn is_linked(&self) -> bool {
        self.remote_file_id.is_some()
    }

    /// Returns the first `max_chars` characters of the extracted text
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.content.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.content[..idx],
            None => &self.content,
        }
    }

    // --- Mutations ---

    /// Links the document to a remote file
    pub fn link_remote(&mut self, remote_id: RemoteId) {
        self.remote_file_id = Some(remote_id);
    }

    /// Replaces the stored file, name and text in place, keeping the ID and link
    ///
    /// Returns the previous stored file path so the caller can remove it.
    pub fn replace_content(
        &mut self,
        stored: StoredFile,
        original_name: impl Into<String>,
        content: impl Into<String>,
    ) -> PathBuf {
        let previous = std::mem::replace(&mut self.file_path, stored.path);
        self.stored_name = stored.stored_name;
        self.size_bytes = stored.size_bytes;
        self.original_name = original_name.into();
        self.content = content.into();
        self.uploaded_at = Utc::now();
        previous
    }
}
