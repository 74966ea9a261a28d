//! Full-text search over the extracted text of a folder's documents

use std::sync::Arc;

use serde::Serialize;

use crate::domain::{
    newtypes::{DocumentId, FolderId},
    FolioError, RequestContext,
};
use crate::ports::IFolderStore;

use super::folders::owned_folder;

/// First match of a query inside a text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch {
    /// Character offset of the match
    pub position: usize,
    /// The match plus up to `context_chars` characters on each side
    pub context: String,
}

/// Finds the first case-insensitive occurrence of `query` in `content`
///
/// Offsets and context widths are counted in characters, not bytes.
pub fn find_with_context(content: &str, query: &str, context_chars: usize) -> Option<TextMatch> {
    let fold = |c: char| c.to_lowercase().next().unwrap_or(c);
    let haystack: Vec<char> = content.chars().collect();
    let folded: Vec<char> = haystack.iter().copied().map(fold).collect();
    let needle: Vec<char> = query.chars().map(fold).collect();

    if needle.is_empty() || needle.len() > folded.len() {
        return None;
    }

    let position = folded
        .windows(needle.len())
        .position(|window| window == needle.as_slice())?;

    let start = position.saturating_sub(context_chars);
    let end = (position + needle.len() + context_chars).min(haystack.len());
    Some(TextMatch {
        position,
        context: haystack[start..end].iter().collect(),
    })
}

/// One document that matched a search
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub document_id: DocumentId,
    pub document_name: String,
    pub context: String,
    pub match_position: usize,
}

/// Search results for one folder
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub folder_name: String,
    pub results: Vec<SearchHit>,
    pub total_matches: usize,
}

/// Use case for searching inside a folder
pub struct SearchFolderUseCase {
    store: Arc<dyn IFolderStore>,
    context_chars: usize,
}

impl SearchFolderUseCase {
    pub fn new(store: Arc<dyn IFolderStore>, context_chars: usize) -> Self {
        Self {
            store,
            context_chars,
        }
    }

    /// Searches every document of the folder, reporting the first match of each
    ///
    /// # Errors
    /// `InvalidInput` for a blank query, `NotFound` for a missing folder
    pub async fn search(
        &self,
        ctx: &RequestContext,
        folder_id: &FolderId,
        query: &str,
    ) -> Result<SearchResponse, FolioError> {
        if query.trim().is_empty() {
            return Err(FolioError::InvalidInput(
                "a search query is required".to_string(),
            ));
        }
        let folder = owned_folder(self.store.as_ref(), ctx, folder_id).await?;

        let results: Vec<SearchHit> = self
            .store
            .list_documents(folder_id)
            .await?
            .into_iter()
            .filter_map(|document| {
                find_with_context(document.content(), query, self.context_chars).map(|m| {
                    SearchHit {
                        document_id: *document.id(),
                        document_name: document.original_name().to_string(),
                        context: m.context,
                        match_position: m.position,
                    }
                })
            })
            .collect();

        Ok(SearchResponse {
            query: query.to_string(),
            folder_name: folder.name().to_string(),
            total_matches: results.len(),
            results,
        })
    }
}
