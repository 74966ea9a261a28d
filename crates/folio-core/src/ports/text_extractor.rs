//! Text extraction port (driven/secondary port)

use std::path::Path;

/// Extracts searchable text from a stored document
///
/// Extraction never fails across this boundary: unreadable or image-only
/// documents yield an empty string.
#[async_trait::async_trait]
pub trait ITextExtractor: Send + Sync {
    async fn extract_text(&self, path: &Path) -> String;
}
