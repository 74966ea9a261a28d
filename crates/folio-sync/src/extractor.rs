//! PDF text extraction adapter
//!
//! Implements [`ITextExtractor`] with `pdf-extract`. Parsing is CPU-bound and
//! the parser may panic on malformed input, so it runs on the blocking pool
//! and any failure yields an empty string.

use std::path::Path;

use folio_core::ports::ITextExtractor;
use tracing::{debug, warn};

/// Extracts the text layer of PDF files
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

fn extract_blocking(path: &Path) -> anyhow::Result<String> {
    let bytes = std::fs::read(path)?;
    pdf_extract::extract_text_from_mem(&bytes).map_err(|e| anyhow::anyhow!("{e}"))
}

#[async_trait::async_trait]
impl ITextExtractor for PdfTextExtractor {
    async fn extract_text(&self, path: &Path) -> String {
        let owned = path.to_path_buf();

        match tokio::task::spawn_blocking(move || extract_blocking(&owned)).await {
            Ok(Ok(text)) => {
                debug!(path = %path.display(), chars = text.chars().count(), "Extracted PDF text");
                text
            }
            Ok(Err(e)) => {
                warn!(path = %path.display(), error = %e, "PDF text extraction failed");
                String::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "PDF text extraction aborted");
                String::new()
            }
        }
    }
}
