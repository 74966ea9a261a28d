//! Docs command - Upload, show, search and delete documents

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Subcommand;
use folio_core::domain::{DocumentId, FolderId};

use crate::app::Environment;
use crate::output::{format_time, print_serialized, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum DocsCommand {
    /// Upload a PDF into a folder (and its Drive folder when linked)
    Upload {
        /// Folder ID
        folder_id: FolderId,
        /// PDF file to upload
        file: PathBuf,
        /// Name to store the document under (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Show a document's metadata and a text preview
    Show {
        /// Document ID
        document_id: DocumentId,
    },
    /// Delete a document locally and from Drive
    Delete {
        /// Document ID
        document_id: DocumentId,
    },
    /// Search the text of a folder's documents
    Search {
        /// Folder ID
        folder_id: FolderId,
        /// Text to look for (case-insensitive)
        query: String,
    },
    /// Print the text of one or more folders, as handed to the chat assistant
    Context {
        /// Folder IDs
        #[arg(required = true)]
        folder_ids: Vec<FolderId>,
    },
}

impl DocsCommand {
    pub async fn execute(&self, env: &Environment, format: OutputFormat) -> Result<()> {
        match self {
            DocsCommand::Upload {
                folder_id,
                file,
                name,
            } => {
                self.execute_upload(env, folder_id, file, name.as_deref(), format)
                    .await
            }
            DocsCommand::Show { document_id } => self.execute_show(env, document_id, format).await,
            DocsCommand::Delete { document_id } => {
                self.execute_delete(env, document_id, format).await
            }
            DocsCommand::Search { folder_id, query } => {
                self.execute_search(env, folder_id, query, format).await
            }
            DocsCommand::Context { folder_ids } => {
                self.execute_context(env, folder_ids, format).await
            }
        }
    }

    async fn execute_upload(
        &self,
        env: &Environment,
        folder_id: &FolderId,
        file: &Path,
        name: Option<&str>,
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = env.formatter(format);
        let ctx = env.request_context()?;
        let outcome = env
            .service()
            .await?
            .upload_document(&ctx, folder_id, file, name)
            .await?;
        let document = &outcome.document;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "id": document.id(),
                "folder_id": document.folder_id(),
                "original_name": document.original_name(),
                "stored_name": document.stored_name(),
                "size_bytes": document.size_bytes(),
                "remote_file_id": document.remote_file_id(),
                "uploaded_at": document.uploaded_at(),
                "remote_warning": outcome.remote_warning,
            }));
            return Ok(());
        }

        formatter.success(&format!(
            "Uploaded '{}' ({})",
            document.original_name(),
            document.id()
        ));
        formatter.info(&format!("Size: {} bytes", document.size_bytes()));
        if let Some(remote_id) = document.remote_file_id() {
            formatter.info(&format!("Drive file: {}", remote_id));
        }
        if let Some(warning) = &outcome.remote_warning {
            formatter.warn(warning);
        }
        Ok(())
    }

    async fn execute_show(
        &self,
        env: &Environment,
        document_id: &DocumentId,
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = env.formatter(format);
        let ctx = env.request_context()?;
        let view = env.service().await?.get_document(&ctx, document_id).await?;

        if format.is_json() {
            return print_serialized(formatter.as_ref(), &view);
        }

        formatter.success(&format!("{} ({})", view.original_name, view.id));
        formatter.info(&format!("Folder: {}", view.folder_id));
        formatter.info(&format!("Stored as: {}", view.stored_name));
        formatter.info(&format!("Size: {} bytes", view.size_bytes));
        formatter.info(&format!("Uploaded: {}", format_time(Some(view.uploaded_at))));
        match &view.remote_file_id {
            Some(remote_id) => formatter.info(&format!("Drive file: {}", remote_id)),
            None => formatter.info("Drive file: none"),
        }
        formatter.info("");
        for line in view.content_preview.lines() {
            formatter.info(line);
        }
        Ok(())
    }

    async fn execute_delete(
        &self,
        env: &Environment,
        document_id: &DocumentId,
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = env.formatter(format);
        let ctx = env.request_context()?;
        let deletion = env
            .service()
            .await?
            .delete_document(&ctx, document_id)
            .await?;

        if format.is_json() {
            return print_serialized(formatter.as_ref(), &deletion);
        }

        formatter.success(&format!("Deleted document {}", document_id));
        if !deletion.file_removed {
            formatter.warn("The stored file could not be removed");
        }
        if let Some(warning) = &deletion.remote_warning {
            formatter.warn(warning);
        }
        Ok(())
    }

    async fn execute_search(
        &self,
        env: &Environment,
        folder_id: &FolderId,
        query: &str,
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = env.formatter(format);
        let ctx = env.request_context()?;
        let response = env
            .service()
            .await?
            .search_folder(&ctx, folder_id, query)
            .await?;

        if format.is_json() {
            return print_serialized(formatter.as_ref(), &response);
        }

        formatter.success(&format!(
            "{} match(es) for '{}' in '{}'",
            response.total_matches, response.query, response.folder_name
        ));
        for hit in &response.results {
            formatter.info("");
            formatter.info(&format!("{} ({})", hit.document_name, hit.document_id));
            formatter.info(&format!("  ...{}...", hit.context.replace('\n', " ")));
        }
        Ok(())
    }

    async fn execute_context(
        &self,
        env: &Environment,
        folder_ids: &[FolderId],
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = env.formatter(format);
        let ctx = env.request_context()?;
        let context = env
            .service()
            .await?
            .folder_context(&ctx, folder_ids)
            .await?;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "folders": context.folders,
                "text": context.render(),
            }));
            return Ok(());
        }

        if context.is_empty() {
            formatter.warn("None of the given folders exist or belong to you");
            return Ok(());
        }
        println!("{}", context.render());
        Ok(())
    }
}
