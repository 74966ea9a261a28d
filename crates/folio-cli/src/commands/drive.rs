//! Drive command - Import, browse and inspect Google Drive folders

use anyhow::Result;
use clap::Subcommand;
use folio_core::domain::RemoteId;
use folio_core::usecases::BrowseRequest;

use super::folders::print_report;
use crate::app::Environment;
use crate::output::{format_time, print_serialized, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum DriveCommand {
    /// Import a Drive folder: create or reuse its local folder and mirror it both ways
    Import {
        /// Google Drive folder ID
        remote_id: RemoteId,
        /// Local folder name when a new folder is created
        #[arg(long)]
        name: Option<String>,
        /// Replace the content of already imported files
        #[arg(long, conflicts_with = "no_overwrite")]
        overwrite: bool,
        /// Keep already imported files untouched
        #[arg(long)]
        no_overwrite: bool,
    },
    /// Browse Drive folders
    Browse {
        /// Parent folder ID, `root` or `any`
        #[arg(long)]
        parent: Option<String>,
        /// Only folders whose name contains this text
        #[arg(long)]
        q: Option<String>,
        /// Maximum number of folders, or `all`
        #[arg(long)]
        limit: Option<String>,
    },
    /// List the PDF files of a Drive folder, including sub-folders
    Files {
        /// Google Drive folder ID
        remote_id: RemoteId,
        /// Only list files directly inside the folder
        #[arg(long)]
        flat: bool,
    },
}

impl DriveCommand {
    pub async fn execute(&self, env: &Environment, format: OutputFormat) -> Result<()> {
        match self {
            DriveCommand::Import {
                remote_id,
                name,
                overwrite,
                no_overwrite,
            } => {
                let overwrite = resolve_overwrite(
                    *overwrite,
                    *no_overwrite,
                    env.config.sync.import_overwrite,
                );
                self.execute_import(env, remote_id, name.as_deref(), overwrite, format)
                    .await
            }
            DriveCommand::Browse { parent, q, limit } => {
                let request = BrowseRequest {
                    parent: parent.clone(),
                    q: q.clone(),
                    limit: limit.clone(),
                };
                self.execute_browse(env, &request, format).await
            }
            DriveCommand::Files { remote_id, flat } => {
                self.execute_files(env, remote_id, !flat, format).await
            }
        }
    }

    async fn execute_import(
        &self,
        env: &Environment,
        remote_id: &RemoteId,
        name: Option<&str>,
        overwrite: bool,
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = env.formatter(format);
        let ctx = env.request_context()?;
        let outcome = env
            .service()
            .await?
            .import_folder(&ctx, remote_id.clone(), name, overwrite)
            .await?;

        if format.is_json() {
            return print_serialized(formatter.as_ref(), &outcome);
        }

        match &outcome.folder {
            Some(folder) if outcome.created => formatter.success(&format!(
                "Imported Drive folder {} into new folder '{}' ({})",
                remote_id, folder.name, folder.id
            )),
            Some(folder) => formatter.success(&format!(
                "Synchronized Drive folder {} with folder '{}' ({})",
                remote_id, folder.name, folder.id
            )),
            None => formatter.success(&format!("Drive folder {} processed", remote_id)),
        }
        print_report(formatter.as_ref(), &outcome.report);
        Ok(())
    }

    async fn execute_browse(
        &self,
        env: &Environment,
        request: &BrowseRequest,
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = env.formatter(format);
        let ctx = env.request_context()?;
        let response = env
            .service()
            .await?
            .browse_remote_folders(&ctx, request)
            .await?;

        if format.is_json() {
            return print_serialized(formatter.as_ref(), &response);
        }

        formatter.success(&format!(
            "{} folder(s) under {} (limit {})",
            response.folders.len(),
            response.parent,
            response.limit
        ));
        if let Some(note) = &response.note {
            formatter.info(note);
        }
        for folder in &response.folders {
            formatter.info(&format!(
                "{}  {}  (modified {})",
                folder.id,
                folder.name,
                format_time(folder.modified_at)
            ));
        }
        Ok(())
    }

    async fn execute_files(
        &self,
        env: &Environment,
        remote_id: &RemoteId,
        recursive: bool,
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = env.formatter(format);
        let ctx = env.request_context()?;
        let response = env
            .service()
            .await?
            .list_remote_files(&ctx, remote_id, recursive)
            .await?;

        if format.is_json() {
            return print_serialized(formatter.as_ref(), &response);
        }

        formatter.success(&format!(
            "{} PDF file(s) in Drive folder {}",
            response.files.len(),
            remote_id
        ));
        for file in &response.files {
            let size = file
                .size_bytes
                .map(|b| format!("{} bytes", b))
                .unwrap_or_else(|| "size unknown".to_string());
            formatter.info(&format!("{}  {}  ({})", file.id, file.name, size));
        }
        Ok(())
    }
}

/// Explicit flags win over the configured default
fn resolve_overwrite(overwrite: bool, no_overwrite: bool, configured: bool) -> bool {
    if overwrite {
        true
    } else if no_overwrite {
        false
    } else {
        configured
    }
}
