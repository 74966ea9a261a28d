//! Folders command - Create, list, link, sync and delete folders
//!
//! `folio folders list` is also the background sync trigger: listing runs
//! the due import passes for the user's linked folders before printing.

use anyhow::Result;
use clap::Subcommand;
use folio_core::domain::{FolderId, RemoteId};
use folio_core::usecases::FolderSummary;
use folio_sync::{SkipReason, SyncReport};

use crate::app::Environment;
use crate::output::{format_time, print_serialized, OutputFormat, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum FoldersCommand {
    /// List folders (runs due background imports first)
    List,
    /// List folders with the documents they hold, without syncing
    Summary,
    /// Create a folder and a matching Google Drive folder
    Create {
        /// Folder name
        name: String,
    },
    /// Delete a folder and all of its documents
    Delete {
        /// Folder ID
        folder_id: FolderId,
    },
    /// Link an existing folder to a Google Drive folder
    Link {
        /// Folder ID
        folder_id: FolderId,
        /// Google Drive folder ID
        remote_id: RemoteId,
    },
    /// Create a folder linked to an existing Google Drive folder
    FromDrive {
        /// Google Drive folder ID
        remote_id: RemoteId,
        /// Folder name (defaults to the Drive folder's name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Import new Google Drive files into a linked folder now
    Sync {
        /// Folder ID
        folder_id: FolderId,
    },
}

impl FoldersCommand {
    pub async fn execute(&self, env: &Environment, format: OutputFormat) -> Result<()> {
        match self {
            FoldersCommand::List => self.execute_list(env, format).await,
            FoldersCommand::Summary => self.execute_summary(env, format).await,
            FoldersCommand::Create { name } => self.execute_create(env, name, format).await,
            FoldersCommand::Delete { folder_id } => {
                self.execute_delete(env, folder_id, format).await
            }
            FoldersCommand::Link {
                folder_id,
                remote_id,
            } => self.execute_link(env, folder_id, remote_id, format).await,
            FoldersCommand::FromDrive { remote_id, name } => {
                self.execute_from_drive(env, remote_id, name.as_deref(), format)
                    .await
            }
            FoldersCommand::Sync { folder_id } => self.execute_sync(env, folder_id, format).await,
        }
    }

    async fn execute_list(&self, env: &Environment, format: OutputFormat) -> Result<()> {
        let formatter = env.formatter(format);
        let ctx = env.request_context()?;
        let folders = env.service().await?.list_folders(&ctx).await?;

        if format.is_json() {
            return print_serialized(formatter.as_ref(), &folders);
        }

        if folders.is_empty() {
            formatter.success("No folders");
            return Ok(());
        }
        formatter.success(&format!("{} folder(s)", folders.len()));
        for folder in &folders {
            print_summary(formatter.as_ref(), folder);
        }
        Ok(())
    }

    async fn execute_summary(&self, env: &Environment, format: OutputFormat) -> Result<()> {
        let formatter = env.formatter(format);
        let ctx = env.request_context()?;
        let overview = env.service().await?.folders_overview(&ctx).await?;

        if format.is_json() {
            return print_serialized(formatter.as_ref(), &overview);
        }

        formatter.success(&format!("{} folder(s)", overview.len()));
        for folder in &overview {
            formatter.info("");
            formatter.info(&format!(
                "{} ({}) - {} document(s)",
                folder.name,
                folder.id,
                folder.documents.len()
            ));
            for document in &folder.documents {
                formatter.info(&format!("  {}  {}", document.id, document.name));
            }
        }
        Ok(())
    }

    async fn execute_create(&self, env: &Environment, name: &str, format: OutputFormat) -> Result<()> {
        let formatter = env.formatter(format);
        let ctx = env.request_context()?;
        let created = env.service().await?.create_folder(&ctx, name).await?;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "folder": created.folder,
                "remote_warning": created.remote_warning,
            }));
            return Ok(());
        }

        formatter.success(&format!(
            "Created folder '{}' ({})",
            created.folder.name(),
            created.folder.id()
        ));
        if let Some(remote_id) = created.folder.remote_folder_id() {
            formatter.info(&format!("Drive folder: {}", remote_id));
        }
        if let Some(warning) = &created.remote_warning {
            formatter.warn(warning);
        }
        Ok(())
    }

    async fn execute_delete(
        &self,
        env: &Environment,
        folder_id: &FolderId,
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = env.formatter(format);
        let ctx = env.request_context()?;
        let purge = env.service().await?.delete_folder(&ctx, folder_id).await?;

        if format.is_json() {
            return print_serialized(formatter.as_ref(), &purge);
        }

        formatter.success(&format!(
            "Deleted folder {} ({} document(s))",
            folder_id, purge.documents_removed
        ));
        if purge.files_left_behind > 0 {
            formatter.warn(&format!(
                "{} stored file(s) could not be removed",
                purge.files_left_behind
            ));
        }
        Ok(())
    }

    async fn execute_link(
        &self,
        env: &Environment,
        folder_id: &FolderId,
        remote_id: &RemoteId,
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = env.formatter(format);
        let ctx = env.request_context()?;
        let folder = env
            .service()
            .await?
            .link_folder(&ctx, folder_id, remote_id.clone())
            .await?;

        if format.is_json() {
            return print_serialized(formatter.as_ref(), &folder);
        }
        formatter.success(&format!(
            "Linked folder '{}' to Drive folder {}",
            folder.name(),
            remote_id
        ));
        Ok(())
    }

    async fn execute_from_drive(
        &self,
        env: &Environment,
        remote_id: &RemoteId,
        name: Option<&str>,
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = env.formatter(format);
        let ctx = env.request_context()?;
        let folder = env
            .service()
            .await?
            .create_folder_from_remote(&ctx, remote_id.clone(), name)
            .await?;

        if format.is_json() {
            return print_serialized(formatter.as_ref(), &folder);
        }
        formatter.success(&format!(
            "Created folder '{}' ({}) linked to Drive folder {}",
            folder.name(),
            folder.id(),
            remote_id
        ));
        formatter.info("Files are imported by the next `folio folders list` or `folio folders sync`");
        Ok(())
    }

    async fn execute_sync(
        &self,
        env: &Environment,
        folder_id: &FolderId,
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = env.formatter(format);
        let ctx = env.request_context()?;
        let report = env.service().await?.sync_folder(&ctx, folder_id).await?;

        if format.is_json() {
            return print_serialized(formatter.as_ref(), &report);
        }
        formatter.success(&format!("Synchronized folder {}", folder_id));
        print_report(formatter.as_ref(), &report);
        Ok(())
    }
}

fn print_summary(formatter: &dyn OutputFormatter, folder: &FolderSummary) {
    formatter.info("");
    formatter.info(&format!("{} ({})", folder.name, folder.id));
    formatter.info(&format!("  Documents: {}", folder.document_count));
    match &folder.remote_folder_id {
        Some(remote_id) => {
            formatter.info(&format!("  Drive folder: {}", remote_id));
            formatter.info(&format!("  Last sync: {}", format_time(folder.last_sync_at)));
        }
        None => formatter.info("  Drive folder: not linked"),
    }
}

/// Prints the counters of a reconciliation pass, skipping zero lines
pub(crate) fn print_report(formatter: &dyn OutputFormatter, report: &SyncReport) {
    if report.throttled {
        formatter.info("Skipped: synchronized too recently");
        return;
    }
    if report.deleted_folder {
        formatter.warn("The Drive folder no longer exists; the local folder was deleted");
    }

    let counters = [
        ("Imported", report.imported),
        ("Updated", report.updated),
        ("Deleted", report.deleted),
        ("Pushed", report.pushed),
        ("Failed", report.failed),
    ];
    for (label, count) in counters {
        if count > 0 {
            formatter.info(&format!("{}: {}", label, count));
        }
    }
    let (already, problems): (Vec<_>, Vec<_>) = report
        .skipped
        .iter()
        .partition(|item| item.reason == SkipReason::AlreadyImported);
    if !already.is_empty() {
        formatter.info(&format!("Already imported: {}", already.len()));
    }
    for item in problems {
        formatter.info(&format!("Skipped {} ({}): {}", item.name, item.id, item.reason));
    }
    for error in &report.errors {
        formatter.warn(error);
    }
    formatter.info(&format!("Took {} ms", report.duration_ms));
}
