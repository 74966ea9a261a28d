//! Auth commands - Import, inspect and clear Google Drive credentials
//!
//! Folio does not run an interactive OAuth flow. `folio auth import` takes
//! an authorized-user token JSON (as exported by Google's client libraries)
//! and stores it for the current user in the configured credential backend.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Subcommand;
use folio_core::ports::RemoteCredentials;
use tracing::info;

use crate::app::Environment;
use crate::output::{format_time, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Store credentials from an authorized-user token JSON file
    Import {
        /// Token file
        token_file: PathBuf,
    },
    /// Show whether credentials are stored and still usable
    Status,
    /// Remove stored credentials
    Clear,
}

impl AuthCommand {
    pub async fn execute(&self, env: &Environment, format: OutputFormat) -> Result<()> {
        match self {
            AuthCommand::Import { token_file } => self.execute_import(env, token_file, format).await,
            AuthCommand::Status => self.execute_status(env, format).await,
            AuthCommand::Clear => self.execute_clear(env, format).await,
        }
    }

    async fn execute_import(
        &self,
        env: &Environment,
        token_file: &Path,
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = env.formatter(format);
        let ctx = env.request_context()?;

        let credentials = read_token_file(token_file)?;
        let store = env.open_store().await?;
        env.credential_store(store)
            .save_credentials(ctx.user_id(), &credentials)
            .await
            .context("Failed to store credentials")?;

        info!(user = %ctx.user_id(), backend = %env.config.drive.credential_backend, "Credentials imported");

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "user": ctx.user_id(),
                "backend": env.config.drive.credential_backend,
                "can_refresh": credentials.can_refresh(),
                "expires_at": credentials.expires_at,
            }));
        } else {
            formatter.success(&format!("Stored credentials for {}", ctx.user_id()));
            formatter.info(&format!("Backend: {}", env.config.drive.credential_backend));
            formatter.info(&format!("Expires: {}", format_time(credentials.expires_at)));
            if !credentials.can_refresh() {
                formatter.warn("No refresh token or client ID: the token cannot be renewed");
            }
        }
        Ok(())
    }

    async fn execute_status(&self, env: &Environment, format: OutputFormat) -> Result<()> {
        let formatter = env.formatter(format);
        let ctx = env.request_context()?;

        let store = env.open_store().await?;
        let stored = env
            .credential_store(store)
            .load_credentials(ctx.user_id())
            .await
            .context("Failed to load credentials")?;

        let Some(credentials) = stored else {
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "user": ctx.user_id(),
                    "authenticated": false,
                }));
            } else {
                formatter.warn(&format!("No credentials stored for {}", ctx.user_id()));
                formatter.info("Run `folio auth import <token-file>` to add them");
            }
            return Ok(());
        };

        let expired = credentials.expires_within(Utc::now(), chrono::Duration::zero());

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "user": ctx.user_id(),
                "authenticated": true,
                "expired": expired,
                "expires_at": credentials.expires_at,
                "can_refresh": credentials.can_refresh(),
                "scopes": credentials.scopes,
            }));
            return Ok(());
        }

        formatter.success(&format!("Credentials stored for {}", ctx.user_id()));
        formatter.info(&format!("Expires: {}", format_time(credentials.expires_at)));
        formatter.info(&format!(
            "Refreshable: {}",
            if credentials.can_refresh() { "yes" } else { "no" }
        ));
        if !credentials.scopes.is_empty() {
            formatter.info(&format!("Scopes: {}", credentials.scopes.join(", ")));
        }
        if expired && !credentials.can_refresh() {
            formatter.warn("The access token has expired and cannot be refreshed");
        }
        Ok(())
    }

    async fn execute_clear(&self, env: &Environment, format: OutputFormat) -> Result<()> {
        let formatter = env.formatter(format);
        let ctx = env.request_context()?;

        let store = env.open_store().await?;
        let removed = env
            .credential_store(store)
            .clear_credentials(ctx.user_id())
            .await
            .context("Failed to clear credentials")?;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "removed": removed,
            }));
        } else if removed {
            formatter.success(&format!("Removed credentials for {}", ctx.user_id()));
        } else {
            formatter.info(&format!("No credentials stored for {}", ctx.user_id()));
        }
        Ok(())
    }
}

/// Parses a token file into credentials
fn read_token_file(path: &Path) -> Result<RemoteCredentials> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read token file {}", path.display()))?;
    let credentials: RemoteCredentials = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse token file {}", path.display()))?;
    anyhow::ensure!(
        !credentials.access_token.trim().is_empty(),
        "Token file {} has an empty access token",
        path.display()
    );
    Ok(credentials)
}
