//! Folio CLI - Command-line interface for Folio
//!
//! Provides commands for:
//! - Managing PDF folders and their Google Drive links
//! - Importing and synchronizing Drive folders
//! - Uploading, showing, searching and deleting documents
//! - Storing Drive credentials
//! - Viewing and validating configuration

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use folio_core::config::{Config, LoggingConfig};
use folio_core::domain::FolioError;
use tracing_subscriber::EnvFilter;

mod app;
mod commands;
mod output;

use app::Environment;
use commands::{
    auth::AuthCommand, completions::CompletionsCommand, config::ConfigCommand, docs::DocsCommand,
    drive::DriveCommand, folders::FoldersCommand,
};
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "PDF folders mirrored from Google Drive")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// User the command acts for
    #[arg(long, global = true, env = "FOLIO_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage folders
    #[command(subcommand)]
    Folders(FoldersCommand),
    /// Import and browse Google Drive folders
    #[command(subcommand)]
    Drive(DriveCommand),
    /// Manage documents
    #[command(subcommand)]
    Docs(DocsCommand),
    /// Manage Google Drive credentials
    #[command(subcommand)]
    Auth(AuthCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

/// Picks the tracing filter: `-v` flags win over the configured level
fn log_filter(verbose: u8, quiet: bool, logging: &LoggingConfig) -> String {
    match (verbose, quiet) {
        (0, true) => "warn".to_string(),
        (0, false) => logging.level.clone(),
        (1, _) => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

fn init_tracing(cli: &Cli, logging: &LoggingConfig) {
    let filter = log_filter(cli.verbose, cli.quiet, logging);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let formatter = get_formatter(format, cli.quiet);

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            if cli.config.is_some() {
                formatter.warn(&format!("{e:#}; using defaults"));
            }
            Config::default()
        }
    };

    init_tracing(&cli, &config.logging);

    let env = Environment::new(config, config_path, cli.user.clone(), cli.quiet);

    let result = match &cli.command {
        Commands::Folders(cmd) => cmd.execute(&env, format).await,
        Commands::Drive(cmd) => cmd.execute(&env, format).await,
        Commands::Docs(cmd) => cmd.execute(&env, format).await,
        Commands::Auth(cmd) => cmd.execute(&env, format).await,
        Commands::Config(cmd) => cmd.execute(&env, format).await,
        Commands::Completions(cmd) => cmd.execute(format).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let kind = e.downcast_ref::<FolioError>().map(FolioError::kind);
            formatter.failure(&format!("{e:#}"), kind);
            ExitCode::FAILURE
        }
    }
}
