//! Configuration module for Folio.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.
//! The resulting [`Config`] is constructed once at process start and passed by
//! reference to every adapter and service.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Folio.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub storage: StorageConfig,
    pub documents: DocumentsConfig,
    pub drive: DriveConfig,
    pub logging: LoggingConfig,
}

/// Reconciliation scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Minimum seconds between automatic passes for the same folder.
    pub min_interval_secs: u64,
    /// Import cap for a folder's first automatic pass.
    pub first_sync_import_cap: usize,
    /// Import cap for every later automatic pass.
    pub steady_import_cap: usize,
    /// Default of the `overwrite` flag for explicit remote-folder imports.
    pub import_overwrite: bool,
}

/// Persistent state locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Directory holding stored PDF files.
    pub upload_dir: PathBuf,
}

/// Document upload and search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    /// Largest accepted upload, in MiB.
    pub max_upload_mb: u64,
    /// Characters of extracted text shown by document previews.
    pub preview_chars: usize,
    /// Characters of context on each side of a search hit.
    pub search_context_chars: usize,
}

/// Google Drive API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Base URL of the Drive v3 metadata API.
    pub api_base_url: String,
    /// Base URL of the Drive v3 upload API.
    pub upload_base_url: String,
    /// OAuth token endpoint used when credentials carry none.
    pub token_uri: String,
    /// Folder listing limit when browsing without a search term (`-1` = all).
    pub default_browse_limit: i64,
    /// Page size requested from the provider (1-1000).
    pub page_size: u32,
    /// Where credentials live: `database` or `keyring`.
    pub credential_backend: String,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `text` or `json`.
    pub format: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/folio/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("folio")
            .join("config.yaml")
    }

    /// Minimum interval between automatic passes as a [`Duration`].
    pub fn min_sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync.min_interval_secs)
    }

    /// Largest accepted upload, in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.documents.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("folio")
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: 180,
            first_sync_import_cap: 200,
            steady_import_cap: 5,
            import_overwrite: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = data_dir();
        Self {
            database_path: data_dir.join("folio.db"),
            upload_dir: data_dir.join("uploads"),
        }
    }
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            max_upload_mb: 16,
            preview_chars: 500,
            search_context_chars: 100,
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://www.googleapis.com/drive/v3".to_string(),
            upload_base_url: "https://www.googleapis.com/upload/drive/v3".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            default_browse_limit: 5,
            page_size: 100,
            credential_backend: "database".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.min_interval_secs"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

/// Valid values for `drive.credential_backend`.
const VALID_CREDENTIAL_BACKENDS: &[&str] = &["database", "keyring"];

fn positive(errors: &mut Vec<ValidationError>, field: &str, value: u64) {
    if value == 0 {
        errors.push(ValidationError {
            field: field.into(),
            message: "must be greater than 0".into(),
        });
    }
}

fn http_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        errors.push(ValidationError {
            field: field.into(),
            message: format!("must be an http(s) URL, got '{value}'"),
        });
    }
}

fn one_of(errors: &mut Vec<ValidationError>, field: &str, value: &str, valid: &[&str]) {
    if !valid.contains(&value) {
        errors.push(ValidationError {
            field: field.into(),
            message: format!("invalid value '{}', expected one of: {}", value, valid.join(", ")),
        });
    }
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        positive(&mut errors, "sync.min_interval_secs", self.sync.min_interval_secs);
        positive(
            &mut errors,
            "sync.first_sync_import_cap",
            self.sync.first_sync_import_cap as u64,
        );
        positive(
            &mut errors,
            "sync.steady_import_cap",
            self.sync.steady_import_cap as u64,
        );

        // --- storage ---
        if self.storage.database_path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.database_path".into(),
                message: "must not be empty".into(),
            });
        }
        if self.storage.upload_dir.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.upload_dir".into(),
                message: "must not be empty".into(),
            });
        }

        // --- documents ---
        positive(&mut errors, "documents.max_upload_mb", self.documents.max_upload_mb);

        // --- drive ---
        http_url(&mut errors, "drive.api_base_url", &self.drive.api_base_url);
        http_url(&mut errors, "drive.upload_base_url", &self.drive.upload_base_url);
        http_url(&mut errors, "drive.token_uri", &self.drive.token_uri);
        if self.drive.default_browse_limit == 0 || self.drive.default_browse_limit < -1 {
            errors.push(ValidationError {
                field: "drive.default_browse_limit".into(),
                message: "must be -1 (all) or greater than 0".into(),
            });
        }
        if !(1..=1000).contains(&self.drive.page_size) {
            errors.push(ValidationError {
                field: "drive.page_size".into(),
                message: "must be between 1 and 1000".into(),
            });
        }
        one_of(
            &mut errors,
            "drive.credential_backend",
            &self.drive.credential_backend,
            VALID_CREDENTIAL_BACKENDS,
        );

        // --- logging ---
        one_of(&mut errors, "logging.level", &self.logging.level, VALID_LOG_LEVELS);
        one_of(&mut errors, "logging.format", &self.logging.format, VALID_LOG_FORMATS);

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Config`], starting from defaults.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from [`Config::default`].
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sync ---

    pub fn sync_min_interval_secs(mut self, secs: u64) -> Self {
        self.config.sync.min_interval_secs = secs;
        self
    }

    pub fn sync_first_sync_import_cap(mut self, cap: usize) -> Self {
        self.config.sync.first_sync_import_cap = cap;
        self
    }

    pub fn sync_steady_import_cap(mut self, cap: usize) -> Self {
        self.config.sync.steady_import_cap = cap;
        self
    }

    pub fn sync_import_overwrite(mut self, overwrite: bool) -> Self {
        self.config.sync.import_overwrite = overwrite;
        self
    }

    // --- storage ---

    pub fn storage_database_path(mut self, path: PathBuf) -> Self {
        self.config.storage.database_path = path;
        self
    }

    pub fn storage_upload_dir(mut self, dir: PathBuf) -> Self {
        self.config.storage.upload_dir = dir;
        self
    }

    // --- documents ---

    pub fn documents_max_upload_mb(mut self, mb: u64) -> Self {
        self.config.documents.max_upload_mb = mb;
        self
    }

    pub fn documents_preview_chars(mut self, chars: usize) -> Self {
        self.config.documents.preview_chars = chars;
        self
    }

    pub fn documents_search_context_chars(mut self, chars: usize) -> Self {
        self.config.documents.search_context_chars = chars;
        self
    }

    // --- drive ---

    pub fn drive_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.drive.api_base_url = url.into();
        self
    }

    pub fn drive_upload_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.drive.upload_base_url = url.into();
        self
    }

    pub fn drive_token_uri(mut self, uri: impl Into<String>) -> Self {
        self.config.drive.token_uri = uri.into();
        self
    }

    pub fn drive_default_browse_limit(mut self, limit: i64) -> Self {
        self.config.drive.default_browse_limit = limit;
        self
    }

    pub fn drive_page_size(mut self, size: u32) -> Self {
        self.config.drive.page_size = size;
        self
    }

    pub fn drive_credential_backend(mut self, backend: impl Into<String>) -> Self {
        self.config.drive.credential_backend = backend.into();
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
