//! Google Drive v3 REST client
//!
//! Provides a typed HTTP client for the Drive v3 metadata and upload APIs.
//! Handles bearer authentication, page-token pagination, 429 back-off,
//! streamed downloads and resumable uploads.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use folio_core::ports::PageLimit;
//! use folio_drive::client::DriveClient;
//!
//! # async fn example() -> Result<(), folio_drive::DriveError> {
//! let client = DriveClient::new("access-token-here");
//! let folders = client
//!     .list_files(
//!         "mimeType = 'application/vnd.google-apps.folder' and trashed = false",
//!         Some("modifiedTime desc"),
//!         PageLimit::Max(5),
//!     )
//!     .await?;
//! println!("{} folders", folders.len());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use folio_core::domain::{has_pdf_extension, PDF_MIME_TYPE};
use folio_core::ports::PageLimit;
use futures_util::StreamExt;
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::query::FOLDER_MIME_TYPE;
use crate::DriveError;

/// Base URL for the Drive v3 metadata API
pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Base URL for the Drive v3 upload API
pub const DEFAULT_UPLOAD_BASE_URL: &str = "https://www.googleapis.com/upload/drive/v3";

/// Fields requested for every file resource
const FILE_FIELDS: &str = "id,name,mimeType,parents,size,modifiedTime,trashed";

const DEFAULT_PAGE_SIZE: u32 = 100;

/// Default retry-after duration when the header is missing (30 seconds)
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Maximum number of retries for 429 responses
const DEFAULT_MAX_RETRIES: u32 = 5;

// ============================================================================
// Drive API response types
// ============================================================================

/// A Drive file resource (files and folders alike)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub parents: Vec<String>,
    /// Drive encodes int64 fields as JSON strings
    #[serde(default)]
    size: Option<String>,
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trashed: bool,
}

impl DriveFile {
    /// Size in bytes; `None` for folders and Google-native documents
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_deref().and_then(|s| s.parse().ok())
    }

    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

/// One page of a `files.list` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

// ============================================================================
// DriveClient
// ============================================================================

/// HTTP client for Google Drive v3 calls
///
/// Holds a single access token. Token refresh happens before a client is
/// built (see [`crate::provider::DriveConnector`]).
#[derive(Debug, Clone)]
pub struct DriveClient {
    client: Client,
    api_base_url: String,
    upload_base_url: String,
    access_token: String,
    page_size: u32,
    max_retries: u32,
}

impl DriveClient {
    /// Creates a client against the public Drive endpoints
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_urls(access_token, DEFAULT_API_BASE_URL, DEFAULT_UPLOAD_BASE_URL)
    }

    /// Creates a client with custom base URLs (useful for testing)
    ///
    /// # Arguments
    /// * `access_token` - A valid OAuth2 access token
    /// * `api_base_url` - Base URL of the metadata API
    /// * `upload_base_url` - Base URL of the upload API
    pub fn with_base_urls(
        access_token: impl Into<String>,
        api_base_url: impl Into<String>,
        upload_base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_base_url: trim_base(api_base_url.into()),
            upload_base_url: trim_base(upload_base_url.into()),
            access_token: access_token.into(),
            page_size: DEFAULT_PAGE_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Sets the page size requested from `files.list` (clamped to 1-1000)
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, 1000);
        self
    }

    /// Sets how many times a 429 response is retried
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Returns a reference to the current access token
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Creates an authenticated request for a metadata API path
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to the base URL (e.g., "/files")
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.api_base_url, path);
        self.request_url(method, &url)
    }

    fn request_url(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.access_token)
    }

    // ========================================================================
    // Listing and metadata
    // ========================================================================

    /// Runs a `files.list` query, following page tokens until `limit` is met
    ///
    /// # Arguments
    /// * `q` - Drive query expression
    /// * `order_by` - Optional `orderBy` value
    /// * `limit` - Result cap; `Unbounded` reads every page
    pub async fn list_files(
        &self,
        q: &str,
        order_by: Option<&str>,
        limit: PageLimit,
    ) -> Result<Vec<DriveFile>, DriveError> {
        let fields = format!("nextPageToken,files({FILE_FIELDS})");
        let mut files: Vec<DriveFile> = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let page_size = match limit.cap() {
                Some(cap) => {
                    let remaining = cap.saturating_sub(files.len()).max(1);
                    u32::try_from(remaining)
                        .unwrap_or(u32::MAX)
                        .min(self.page_size)
                }
                None => self.page_size,
            };

            let mut params: Vec<(&str, String)> = vec![
                ("q", q.to_string()),
                ("fields", fields.clone()),
                ("pageSize", page_size.to_string()),
            ];
            if let Some(order) = order_by {
                params.push(("orderBy", order.to_string()));
            }
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let response = self
                .send_with_retry("files.list", || {
                    self.request(Method::GET, "/files").query(&params)
                })
                .await?;
            let page: FileListResponse = response.json().await?;
            pages += 1;

            files.extend(page.files);

            if limit.is_satisfied(files.len()) {
                break;
            }
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        if let Some(cap) = limit.cap() {
            files.truncate(cap);
        }

        debug!(q, pages, count = files.len(), "Listed Drive files");
        Ok(files)
    }

    /// Fetches a file resource; `None` if it does not exist
    pub async fn get_file(&self, id: &str) -> Result<Option<DriveFile>, DriveError> {
        let path = format!("/files/{id}");
        let result = self
            .send_with_retry("files.get", || {
                self.request(Method::GET, &path)
                    .query(&[("fields", FILE_FIELDS)])
            })
            .await;

        match result {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(e) if e.is_not_found() => {
                debug!(id, "Drive item not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Creates a folder under `parent` (the drive root when `None`)
    pub async fn create_folder(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<DriveFile, DriveError> {
        let mut body = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
        });
        if let Some(parent) = parent {
            body["parents"] = serde_json::json!([parent]);
        }

        let response = self
            .send_with_retry("files.create", || {
                self.request(Method::POST, "/files")
                    .query(&[("fields", FILE_FIELDS)])
                    .json(&body)
            })
            .await?;
        let folder: DriveFile = response.json().await?;

        info!(name, id = %folder.id, "Created Drive folder");
        Ok(folder)
    }

    /// Deletes a file or folder; `false` if it did not exist
    pub async fn delete(&self, id: &str) -> Result<bool, DriveError> {
        let path = format!("/files/{id}");
        match self
            .send_with_retry("files.delete", || self.request(Method::DELETE, &path))
            .await
        {
            Ok(_) => {
                debug!(id, "Deleted Drive item");
                Ok(true)
            }
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // Transfers
    // ========================================================================

    /// Downloads a file's content to `dest`; `false` if it does not exist
    ///
    /// The body is streamed into `<dest>.part` and renamed into place once
    /// complete. The partial file is removed on any failure.
    pub async fn download_file(&self, id: &str, dest: &Path) -> Result<bool, DriveError> {
        let path = format!("/files/{id}");
        let response = match self
            .send_with_retry("files.get(media)", || {
                self.request(Method::GET, &path).query(&[("alt", "media")])
            })
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_not_found() => {
                debug!(id, "Download skipped, Drive item not found");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let partial = partial_path(dest);
        let written = match write_body(response, &partial).await {
            Ok(written) => written,
            Err(e) => {
                discard_partial(&partial).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&partial, dest).await {
            discard_partial(&partial).await;
            return Err(e.into());
        }

        debug!(id, bytes = written, dest = %dest.display(), "Downloaded Drive file");
        Ok(true)
    }

    /// Uploads a local file under `parent` using the resumable protocol
    ///
    /// This method:
    /// 1. Reads the local file
    /// 2. Opens an upload session (`uploadType=resumable`) with the metadata
    /// 3. Sends the whole body to the session URL in one PUT
    pub async fn upload_file(
        &self,
        parent: &str,
        local_path: &Path,
        name: &str,
    ) -> Result<DriveFile, DriveError> {
        // Step 1: Read the content
        let bytes = tokio::fs::read(local_path).await?;
        let total = bytes.len();
        let content_type = if has_pdf_extension(name) {
            PDF_MIME_TYPE
        } else {
            "application/octet-stream"
        };

        // Step 2: Open the session
        let metadata = serde_json::json!({
            "name": name,
            "parents": [parent],
        });
        let init_url = format!("{}/files", self.upload_base_url);
        let response = self
            .send_with_retry("upload.init", || {
                self.request_url(Method::POST, &init_url)
                    .query(&[("uploadType", "resumable"), ("fields", FILE_FIELDS)])
                    .header("X-Upload-Content-Type", content_type)
                    .header("X-Upload-Content-Length", total.to_string())
                    .json(&metadata)
            })
            .await?;

        let session_url = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                DriveError::InvalidResponse(
                    "Upload session response has no Location header".to_string(),
                )
            })?;
        debug!(name, "Upload session created");

        // Step 3: Send the body
        let response = self
            .send_with_retry("upload.put", || {
                self.request_url(Method::PUT, &session_url)
                    .header(header::CONTENT_TYPE, content_type)
                    .body(bytes.clone())
            })
            .await?;
        let file: DriveFile = response.json().await?;

        info!(name, id = %file.id, bytes = total, "Uploaded file to Drive");
        Ok(file)
    }

    // ========================================================================
    // Request execution
    // ========================================================================

    /// Sends a request with automatic 429 retry, mapping error statuses
    ///
    /// `build` is called once per attempt since a request cannot be resent.
    async fn send_with_retry<F>(&self, operation: &str, build: F) -> Result<Response, DriveError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retry_after = DEFAULT_RETRY_AFTER;

        for attempt in 0..=self.max_retries {
            let response = build().send().await?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                retry_after = response
                    .headers()
                    .get(header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
                    .unwrap_or(DEFAULT_RETRY_AFTER);

                if attempt >= self.max_retries {
                    warn!(operation, attempts = attempt + 1, "429 retry limit exhausted");
                    return Err(DriveError::TooManyRequests { retry_after });
                }

                info!(
                    operation,
                    attempt,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Received 429, backing off"
                );
                tokio::time::sleep(retry_after).await;
                continue;
            }

            if attempt > 0 {
                info!(operation, attempt, "Request succeeded after retry");
            }
            return check_status(operation, response).await;
        }

        Err(DriveError::TooManyRequests { retry_after })
    }
}

/// Maps non-success statuses to [`DriveError`] variants
async fn check_status(operation: &str, response: Response) -> Result<Response, DriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        format!("{operation}: {status}")
    } else {
        format!("{operation}: {}", body.trim())
    };

    Err(match status {
        StatusCode::UNAUTHORIZED => DriveError::Unauthorized(message),
        StatusCode::FORBIDDEN => DriveError::Forbidden(message),
        StatusCode::NOT_FOUND => DriveError::NotFound(message),
        _ => DriveError::Status {
            status: status.as_u16(),
            message,
        },
    })
}

/// Parses a `Retry-After` header value (seconds or HTTP date)
///
/// Dates more than an hour away are ignored.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = DateTime::parse_from_rfc2822(value.trim()) {
        let wait = date.with_timezone(&Utc) - Utc::now();
        if let Ok(secs) = u64::try_from(wait.num_seconds()) {
            if secs <= 3600 {
                return Duration::from_secs(secs);
            }
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

async fn write_body(response: Response, target: &Path) -> Result<u64, DriveError> {
    let mut file = tokio::fs::File::create(target).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;

    Ok(written)
}

async fn discard_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove partial download");
        }
    }
}
