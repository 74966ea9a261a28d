//! Downloads, resumable uploads, mutations and metadata

use serde_json::json;
use wiremock::matchers::{body_bytes, body_partial_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use folio_core::domain::RemoteError;
use folio_core::ports::IRemoteStorage;

use crate::common::{rid, setup, upload_base, FOLDER_MIME};

// ============================================================================
// Downloads
// ============================================================================

#[tokio::test]
async fn test_download_writes_file() {
    let (server, storage) = setup().await;
    let content = b"%PDF-1.4 test content".to_vec();

    Mock::given(method("GET"))
        .and(path("/files/file-1"))
        .and(query_param("alt", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("nested").join("doc.pdf");
    assert!(storage.download_file(&rid("file-1"), &dest).await.unwrap());

    assert_eq!(std::fs::read(&dest).unwrap(), content);
    assert!(!dir.path().join("nested").join("doc.pdf.part").exists());
}

#[tokio::test]
async fn test_download_missing_file_returns_false() {
    let (server, storage) = setup().await;

    Mock::given(method("GET"))
        .and(path("/files/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("doc.pdf");
    assert!(!storage.download_file(&rid("gone"), &dest).await.unwrap());
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_failed_download_leaves_no_file() {
    let (server, storage) = setup().await;

    Mock::given(method("GET"))
        .and(path("/files/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("doc.pdf");
    let err = storage
        .download_file(&rid("broken"), &dest)
        .await
        .unwrap_err();

    assert!(matches!(err, RemoteError::Server { status: 500, .. }));
    assert!(!dest.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_retries_after_429() {
    let (server, storage) = setup().await;

    Mock::given(method("GET"))
        .and(path("/files/busy"))
        .respond_with(ResponseTemplate::new(429).append_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/busy"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("busy.pdf");
    assert!(storage.download_file(&rid("busy"), &dest).await.unwrap());
    assert_eq!(std::fs::read(&dest).unwrap(), b"ok");
}

#[tokio::test]
async fn test_rejected_token_is_unauthorized() {
    let (server, storage) = setup().await;

    Mock::given(method("GET"))
        .and(path("/files/secret"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid Credentials"))
        .mount(&server)
        .await;

    let err = storage.get_metadata(&rid("secret")).await.unwrap_err();
    assert!(matches!(err, RemoteError::Unauthorized(_)));
}

// ============================================================================
// Uploads
// ============================================================================

#[tokio::test]
async fn test_resumable_upload() {
    let (server, storage) = setup().await;
    let session_url = format!("{}/session/abc", upload_base(&server));

    Mock::given(method("POST"))
        .and(path("/upload/files"))
        .and(query_param("uploadType", "resumable"))
        .and(body_partial_json(json!({
            "name": "Paper.pdf",
            "parents": ["folder-1"]
        })))
        .respond_with(ResponseTemplate::new(200).append_header("Location", session_url.as_str()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/upload/session/abc"))
        .and(body_bytes(b"%PDF-1.4 upload".to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "new-file",
            "name": "Paper.pdf",
            "mimeType": "application/pdf"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("0f3a.pdf");
    std::fs::write(&local, b"%PDF-1.4 upload").unwrap();

    let id = storage
        .upload_file(&rid("folder-1"), &local, Some("Paper.pdf"))
        .await
        .unwrap();
    assert_eq!(id, rid("new-file"));
}

#[tokio::test]
async fn test_upload_defaults_to_local_file_name() {
    let (server, storage) = setup().await;
    let session_url = format!("{}/session/def", upload_base(&server));

    Mock::given(method("POST"))
        .and(path("/upload/files"))
        .and(body_partial_json(json!({ "name": "local.pdf" })))
        .respond_with(ResponseTemplate::new(200).append_header("Location", session_url.as_str()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/upload/session/def"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "f9" })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("local.pdf");
    std::fs::write(&local, b"x").unwrap();

    let id = storage.upload_file(&rid("p"), &local, None).await.unwrap();
    assert_eq!(id, rid("f9"));
}

#[tokio::test]
async fn test_upload_without_session_url_fails() {
    let (server, storage) = setup().await;

    Mock::given(method("POST"))
        .and(path("/upload/files"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("a.pdf");
    std::fs::write(&local, b"x").unwrap();

    let err = storage
        .upload_file(&rid("p"), &local, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_upload_of_missing_local_file_is_io_error() {
    let (_server, storage) = setup().await;
    let err = storage
        .upload_file(&rid("p"), std::path::Path::new("/nonexistent/a.pdf"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Io(_)));
}

// ============================================================================
// Folders and deletion
// ============================================================================

#[tokio::test]
async fn test_create_folder() {
    let (server, storage) = setup().await;

    Mock::given(method("POST"))
        .and(path("/files"))
        .and(body_partial_json(json!({
            "name": "Thesis",
            "mimeType": FOLDER_MIME
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "new-folder",
            "name": "Thesis",
            "mimeType": FOLDER_MIME
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = storage.create_folder("Thesis", None).await.unwrap();
    assert_eq!(id, rid("new-folder"));
}

#[tokio::test]
async fn test_delete_reports_existence() {
    let (server, storage) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/files/present"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/files/absent"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(storage.delete_file(&rid("present")).await.unwrap());
    assert!(!storage.delete_file(&rid("absent")).await.unwrap());
    assert!(!storage.delete_folder(&rid("absent")).await.unwrap());
}

// ============================================================================
// Metadata
// ============================================================================

#[tokio::test]
async fn test_get_metadata() {
    let (server, storage) = setup().await;

    Mock::given(method("GET"))
        .and(path("/files/folder-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "folder-1",
            "name": "Thesis",
            "mimeType": FOLDER_MIME,
            "parents": ["root-id"],
            "trashed": false
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/binned"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "binned",
            "name": "Old",
            "mimeType": "application/pdf",
            "trashed": true
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let item = storage.get_metadata(&rid("folder-1")).await.unwrap().unwrap();
    assert!(item.is_folder);
    assert_eq!(item.name, "Thesis");
    assert_eq!(item.parents, vec![rid("root-id")]);

    assert!(storage.get_metadata(&rid("binned")).await.unwrap().is_none());
    assert!(storage.get_metadata(&rid("missing")).await.unwrap().is_none());
}
