//! Folder and file listing against a mocked files.list endpoint

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use folio_core::domain::{RemoteError, RemoteParent};
use folio_core::ports::{list_files_recursive, FolderQuery, IRemoteStorage, ListOrder, PageLimit};

use crate::common::{file_json, folder_json, page, rid, setup, TOKEN};

const ROOT_FOLDERS_Q: &str =
    "mimeType = 'application/vnd.google-apps.folder' and trashed = false and 'root' in parents";

#[tokio::test]
async fn test_lists_root_folders_with_bearer_token() {
    let (server, storage) = setup().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(header("Authorization", format!("Bearer {TOKEN}").as_str()))
        .and(query_param("q", ROOT_FOLDERS_Q))
        .and(query_param("orderBy", "modifiedTime desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![
                folder_json("f1", "Taxes", "root-id"),
                folder_json("f2", "Thesis", "root-id"),
            ],
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let folders = storage
        .list_child_folders(&FolderQuery::new(RemoteParent::Root))
        .await
        .unwrap();

    assert_eq!(folders.len(), 2);
    assert_eq!(folders[0].id, rid("f1"));
    assert_eq!(folders[0].name, "Taxes");
    assert_eq!(folders[0].parent_id, Some(rid("root-id")));
    assert!(folders[0].modified_at.is_some());
}

#[tokio::test]
async fn test_follows_page_tokens_when_unbounded() {
    let (server, storage) = setup().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![folder_json("f3", "Gamma", "root-id")],
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![
                folder_json("f1", "Alpha", "root-id"),
                folder_json("f2", "Beta", "root-id"),
            ],
            Some("page-2"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let query = FolderQuery::new(RemoteParent::Root).with_limit(PageLimit::Unbounded);
    let folders = storage.list_child_folders(&query).await.unwrap();

    let names: Vec<&str> = folders.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);
}

#[tokio::test]
async fn test_stops_paging_once_limit_is_met() {
    let (server, storage) = setup().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("pageSize", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![
                folder_json("f1", "Alpha", "root-id"),
                folder_json("f2", "Beta", "root-id"),
            ],
            Some("page-2"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let query = FolderQuery::new(RemoteParent::Root).with_limit(PageLimit::Max(2));
    let folders = storage.list_child_folders(&query).await.unwrap();
    assert_eq!(folders.len(), 2);
}

#[tokio::test]
async fn test_name_filter_is_case_insensitive_and_deduplicated() {
    let (server, storage) = setup().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![
                folder_json("f1", "TAX 2025", "a"),
                folder_json("f2", "Receipts", "b"),
                folder_json("f1", "TAX 2025", "a"),
                folder_json("f3", "old taxes", "c"),
            ],
            None,
        )))
        .mount(&server)
        .await;

    let query = FolderQuery::new(RemoteParent::Any)
        .with_name_filter("Tax")
        .with_limit(PageLimit::Unbounded);
    let folders = storage.list_child_folders(&query).await.unwrap();

    let ids: Vec<&str> = folders.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["f1", "f3"]);

    let requests = server.received_requests().await.unwrap();
    let url = requests[0].url.to_string();
    assert!(!url.contains("in+parents") && !url.contains("in%20parents"));
}

#[tokio::test]
async fn test_order_by_name() {
    let (server, storage) = setup().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("orderBy", "name"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], None)))
        .expect(1)
        .mount(&server)
        .await;

    let query = FolderQuery::new(RemoteParent::Root).with_order(ListOrder::Name);
    assert!(storage.list_child_folders(&query).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_parent_lists_nothing() {
    let (server, storage) = setup().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(404).set_body_string("File not found: gone"))
        .mount(&server)
        .await;

    let query = FolderQuery::new(RemoteParent::Id(rid("gone")));
    assert!(storage.list_child_folders(&query).await.unwrap().is_empty());
    assert!(storage
        .list_child_files(&rid("gone"), Some("application/pdf"), PageLimit::Unbounded)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_server_error_is_reported() {
    let (server, storage) = setup().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
        .mount(&server)
        .await;

    let err = storage
        .list_child_folders(&FolderQuery::new(RemoteParent::Root))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Server { status: 503, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_lists_pdf_files_with_sizes() {
    let (server, storage) = setup().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param(
            "q",
            "'folder-1' in parents and trashed = false and mimeType = 'application/pdf'",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![file_json("p1", "paper.pdf", "application/pdf", 2048)],
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let files = storage
        .list_child_files(&rid("folder-1"), Some("application/pdf"), PageLimit::Unbounded)
        .await
        .unwrap();

    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "paper.pdf");
    assert_eq!(files[0].mime_type, "application/pdf");
    assert_eq!(files[0].size_bytes, Some(2048));
}

#[tokio::test]
async fn test_recursive_listing_descends_into_subfolders() {
    let (server, storage) = setup().await;
    let pdf = "application/pdf";

    let files_q = |parent: &str| {
        format!("'{parent}' in parents and trashed = false and mimeType = '{pdf}'")
    };
    let folders_q = |parent: &str| {
        format!(
            "mimeType = 'application/vnd.google-apps.folder' and trashed = false and '{parent}' in parents"
        )
    };

    for (q, body) in [
        (
            files_q("root-folder"),
            page(vec![file_json("a", "a.pdf", pdf, 1)], None),
        ),
        (
            folders_q("root-folder"),
            page(vec![folder_json("sub", "Sub", "root-folder")], None),
        ),
        (
            files_q("sub"),
            page(vec![file_json("b", "b.pdf", pdf, 2)], None),
        ),
        (folders_q("sub"), page(vec![], None)),
    ] {
        Mock::given(method("GET"))
            .and(path("/files"))
            .and(query_param("q", q.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;
    }

    let files = list_files_recursive(&storage, &rid("root-folder"), Some(pdf))
        .await
        .unwrap();
    let ids: Vec<&str> = files.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}
