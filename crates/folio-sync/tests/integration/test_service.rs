//! FolderService tests

use std::time::Duration;

use folio_core::domain::{FolioError, LocalFolder, RequestContext, UserId};
use folio_core::ports::{IFolderStore, IRemoteStorage};
use folio_core::usecases::BrowseRequest;
use folio_sync::SkipReason;

use crate::common::{alice, ctx, rid, FakeConnector, Harness};

#[tokio::test]
async fn test_list_folders_runs_background_imports() {
    let h = Harness::new().await;
    let service = h.service();
    h.linked_folder("drv-1", "Papers").await;
    h.drive.add_pdf("drv-1", "f1", "a.pdf", "a");
    h.drive.add_pdf("drv-1", "f2", "b.pdf", "b");
    service.create_folder(&ctx(), "Scratch").await.unwrap();

    let summaries = service.list_folders(&ctx()).await.unwrap();

    assert_eq!(summaries.len(), 2);
    let papers = summaries.iter().find(|s| s.name == "Papers").unwrap();
    assert_eq!(papers.document_count, 2);
    assert!(papers.last_sync_at.is_some());
}

#[tokio::test]
async fn test_list_folders_without_remote_still_lists() {
    let h = Harness::new().await;
    let service = h.service_with(FakeConnector::unconfigured());
    h.linked_folder("drv-1", "Papers").await;

    let summaries = service.list_folders(&ctx()).await.unwrap();

    assert_eq!(summaries.len(), 1);
    assert!(summaries[0].last_sync_at.is_none());
}

// ============================================================================
// sync_folder
// ============================================================================

#[tokio::test]
async fn test_sync_folder_reports_skipped_items() {
    let h = Harness::new().await;
    let service = h.service();
    let folder = h.linked_folder("drv-1", "Papers").await;
    h.drive.add_pdf("drv-1", "f1", "a.pdf", "a");

    let first = service.sync_folder(&ctx(), folder.id()).await.unwrap();
    assert_eq!(first.imported, 1);

    h.drive.add_pdf("drv-1", "f2", "b.pdf", "b");
    h.drive.fail_download("f2");
    let second = service.sync_folder(&ctx(), folder.id()).await.unwrap();

    assert_eq!(second.imported, 0);
    let reasons: Vec<_> = second
        .skipped
        .iter()
        .map(|s| (s.id.as_str().to_string(), s.reason))
        .collect();
    assert!(reasons.contains(&("f1".to_string(), SkipReason::AlreadyImported)));
    assert!(reasons.contains(&("f2".to_string(), SkipReason::DownloadFailed)));
}

#[tokio::test]
async fn test_sync_folder_ignores_throttle() {
    let h = Harness::new().await;
    let service = h.service();
    let folder = h.linked_folder("drv-1", "Papers").await;

    service.sync_folder(&ctx(), folder.id()).await.unwrap();
    h.drive.add_pdf("drv-1", "f1", "a.pdf", "a");
    let report = service.sync_folder(&ctx(), folder.id()).await.unwrap();

    assert!(!report.throttled);
    assert_eq!(report.imported, 1);
}

#[tokio::test]
async fn test_sync_folder_rejects_unlinked_and_foreign_folders() {
    let h = Harness::new().await;
    let service = h.service();
    let local = LocalFolder::new(alice(), "Local").unwrap();
    h.store.save_folder(&local).await.unwrap();

    let err = service.sync_folder(&ctx(), local.id()).await.unwrap_err();
    assert!(matches!(err, FolioError::InvalidInput(_)));

    let linked = h.linked_folder("drv-1", "Papers").await;
    let bob = RequestContext::new(UserId::new("bob").unwrap());
    let err = service.sync_folder(&bob, linked.id()).await.unwrap_err();
    assert!(matches!(err, FolioError::NotFound(_)));
}

#[tokio::test]
async fn test_concurrent_syncs_do_not_double_import() {
    let h = Harness::new().await;
    let service = h.service();
    let folder = h.linked_folder("drv-1", "Papers").await;
    for i in 0..3 {
        h.drive
            .add_pdf("drv-1", &format!("f{i}"), &format!("doc{i}.pdf"), "text");
    }

    let context = ctx();
    let (a, b) = tokio::join!(
        service.sync_folder(&context, folder.id()),
        service.sync_folder(&context, folder.id()),
    );

    assert_eq!(a.unwrap().imported + b.unwrap().imported, 3);
    assert_eq!(h.documents(&folder).await.len(), 3);
    assert_eq!(h.stored_files(), 3);
}

// ============================================================================
// import_folder
// ============================================================================

#[tokio::test]
async fn test_import_creates_folder_named_after_remote() {
    let h = Harness::new().await;
    let service = h.service();
    h.drive.add_folder("drv-9", "Thesis");
    h.drive.add_pdf("drv-9", "f1", "chapter1.pdf", "one");

    let outcome = service
        .import_folder(&ctx(), rid("drv-9"), None, true)
        .await
        .unwrap();

    assert!(outcome.created);
    let summary = outcome.folder.unwrap();
    assert_eq!(summary.name, "Thesis");
    assert_eq!(summary.remote_folder_id, Some(rid("drv-9")));
    assert_eq!(summary.document_count, 1);
    assert_eq!(outcome.report.imported, 1);
}

#[tokio::test]
async fn test_import_prefers_requested_name() {
    let h = Harness::new().await;
    let service = h.service();
    h.drive.add_folder("drv-9", "Thesis");

    let outcome = service
        .import_folder(&ctx(), rid("drv-9"), Some("  My thesis "), true)
        .await
        .unwrap();

    assert_eq!(outcome.folder.unwrap().name, "My thesis");
}

#[tokio::test]
async fn test_import_of_missing_remote_folder_is_not_found() {
    let h = Harness::new().await;
    let service = h.service();

    let err = service
        .import_folder(&ctx(), rid("nope"), None, true)
        .await
        .unwrap_err();

    assert!(matches!(err, FolioError::NotFound(_)));
    assert!(h.store.list_folders(&alice()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_import_reuses_linked_folder_and_overwrites() {
    let h = Harness::new().await;
    let service = h.service();
    let folder = h.linked_folder("drv-1", "Papers").await;
    h.drive.add_pdf("drv-1", "f1", "a.pdf", "old");
    service.sync_folder(&ctx(), folder.id()).await.unwrap();
    h.drive.set_content("f1", "new");

    let outcome = service
        .import_folder(&ctx(), rid("drv-1"), None, true)
        .await
        .unwrap();

    assert!(!outcome.created);
    assert_eq!(outcome.folder.unwrap().id, *folder.id());
    assert_eq!(outcome.report.updated, 1);
    assert_eq!(h.documents(&folder).await[0].content(), "new");
}

#[tokio::test]
async fn test_import_of_vanished_folder_deletes_local_copy() {
    let h = Harness::new().await;
    let service = h.service();
    let folder = h.linked_folder("drv-1", "Papers").await;
    h.drive.add_pdf("drv-1", "f1", "a.pdf", "a");
    service.sync_folder(&ctx(), folder.id()).await.unwrap();
    h.drive.remove_folder("drv-1");

    let outcome = service
        .import_folder(&ctx(), rid("drv-1"), None, true)
        .await
        .unwrap();

    assert!(outcome.folder.is_none());
    assert!(outcome.report.deleted_folder);
    assert_eq!(outcome.report.deleted, 1);
    assert!(h.reload(&folder).await.is_none());
}

// ============================================================================
// Folder and document operations
// ============================================================================

#[tokio::test]
async fn test_create_and_delete_folder() {
    let h = Harness::new().await;
    let service = h.service();

    let created = service.create_folder(&ctx(), "Reading").await.unwrap();
    assert!(created.remote_warning.is_none());
    let remote_id = created.folder.remote_folder_id().unwrap().clone();
    service.sync_folder(&ctx(), created.folder.id()).await.unwrap();

    let purge = service
        .delete_folder(&ctx(), created.folder.id())
        .await
        .unwrap();
    assert_eq!(purge.documents_removed, 0);
    assert!(h.reload(&created.folder).await.is_none());
    assert!(service.engine().locks().is_empty());
    assert!(h.drive.get_metadata(&remote_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_upload_pushes_to_linked_folder_and_search_finds_it() {
    let h = Harness::new().await;
    let service = h.service();
    let folder = h.linked_folder("drv-1", "Papers").await;
    let source = h.dir.path().join("notes.pdf");
    tokio::fs::write(&source, "the quick brown fox").await.unwrap();

    let outcome = service
        .upload_document(&ctx(), folder.id(), &source, None)
        .await
        .unwrap();
    assert!(outcome.remote_warning.is_none());
    assert!(outcome.document.is_linked());
    assert_eq!(h.drive.files_in("drv-1").len(), 1);

    // The pushed file is linked, so a pass does not import it again
    let report = service.sync_folder(&ctx(), folder.id()).await.unwrap();
    assert_eq!(report.imported, 0);

    let found = service
        .search_folder(&ctx(), folder.id(), "BROWN")
        .await
        .unwrap();
    assert_eq!(found.total_matches, 1);

    let view = service
        .get_document(&ctx(), outcome.document.id())
        .await
        .unwrap();
    assert_eq!(view.original_name, "notes.pdf");

    let deletion = service
        .delete_document(&ctx(), outcome.document.id())
        .await
        .unwrap();
    assert!(deletion.file_removed);
    assert!(h.drive.files_in("drv-1").is_empty());
}

#[tokio::test]
async fn test_browse_and_list_remote_files() {
    let h = Harness::new().await;
    let service = h.service();
    h.drive.add_folder("drv-1", "Research Papers");
    h.drive.add_folder("drv-2", "Recipes");
    h.drive.add_pdf("drv-1", "f1", "a.pdf", "a");

    let request = BrowseRequest {
        parent: None,
        q: Some("paper".to_string()),
        limit: None,
    };
    let response = service.browse_remote_folders(&ctx(), &request).await.unwrap();
    assert_eq!(response.folders.len(), 1);
    assert_eq!(response.folders[0].id, rid("drv-1"));

    let files = service
        .list_remote_files(&ctx(), &rid("drv-1"), false)
        .await
        .unwrap();
    assert_eq!(files.files.len(), 1);
    assert!(!files.recursive);
}

#[tokio::test]
async fn test_delete_document_waits_for_running_pass() {
    let h = Harness::new().await;
    let service = h.service();
    let ctx = ctx();
    let folder = h.linked_folder("drv-1", "Papers").await;
    let local = h.local_document(&folder, "notes.pdf", "notes").await;
    let gate = h.drive.hold_uploads();

    let pass = service.import_folder(&ctx, rid("drv-1"), None, false);
    let delete = async {
        gate.started.notified().await;
        let deletion = service.delete_document(&ctx, local.id());
        tokio::pin!(deletion);
        let early = tokio::time::timeout(Duration::from_millis(20), &mut deletion).await;
        assert!(early.is_err(), "deletion must wait for the pass to release the folder");
        gate.release.notify_one();
        deletion.await
    };
    let (outcome, deletion) = tokio::join!(pass, delete);

    assert_eq!(outcome.unwrap().report.pushed, 1);
    deletion.unwrap();
    assert!(h.store.get_document(local.id()).await.unwrap().is_none());
    assert_eq!(h.stored_files(), 0);
    assert!(h.drive.files_in("drv-1").is_empty());
}

// ============================================================================
// Assistant context
// ============================================================================

#[tokio::test]
async fn test_folder_context_and_overview_after_sync() {
    let h = Harness::new().await;
    let service = h.service();
    let folder = h.linked_folder("drv-1", "Papers").await;
    h.drive.add_pdf("drv-1", "f1", "a.pdf", "alpha text");
    service.sync_folder(&ctx(), folder.id()).await.unwrap();

    let context = service
        .folder_context(&ctx(), &[*folder.id()])
        .await
        .unwrap();
    let text = context.render();
    assert!(text.contains("=== FOLDER: Papers ==="));
    assert!(text.contains("--- DOCUMENT: a.pdf ---"));
    assert!(text.contains("alpha text"));

    let other = RequestContext::new(UserId::new("bob").unwrap());
    assert!(service
        .folder_context(&other, &[*folder.id()])
        .await
        .unwrap()
        .is_empty());

    let overview = service.folders_overview(&ctx()).await.unwrap();
    assert_eq!(overview.len(), 1);
    assert_eq!(overview[0].documents.len(), 1);
    assert_eq!(overview[0].documents[0].name, "a.pdf");
}
