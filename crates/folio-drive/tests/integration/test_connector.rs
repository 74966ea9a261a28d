//! Session opening: credential lookup, expiry handling and token refresh

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use folio_core::config::{ConfigBuilder, DriveConfig};
use folio_core::domain::{RemoteError, RemoteParent, UserId};
use folio_core::ports::{FolderQuery, IRemoteConnector, RemoteCredentials};
use folio_drive::DriveConnector;

use crate::common::{page, upload_base, MemoryCredentials};

fn alice() -> UserId {
    UserId::new("alice").unwrap()
}

fn drive_config(server: &MockServer) -> DriveConfig {
    ConfigBuilder::new()
        .drive_api_base_url(server.uri())
        .drive_upload_base_url(upload_base(server))
        .drive_token_uri(format!("{}/token", server.uri()))
        .build()
        .drive
}

fn refreshable(access_token: &str, expires_in: Duration) -> RemoteCredentials {
    let mut creds = RemoteCredentials::with_access_token(access_token);
    creds.refresh_token = Some("refresh-1".to_string());
    creds.client_id = Some("client-id".to_string());
    creds.client_secret = Some("client-secret".to_string());
    creds.expires_at = Some(Utc::now() + expires_in);
    creds
}

async fn mount_listing_for(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(header("Authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], None)))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_user_without_credentials_is_not_configured() {
    let server = MockServer::start().await;
    let connector = DriveConnector::new(Arc::new(MemoryCredentials::default()), drive_config(&server));

    let result = connector.connect(&alice()).await;
    assert!(matches!(result, Err(RemoteError::NotConfigured)));
}

#[tokio::test]
async fn test_valid_token_is_used_as_is() {
    let server = MockServer::start().await;
    mount_listing_for(&server, "stored-token").await;

    let store = Arc::new(MemoryCredentials::with(
        &alice(),
        refreshable("stored-token", Duration::hours(1)),
    ));
    let connector = DriveConnector::new(store, drive_config(&server));

    let Ok(storage) = connector.connect(&alice()).await else {
        panic!("connect failed");
    };
    storage
        .list_child_folders(&FolderQuery::new(RemoteParent::Root))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_expiring_token_is_refreshed_and_persisted() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "token_type": "Bearer",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_listing_for(&server, "fresh-token").await;

    let store = Arc::new(MemoryCredentials::with(
        &alice(),
        refreshable("stale-token", Duration::seconds(10)),
    ));
    let connector = DriveConnector::new(store.clone(), drive_config(&server));

    let Ok(storage) = connector.connect(&alice()).await else {
        panic!("connect failed");
    };
    storage
        .list_child_folders(&FolderQuery::new(RemoteParent::Root))
        .await
        .unwrap();

    let saved = store.get(&alice()).unwrap();
    assert_eq!(saved.access_token, "fresh-token");
    assert_eq!(saved.refresh_token.as_deref(), Some("refresh-1"));
    assert!(saved.expires_at.unwrap() > Utc::now() + Duration::minutes(30));
}

#[tokio::test]
async fn test_expired_token_without_refresh_is_unauthorized() {
    let server = MockServer::start().await;
    let mut creds = RemoteCredentials::with_access_token("old");
    creds.expires_at = Some(Utc::now() - Duration::minutes(5));

    let connector = DriveConnector::new(
        Arc::new(MemoryCredentials::with(&alice(), creds)),
        drive_config(&server),
    );

    let result = connector.connect(&alice()).await;
    assert!(matches!(result, Err(RemoteError::Unauthorized(_))));
}

#[tokio::test]
async fn test_rejected_refresh_is_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentials::with(
        &alice(),
        refreshable("stale-token", Duration::seconds(-30)),
    ));
    let connector = DriveConnector::new(store.clone(), drive_config(&server));

    let result = connector.connect(&alice()).await;
    assert!(matches!(result, Err(RemoteError::Unauthorized(_))));
    assert_eq!(store.get(&alice()).unwrap().access_token, "stale-token");
}
