//! Client Integration Tests
//!
//! Drives a real server over TCP through `ApiClient`.

use std::sync::Arc;

use gestor::config::ServerConfig;
use gestor::file::MemoryStore;
use gestor::web::dto::{CreateFolderRequest, CreateUserRequest};
use gestor::{ApiClient, AppState, ClientError, Database, WebServer};
use reqwest::StatusCode;

async fn start_server() -> ApiClient {
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    let state = AppState::new(Arc::new(db), Arc::new(MemoryStore::new()));
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![],
    };

    let addr = WebServer::new(&config, state)
        .unwrap()
        .run_with_addr()
        .await
        .unwrap();
    ApiClient::new(format!("http://{}", addr)).unwrap()
}

#[tokio::test]
async fn test_client_file_round_trip() {
    let client = start_server().await;
    assert_eq!(client.health().await.unwrap(), "OK");
    assert_eq!(client.info().await.unwrap().storage, "memory");

    let admin = client
        .create_user(&CreateUserRequest {
            full_name: "Root Admin".to_string(),
            username: "root".to_string(),
            password: "correct horse".to_string(),
            role_id: 1,
        })
        .await
        .unwrap();
    let folder = client
        .create_folder(&CreateFolderRequest {
            folder_name: "Shared".to_string(),
            parent_folder_id: None,
            user_id: admin.id,
        })
        .await
        .unwrap();

    let file = client
        .upload_file("notes v2.txt", b"meeting notes".to_vec(), folder.id, admin.id)
        .await
        .unwrap();
    assert_eq!(file.file_name, "notes v2");
    assert_eq!(file.file_metadata["content_type"], "text/plain");

    let by_name = client.list_files_by_name("notes v2.txt").await.unwrap();
    assert_eq!(by_name.len(), 1);

    let content = client.download_file(file.id).await.unwrap();
    assert_eq!(content.as_ref(), b"meeting notes");

    let deleted = client
        .delete_file(file.id, "notes v2.txt", admin.id)
        .await
        .unwrap();
    assert_eq!(deleted.id, file.id);
    assert!(client.list_files().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_client_reports_api_errors() {
    let client = start_server().await;

    let err = client.get_file(42).await.unwrap_err();
    match err {
        ClientError::Api { status, code, .. } => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(code, "NOT_FOUND");
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = client
        .verify_credentials("nobody", "whatever pass")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
}

#[tokio::test]
async fn test_client_roles_and_users() {
    let client = start_server().await;

    let roles = client.list_roles().await.unwrap();
    assert_eq!(roles.len(), 2);

    let user = client
        .create_user(&CreateUserRequest {
            full_name: "Ana Diaz".to_string(),
            username: "ana".to_string(),
            password: "correct horse".to_string(),
            role_id: 2,
        })
        .await
        .unwrap();
    let checked = client
        .verify_credentials("ana", "correct horse")
        .await
        .unwrap();
    assert_eq!(checked.id, user.id);

    client.delete_user(user.id).await.unwrap();
    assert!(client.list_users().await.unwrap().is_empty());
}
