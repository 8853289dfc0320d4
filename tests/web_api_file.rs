//! Web API File Tests
//!
//! Integration tests for upload, download, listing and deletion, including
//! object store failures.

mod common;

use axum::http::StatusCode;
use common::{TestApp, ADMIN_ROLE, USER_ROLE};
use gestor::file::{FileRecordStore, FileRepository};
use serde_json::Value;

// ============================================================================
// Upload Tests
// ============================================================================

#[tokio::test]
async fn test_upload_registers_file() {
    let app = TestApp::new().await;
    let owner = app.create_user("ana", USER_ROLE).await;
    let folder = app.create_folder("Shared").await;

    let response = app.upload("report.pdf", b"%PDF-1.4", folder, owner).await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    let file = &body["data"];
    assert_eq!(file["file_name"], "report");
    assert_eq!(file["file_type"], ".pdf");
    assert_eq!(file["folder_id"], folder);
    assert_eq!(file["owner_id"], owner);
    assert_eq!(file["storage_key"], "report.pdf");
    assert_eq!(file["file_metadata"]["size_bytes"], 8);
    assert_eq!(file["file_metadata"]["content_type"], "application/pdf");
    assert!(app.objects.contains("report.pdf").await);
}

#[tokio::test]
async fn test_upload_fails_cleanly_when_object_store_fails() {
    let app = TestApp::new().await;
    let owner = app.create_user("ana", USER_ROLE).await;
    let folder = app.create_folder("Shared").await;
    app.objects.set_fail_put(true);

    let response = app.upload("report.pdf", b"content", folder, owner).await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "UPSTREAM_FAILURE");

    let named = app.server.get("/files/get-file-name/report").await;
    named.assert_status_ok();
    assert!(named.json::<Value>()["data"].as_array().unwrap().is_empty());
    assert_eq!(app.objects.len(), 0);
}

#[tokio::test]
async fn test_upload_duplicate_name_conflicts() {
    let app = TestApp::new().await;
    let owner = app.create_user("ana", USER_ROLE).await;
    let folder = app.create_folder("Shared").await;

    app.upload("notes.txt", b"one", folder, owner)
        .await
        .assert_status(StatusCode::CREATED);
    let response = app.upload("notes.txt", b"two", folder, owner).await;
    response.assert_status(StatusCode::CONFLICT);

    let download = app.server.get("/files/download-file/1").await;
    assert_eq!(download.as_bytes().as_ref(), b"one");
}

#[tokio::test]
async fn test_upload_rejects_path_separators() {
    let app = TestApp::new().await;
    let owner = app.create_user("ana", USER_ROLE).await;
    let folder = app.create_folder("Shared").await;

    let response = app
        .upload("../../etc/report.pdf", b"content", folder, owner)
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response.json::<Value>()["error"]["code"],
        "UNPROCESSABLE_ENTITY"
    );

    let named = app.server.get("/files/get-file-name/report").await;
    assert!(named.json::<Value>()["data"].as_array().unwrap().is_empty());
    assert_eq!(app.objects.len(), 0);
}

#[tokio::test]
async fn test_upload_does_not_overwrite_unregistered_object() {
    let app = TestApp::new().await;
    let owner = app.create_user("ana", USER_ROLE).await;
    let folder = app.create_folder("Shared").await;
    app.objects.insert("notes.txt", b"in flight").await;

    let response = app.upload("notes.txt", b"mine", folder, owner).await;
    response.assert_status(StatusCode::CONFLICT);

    let named = app.server.get("/files/get-file-name/notes").await;
    assert!(named.json::<Value>()["data"].as_array().unwrap().is_empty());
    assert_eq!(app.objects.len(), 1);
}

#[tokio::test]
async fn test_upload_requires_known_owner_and_folder() {
    let app = TestApp::new().await;
    let owner = app.create_user("ana", USER_ROLE).await;
    let folder = app.create_folder("Shared").await;

    app.upload("a.txt", b"x", folder, 99)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.upload("a.txt", b"x", 99, owner)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    assert_eq!(app.objects.len(), 0);
}

#[tokio::test]
async fn test_upload_rejects_role_without_capability() {
    let app = TestApp::new().await;
    let role = app
        .server
        .post("/roles/create-role")
        .json(&serde_json::json!({ "role_name": "viewer" }))
        .await
        .json::<Value>()["data"]["id"]
        .as_i64()
        .unwrap();
    let viewer = app.create_user("vera", role).await;
    let folder = app.create_folder("Shared").await;

    let response = app.upload("a.txt", b"x", folder, viewer).await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_upload_missing_fields() {
    let app = TestApp::new().await;

    let form = axum_test::multipart::MultipartForm::new().add_text("folder_id", "1");
    let response = app
        .server
        .post("/files/upload-register-file")
        .multipart(form)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"]["code"], "BAD_REQUEST");
}

// ============================================================================
// Read Tests
// ============================================================================

#[tokio::test]
async fn test_listing_endpoints() {
    let app = TestApp::new().await;
    let ana = app.create_user("ana", USER_ROLE).await;
    let bob = app.create_user("bob", USER_ROLE).await;
    let folder = app.create_folder("Shared").await;

    app.upload("a.txt", b"a", folder, ana).await;
    app.upload("b.txt", b"b", folder, bob).await;

    let all: Value = app.server.get("/files/get-files").await.json();
    assert_eq!(all["data"].as_array().unwrap().len(), 2);

    let by_owner: Value = app
        .server
        .get(&format!("/files/get-files-user-id/{}", ana))
        .await
        .json();
    let owned = by_owner["data"].as_array().unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0]["file_name"], "a");

    let by_name: Value = app.server.get("/files/get-file-name/b.txt").await.json();
    assert_eq!(by_name["data"][0]["owner_id"], bob);
}

#[tokio::test]
async fn test_get_file_by_id() {
    let app = TestApp::new().await;
    let owner = app.create_user("ana", USER_ROLE).await;
    let folder = app.create_folder("Shared").await;
    let id = app.upload("a.txt", b"a", folder, owner).await.json::<Value>()["data"]["id"]
        .as_i64()
        .unwrap();

    let response = app.server.get(&format!("/files/get-file-id/{}", id)).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["storage_key"], "a.txt");

    let response = app.server.get("/files/get-file-id/999").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_download_file() {
    let app = TestApp::new().await;
    let owner = app.create_user("ana", USER_ROLE).await;
    let folder = app.create_folder("Shared").await;
    let id = app
        .upload("résumé.txt", b"hello world", folder, owner)
        .await
        .json::<Value>()["data"]["id"]
        .as_i64()
        .unwrap();

    let response = app.server.get(&format!("/files/download-file/{}", id)).await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), b"hello world");
    assert!(response
        .header("content-type")
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    let disposition = response.header("content-disposition");
    let disposition = String::from_utf8_lossy(disposition.as_bytes());
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains("filename*=UTF-8''r%C3%A9sum%C3%A9.txt"));

    app.server
        .get("/files/download-file/999")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_missing_object_is_not_found() {
    let app = TestApp::new().await;
    let owner = app.create_user("ana", USER_ROLE).await;
    let folder = app.create_folder("Shared").await;
    let id = app
        .upload("report.pdf", b"%PDF-1.4", folder, owner)
        .await
        .json::<Value>()["data"]["id"]
        .as_i64()
        .unwrap();
    app.objects.remove("report.pdf").await;

    let response = app.server.get(&format!("/files/download-file/{}", id)).await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"]["code"], "NOT_FOUND");
}

// ============================================================================
// Delete Tests
// ============================================================================

#[tokio::test]
async fn test_owner_deletes_file() {
    let app = TestApp::new().await;
    let owner = app.create_user("ana", USER_ROLE).await;
    let folder = app.create_folder("Shared").await;
    let id = app.upload("a.txt", b"a", folder, owner).await.json::<Value>()["data"]["id"]
        .as_i64()
        .unwrap();

    let response = app
        .server
        .delete(&format!("/files/delete-file/{}/a.txt/{}", id, owner))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["id"], id);

    assert!(!app.objects.contains("a.txt").await);
    app.server
        .get(&format!("/files/get-file-id/{}", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_deletes_any_file_stranger_cannot() {
    let app = TestApp::new().await;
    let owner = app.create_user("ana", USER_ROLE).await;
    let stranger = app.create_user("bob", USER_ROLE).await;
    let admin = app.create_user("root", ADMIN_ROLE).await;
    let folder = app.create_folder("Shared").await;
    let id = app.upload("a.txt", b"a", folder, owner).await.json::<Value>()["data"]["id"]
        .as_i64()
        .unwrap();

    let response = app
        .server
        .delete(&format!("/files/delete-file/{}/a/{}", id, stranger))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert!(app.objects.contains("a.txt").await);

    app.server
        .delete(&format!("/files/delete-file/{}/a/{}", id, admin))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_delete_name_mismatch() {
    let app = TestApp::new().await;
    let owner = app.create_user("ana", USER_ROLE).await;
    let folder = app.create_folder("Shared").await;
    let id = app.upload("a.txt", b"a", folder, owner).await.json::<Value>()["data"]["id"]
        .as_i64()
        .unwrap();
    app.upload("b.txt", b"b", folder, owner).await;

    let response = app
        .server
        .delete(&format!("/files/delete-file/{}/b.txt/{}", id, owner))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(app.objects.contains("a.txt").await);
}

#[tokio::test]
async fn test_delete_missing_file() {
    let app = TestApp::new().await;
    let owner = app.create_user("ana", USER_ROLE).await;

    app.server
        .delete(&format!("/files/delete-file/5/a.txt/{}", owner))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_restores_record_when_object_delete_fails() {
    let app = TestApp::new().await;
    let owner = app.create_user("ana", USER_ROLE).await;
    let folder = app.create_folder("Shared").await;
    let id = app
        .upload("report.pdf", b"%PDF", folder, owner)
        .await
        .json::<Value>()["data"]["id"]
        .as_i64()
        .unwrap();

    let records = FileRepository::new(app.db.pool());
    let before = records.get_by_id(id).await.unwrap().unwrap();

    app.objects.set_fail_delete(true);
    let response = app
        .server
        .delete(&format!("/files/delete-file/{}/report/{}", id, owner))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.json::<Value>()["error"]["code"],
        "INVARIANT_RESTORED"
    );

    let after = records.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(after, before);
    assert!(app.objects.contains("report.pdf").await);
}
