//! Shared helpers for HTTP integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use bytes::Bytes;
use gestor::db::{NewUser, UserRepository};
use gestor::file::{
    FolderRepository, MemoryStore, NewFolder, ObjectStore, StorageError, StorageResult,
};
use gestor::web::handlers::AppState;
use gestor::web::router::create_router;
use gestor::{hash_password, Database};

/// Seeded administrative role.
pub const ADMIN_ROLE: i64 = 1;
/// Seeded regular role (may upload, may not create folders).
pub const USER_ROLE: i64 = 2;

/// Password used for every test user.
pub const TEST_PASSWORD: &str = "correct horse battery";

/// Memory store whose writes and deletes can be switched to fail.
#[derive(Debug, Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    fail_put: AtomicBool,
    fail_delete: AtomicBool,
}

impl FaultyStore {
    pub fn set_fail_put(&self, fail: bool) {
        self.fail_put.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.inner.exists(key).await.unwrap()
    }

    /// Remove an object behind the API's back.
    pub async fn remove(&self, key: &str) {
        self.inner.delete(key).await.unwrap();
    }

    /// Write an object behind the API's back.
    pub async fn insert(&self, key: &str, content: &'static [u8]) {
        self.inner
            .put(key, Bytes::from_static(content), "application/octet-stream")
            .await
            .unwrap();
    }

    fn injected(what: &str) -> StorageError {
        StorageError::Io(std::io::Error::other(format!("injected {what} failure")))
    }
}

#[async_trait]
impl ObjectStore for FaultyStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(Self::injected("put"));
        }
        self.inner.put(key, data, content_type).await
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Self::injected("delete"));
        }
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    fn object_url(&self, key: &str) -> String {
        self.inner.object_url(key)
    }

    fn backend_name(&self) -> &'static str {
        "faulty-memory"
    }
}

/// A router over an in-memory database and a [`FaultyStore`].
pub struct TestApp {
    pub server: TestServer,
    pub db: Arc<Database>,
    pub objects: Arc<FaultyStore>,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Arc::new(
            Database::open_in_memory()
                .await
                .expect("Failed to create test database"),
        );
        let objects = Arc::new(FaultyStore::default());

        let app_state = Arc::new(AppState::new(db.clone(), objects.clone()));
        let router = create_router(app_state, &[]);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            db,
            objects,
        }
    }

    /// Insert a user directly and return its ID.
    pub async fn create_user(&self, username: &str, role_id: i64) -> i64 {
        let hash = hash_password(TEST_PASSWORD).unwrap();
        UserRepository::new(self.db.pool())
            .create(&NewUser::new(
                format!("{} Tester", username),
                username,
                hash,
                role_id,
            ))
            .await
            .expect("Failed to create test user")
            .id
    }

    /// Insert a root folder directly and return its ID.
    pub async fn create_folder(&self, name: &str) -> i64 {
        FolderRepository::new(self.db.pool())
            .create(&NewFolder::new(name))
            .await
            .expect("Failed to create test folder")
            .id
    }

    /// POST a multipart upload.
    pub async fn upload(
        &self,
        filename: &str,
        content: &[u8],
        folder_id: i64,
        owner_id: i64,
    ) -> TestResponse {
        let part = Part::bytes(content.to_vec()).file_name(filename.to_string());
        let form = MultipartForm::new()
            .add_part("file", part)
            .add_text("folder_id", folder_id.to_string())
            .add_text("owner_id", owner_id.to_string());

        self.server
            .post("/files/upload-register-file")
            .multipart(form)
            .await
    }
}
