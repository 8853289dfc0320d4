//! File lifecycle across the metadata store and the object store.
//!
//! A file is live only while both its row and its object exist. The two
//! stores share no transaction, so every mutation is ordered and has at
//! most one compensating step:
//!
//! - upload: object first, then row. A failed insert deletes the object.
//! - delete: row first, then object. A failed object delete re-inserts the
//!   row from its snapshot.
//!
//! Every remote call is bounded by the configured per-call timeout.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, error, info, instrument, warn};

use super::key::storage_key;
use super::metadata::{describe_content, FileRecord, FileRecordStore, NewFile};
use super::storage::{ObjectStore, StorageError};
use crate::{GestorError, Result};

/// Default per-call timeout.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Content and placement of a file being uploaded.
#[derive(Debug, Clone)]
pub struct Upload {
    /// File bytes.
    pub content: Bytes,
    /// Display name without extension.
    pub file_name: String,
    /// Extension including the leading dot (may be empty).
    pub file_type: String,
    /// MIME type recorded with the object.
    pub content_type: String,
    /// Destination folder.
    pub folder_id: i64,
    /// Owning user.
    pub owner_id: i64,
}

/// Who is asking to delete a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    /// Requesting user.
    pub user_id: i64,
    /// Whether the user's role is administrative.
    pub is_admin: bool,
}

impl Requester {
    /// Owners and administrators may delete a file.
    pub fn can_delete(&self, record: &FileRecord) -> bool {
        self.is_admin || record.owner_id == self.user_id
    }
}

/// Coordinates file writes and deletes across both stores.
pub struct FileLifecycle<'a, M: ?Sized, O: ?Sized> {
    metadata: &'a M,
    objects: &'a O,
    key_prefix: Option<String>,
    call_timeout: Duration,
}

impl<'a, M, O> FileLifecycle<'a, M, O>
where
    M: FileRecordStore + ?Sized,
    O: ObjectStore + ?Sized,
{
    /// Create a coordinator over the given stores.
    pub fn new(metadata: &'a M, objects: &'a O) -> Self {
        Self {
            metadata,
            objects,
            key_prefix: None,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Prefix every derived storage key.
    pub fn with_key_prefix(mut self, prefix: Option<String>) -> Self {
        self.key_prefix = prefix;
        self
    }

    /// Set the per-call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Store a file: object first, then its record.
    ///
    /// Fails with `Validation` for unusable names and `Conflict` when the key
    /// already belongs to a record or object. Existing objects are never
    /// overwritten. A failed object
    /// write leaves no record behind. A failed insert removes the object
    /// again unless another record claimed the key meanwhile.
    #[instrument(
        skip(self, upload),
        fields(file_name = %upload.file_name, folder_id = upload.folder_id, owner_id = upload.owner_id)
    )]
    pub async fn upload(&self, upload: Upload) -> Result<FileRecord> {
        let key = storage_key(
            self.key_prefix.as_deref(),
            &upload.file_name,
            &upload.file_type,
        )?;

        if self
            .call("metadata lookup", self.metadata.get_by_storage_key(&key))
            .await?
            .is_some()
        {
            return Err(GestorError::Conflict(format!("file {key} already exists")));
        }

        let file_metadata = describe_content(&upload.content, &upload.content_type);

        self.call("object put", async {
            self.objects
                .put(&key, upload.content.clone(), &upload.content_type)
                .await
                .map_err(GestorError::from)
        })
        .await
        .map_err(|e| match e {
            GestorError::Storage(StorageError::AlreadyExists(_)) => {
                warn!("Object {} was written by a concurrent upload", key);
                GestorError::Conflict(format!("file {key} already exists"))
            }
            e => {
                error!("Object write failed for {}: {}", key, e);
                e
            }
        })?;
        debug!("Wrote object {}", key);

        let new_file = NewFile {
            file_name: upload.file_name,
            file_type: upload.file_type,
            file_metadata,
            folder_id: upload.folder_id,
            owner_id: upload.owner_id,
            s3_url: self.objects.object_url(&key),
            storage_key: key,
        };

        match self.call("metadata insert", self.metadata.insert(&new_file)).await {
            Ok(record) => {
                info!("Uploaded file {} as {}", record.id, record.storage_key);
                Ok(record)
            }
            Err(e) => {
                error!("Metadata insert failed for {}: {}", new_file.storage_key, e);
                self.rollback_object(&new_file.storage_key).await;
                Err(e)
            }
        }
    }

    async fn rollback_object(&self, key: &str) {
        match self
            .call("metadata lookup", self.metadata.get_by_storage_key(key))
            .await
        {
            Ok(Some(owner)) => {
                warn!(
                    "Object {} now belongs to file {}; leaving it in place",
                    key, owner.id
                );
                return;
            }
            Ok(None) => {}
            Err(e) => warn!("Could not check ownership of {} before rollback: {}", key, e),
        }

        let deleted = self
            .call("object rollback", async {
                self.objects.delete(key).await.map_err(GestorError::from)
            })
            .await;
        match deleted {
            Ok(()) => debug!("Rolled back object {}", key),
            Err(e) => error!("Rollback of object {} failed, object is orphaned: {}", key, e),
        }
    }

    /// Check that `file_name` names the file with `file_id`.
    ///
    /// The name may be the display name or the full name. Returns NotFound
    /// when the id does not exist and Mismatch when it names another file.
    pub async fn check_identity(&self, file_id: i64, file_name: &str) -> Result<FileRecord> {
        let named = self
            .call("metadata lookup", self.metadata.list_by_name(file_name))
            .await?;
        if let Some(record) = named.into_iter().find(|r| r.id == file_id) {
            return Ok(record);
        }

        match self
            .call("metadata lookup", self.metadata.get_by_id(file_id))
            .await?
        {
            None => Err(GestorError::NotFound("file".to_string())),
            Some(record) => Err(GestorError::Mismatch(format!(
                "file {} is {}, not {}",
                file_id,
                record.full_name(),
                file_name
            ))),
        }
    }

    /// Delete a file: record first, then object.
    ///
    /// If the object delete fails the record is re-inserted from its
    /// snapshot, yielding `InvariantRestored`, or `InvariantViolated` when
    /// the re-insert fails too. Returns the deleted record on success.
    #[instrument(skip(self), fields(user_id = requester.user_id))]
    pub async fn delete(&self, file_id: i64, requester: &Requester) -> Result<FileRecord> {
        let snapshot = self
            .call("metadata lookup", self.metadata.get_by_id(file_id))
            .await?
            .ok_or_else(|| GestorError::NotFound("file".to_string()))?;

        if !requester.can_delete(&snapshot) {
            warn!(
                "User {} may not delete file {} owned by {}",
                requester.user_id, file_id, snapshot.owner_id
            );
            return Err(GestorError::Permission(
                "only the owner or an administrator can delete this file".to_string(),
            ));
        }

        // Zero rows means a concurrent delete won.
        if !self
            .call("metadata delete", self.metadata.delete(file_id))
            .await?
        {
            return Err(GestorError::NotFound("file".to_string()));
        }

        let deleted = self
            .call("object delete", async {
                self.objects
                    .delete(&snapshot.storage_key)
                    .await
                    .map_err(GestorError::from)
            })
            .await;

        let cause = match deleted {
            Ok(()) => {
                info!("Deleted file {} ({})", file_id, snapshot.storage_key);
                return Ok(snapshot);
            }
            Err(e) => e.to_string(),
        };

        warn!(
            "Object delete failed for file {}: {}; restoring metadata",
            file_id, cause
        );
        match self
            .call("metadata restore", self.metadata.restore(&snapshot))
            .await
        {
            Ok(()) => Err(GestorError::InvariantRestored { file_id, cause }),
            Err(restore_error) => {
                error!(
                    "Metadata restore failed for file {}; object {} has no record: {}",
                    file_id, snapshot.storage_key, restore_error
                );
                Err(GestorError::InvariantViolated {
                    file_id,
                    cause,
                    restore_error: restore_error.to_string(),
                })
            }
        }
    }

    /// Fetch a file's record and bytes.
    pub async fn download(&self, file_id: i64) -> Result<(FileRecord, Bytes)> {
        let record = self
            .call("metadata lookup", self.metadata.get_by_id(file_id))
            .await?
            .ok_or_else(|| GestorError::NotFound("file".to_string()))?;

        let content = self
            .call("object get", async {
                self.objects
                    .get(&record.storage_key)
                    .await
                    .map_err(GestorError::from)
            })
            .await?;

        Ok((record, content))
    }

    async fn call<T, F>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(GestorError::Timeout(format!(
                "{what} exceeded {}ms",
                self.call_timeout.as_millis()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::file::metadata::FileRepository;
    use crate::file::storage::{MemoryStore, StorageError, StorageResult};
    use crate::Database;

    /// Memory store whose writes and deletes can be made to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_put: AtomicBool,
        fail_delete: AtomicBool,
        stall: AtomicBool,
    }

    impl FlakyStore {
        fn injected() -> StorageError {
            StorageError::Io(std::io::Error::other("injected failure"))
        }
    }

    #[async_trait]
    impl ObjectStore for FlakyStore {
        async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
            if self.stall.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            if self.fail_put.load(Ordering::SeqCst) {
                return Err(Self::injected());
            }
            self.inner.put(key, data, content_type).await
        }

        async fn get(&self, key: &str) -> StorageResult<Bytes> {
            self.inner.get(key).await
        }

        async fn delete(&self, key: &str) -> StorageResult<()> {
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(Self::injected());
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
            "flaky"
        }
    }

    /// Record store whose inserts and restores can be made to fail.
    struct FlakyRecords<'a> {
        inner: FileRepository<'a>,
        fail_insert: AtomicBool,
        fail_restore: AtomicBool,
    }

    impl<'a> FlakyRecords<'a> {
        fn new(db: &'a Database) -> Self {
            Self {
                inner: FileRepository::new(db.pool()),
                fail_insert: AtomicBool::new(false),
                fail_restore: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl<'a> FileRecordStore for FlakyRecords<'a> {
        async fn insert(&self, file: &NewFile) -> Result<FileRecord> {
            if self.fail_insert.load(Ordering::SeqCst) {
                return Err(GestorError::Database("injected insert failure".into()));
            }
            self.inner.insert(file).await
        }

        async fn restore(&self, record: &FileRecord) -> Result<()> {
            if self.fail_restore.load(Ordering::SeqCst) {
                return Err(GestorError::Database("injected restore failure".into()));
            }
            self.inner.restore(record).await
        }

        async fn get_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
            self.inner.get_by_id(id).await
        }

        async fn get_by_storage_key(&self, key: &str) -> Result<Option<FileRecord>> {
            self.inner.get_by_storage_key(key).await
        }

        async fn list_by_name(&self, name: &str) -> Result<Vec<FileRecord>> {
            self.inner.list_by_name(name).await
        }

        async fn delete(&self, id: i64) -> Result<bool> {
            self.inner.delete(id).await
        }
    }

    fn report_upload(owner_id: i64) -> Upload {
        Upload {
            content: Bytes::from_static(b"%PDF-1.4 quarterly numbers"),
            file_name: "report".to_string(),
            file_type: ".pdf".to_string(),
            content_type: "application/pdf".to_string(),
            folder_id: 1,
            owner_id,
        }
    }

    /// Seed file 5, owned by user 7, with its object in place.
    async fn seed_file_5(records: &FlakyRecords<'_>, objects: &FlakyStore) -> FileRecord {
        let record = FileRecord {
            id: 5,
            file_name: "report".to_string(),
            file_type: ".pdf".to_string(),
            file_metadata: json!({"size": "0.03kb", "size_bytes": 26}),
            folder_id: 1,
            owner_id: 7,
            storage_key: "report.pdf".to_string(),
            s3_url: objects.object_url("report.pdf"),
            uploaded_at: "2024-03-01 09:30:00".to_string(),
        };
        records.restore(&record).await.unwrap();
        objects
            .put("report.pdf", Bytes::from_static(b"pdf"), "application/pdf")
            .await
            .unwrap();
        record
    }

    #[tokio::test]
    async fn test_upload_success() {
        let db = Database::open_in_memory().await.unwrap();
        let records = FlakyRecords::new(&db);
        let objects = FlakyStore::default();
        let lifecycle = FileLifecycle::new(&records, &objects);

        let record = lifecycle.upload(report_upload(7)).await.unwrap();

        assert_eq!(record.storage_key, "report.pdf");
        assert_eq!(record.owner_id, 7);
        assert_eq!(record.s3_url, "memory:///report.pdf");
        assert_eq!(record.file_metadata["content_type"], "application/pdf");
        assert!(objects.exists(&record.storage_key).await.unwrap());
    }

    #[tokio::test]
    async fn test_upload_with_key_prefix() {
        let db = Database::open_in_memory().await.unwrap();
        let records = FlakyRecords::new(&db);
        let objects = FlakyStore::default();
        let lifecycle =
            FileLifecycle::new(&records, &objects).with_key_prefix(Some("uploads".into()));

        let record = lifecycle.upload(report_upload(7)).await.unwrap();
        assert_eq!(record.storage_key, "uploads/report.pdf");
        assert!(objects.exists("uploads/report.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_upload_object_failure_leaves_no_record() {
        let db = Database::open_in_memory().await.unwrap();
        let records = FlakyRecords::new(&db);
        let objects = FlakyStore::default();
        objects.fail_put.store(true, Ordering::SeqCst);
        let lifecycle = FileLifecycle::new(&records, &objects);

        let err = lifecycle.upload(report_upload(7)).await.unwrap_err();

        assert!(err.is_upstream(), "unexpected error: {err}");
        assert!(records.list_by_name("report").await.unwrap().is_empty());
        assert!(objects.inner.is_empty());
    }

    #[tokio::test]
    async fn test_upload_insert_failure_rolls_back_object() {
        let db = Database::open_in_memory().await.unwrap();
        let records = FlakyRecords::new(&db);
        records.fail_insert.store(true, Ordering::SeqCst);
        let objects = FlakyStore::default();
        let lifecycle = FileLifecycle::new(&records, &objects);

        let err = lifecycle.upload(report_upload(7)).await.unwrap_err();

        assert!(matches!(err, GestorError::Database(_)));
        assert!(!objects.exists("report.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_upload_existing_key_conflicts() {
        let db = Database::open_in_memory().await.unwrap();
        let records = FlakyRecords::new(&db);
        let objects = FlakyStore::default();
        let lifecycle = FileLifecycle::new(&records, &objects);

        let first = lifecycle.upload(report_upload(7)).await.unwrap();
        let mut second = report_upload(8);
        second.content = Bytes::from_static(b"different");
        let err = lifecycle.upload(second).await.unwrap_err();

        assert!(matches!(err, GestorError::Conflict(_)));
        assert_eq!(
            objects.get("report.pdf").await.unwrap(),
            Bytes::from_static(b"%PDF-1.4 quarterly numbers")
        );
        assert_eq!(records.list_by_name("report").await.unwrap(), vec![first]);
    }

    #[tokio::test]
    async fn test_upload_racing_writer_keeps_first_object() {
        let db = Database::open_in_memory().await.unwrap();
        let records = FlakyRecords::new(&db);
        let objects = FlakyStore::default();
        let lifecycle = FileLifecycle::new(&records, &objects);

        // Another upload has written the object but not yet its record.
        objects
            .put("report.pdf", Bytes::from_static(b"winner"), "application/pdf")
            .await
            .unwrap();

        let err = lifecycle.upload(report_upload(8)).await.unwrap_err();

        assert!(matches!(err, GestorError::Conflict(_)), "unexpected error: {err}");
        assert_eq!(
            objects.get("report.pdf").await.unwrap(),
            Bytes::from_static(b"winner")
        );
        assert!(records.list_by_name("report").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_invalid_name_touches_nothing() {
        let db = Database::open_in_memory().await.unwrap();
        let records = FlakyRecords::new(&db);
        let objects = FlakyStore::default();
        let lifecycle = FileLifecycle::new(&records, &objects);

        let mut upload = report_upload(7);
        upload.file_name = "../escape".to_string();
        let err = lifecycle.upload(upload).await.unwrap_err();

        assert!(matches!(err, GestorError::Validation(_)));
        assert!(objects.inner.is_empty());
    }

    #[tokio::test]
    async fn test_upload_timeout_is_upstream_failure() {
        let db = Database::open_in_memory().await.unwrap();
        let records = FlakyRecords::new(&db);
        let objects = FlakyStore::default();
        objects.stall.store(true, Ordering::SeqCst);
        let lifecycle = FileLifecycle::new(&records, &objects)
            .with_call_timeout(Duration::from_millis(50));

        let err = lifecycle.upload(report_upload(7)).await.unwrap_err();

        assert!(matches!(err, GestorError::Timeout(_)));
        assert!(err.is_upstream());
        assert!(records.list_by_name("report").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_owner() {
        let db = Database::open_in_memory().await.unwrap();
        let records = FlakyRecords::new(&db);
        let objects = FlakyStore::default();
        let lifecycle = FileLifecycle::new(&records, &objects);
        let record = seed_file_5(&records, &objects).await;

        let requester = Requester { user_id: 7, is_admin: false };
        let deleted = lifecycle.delete(5, &requester).await.unwrap();

        assert_eq!(deleted, record);
        assert!(records.get_by_id(5).await.unwrap().is_none());
        assert!(!objects.exists("report.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_by_admin() {
        let db = Database::open_in_memory().await.unwrap();
        let records = FlakyRecords::new(&db);
        let objects = FlakyStore::default();
        let lifecycle = FileLifecycle::new(&records, &objects);
        seed_file_5(&records, &objects).await;

        let requester = Requester { user_id: 1, is_admin: true };
        lifecycle.delete(5, &requester).await.unwrap();
        assert!(records.get_by_id(5).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_by_stranger_is_denied() {
        let db = Database::open_in_memory().await.unwrap();
        let records = FlakyRecords::new(&db);
        let objects = FlakyStore::default();
        let lifecycle = FileLifecycle::new(&records, &objects);
        let record = seed_file_5(&records, &objects).await;

        let requester = Requester { user_id: 8, is_admin: false };
        let err = lifecycle.delete(5, &requester).await.unwrap_err();

        assert!(matches!(err, GestorError::Permission(_)));
        assert_eq!(records.get_by_id(5).await.unwrap(), Some(record));
        assert!(objects.exists("report.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_object_failure_restores_record() {
        let db = Database::open_in_memory().await.unwrap();
        let records = FlakyRecords::new(&db);
        let objects = FlakyStore::default();
        let lifecycle = FileLifecycle::new(&records, &objects);
        let snapshot = seed_file_5(&records, &objects).await;
        objects.fail_delete.store(true, Ordering::SeqCst);

        let requester = Requester { user_id: 7, is_admin: false };
        let err = lifecycle.delete(5, &requester).await.unwrap_err();

        assert!(
            matches!(err, GestorError::InvariantRestored { file_id: 5, .. }),
            "unexpected error: {err}"
        );
        assert_eq!(records.get_by_id(5).await.unwrap(), Some(snapshot));
        assert!(objects.exists("report.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_double_failure_is_violation() {
        let db = Database::open_in_memory().await.unwrap();
        let records = FlakyRecords::new(&db);
        let objects = FlakyStore::default();
        let lifecycle = FileLifecycle::new(&records, &objects);
        seed_file_5(&records, &objects).await;
        objects.fail_delete.store(true, Ordering::SeqCst);
        records.fail_restore.store(true, Ordering::SeqCst);

        let requester = Requester { user_id: 7, is_admin: false };
        let err = lifecycle.delete(5, &requester).await.unwrap_err();

        match err {
            GestorError::InvariantViolated {
                file_id,
                cause,
                restore_error,
            } => {
                assert_eq!(file_id, 5);
                assert!(cause.contains("injected failure"));
                assert!(restore_error.contains("injected restore failure"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_delete_missing_file() {
        let db = Database::open_in_memory().await.unwrap();
        let records = FlakyRecords::new(&db);
        let objects = FlakyStore::default();
        let lifecycle = FileLifecycle::new(&records, &objects);

        let requester = Requester { user_id: 7, is_admin: true };
        let err = lifecycle.delete(42, &requester).await.unwrap_err();
        assert!(matches!(err, GestorError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_check_identity() {
        let db = Database::open_in_memory().await.unwrap();
        let records = FlakyRecords::new(&db);
        let objects = FlakyStore::default();
        let lifecycle = FileLifecycle::new(&records, &objects);
        seed_file_5(&records, &objects).await;

        assert_eq!(lifecycle.check_identity(5, "report").await.unwrap().id, 5);
        assert_eq!(lifecycle.check_identity(5, "report.pdf").await.unwrap().id, 5);
        assert!(matches!(
            lifecycle.check_identity(5, "budget.xlsx").await,
            Err(GestorError::Mismatch(_))
        ));
        assert!(matches!(
            lifecycle.check_identity(6, "report").await,
            Err(GestorError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_download() {
        let db = Database::open_in_memory().await.unwrap();
        let records = FlakyRecords::new(&db);
        let objects = FlakyStore::default();
        let lifecycle = FileLifecycle::new(&records, &objects);
        let uploaded = lifecycle.upload(report_upload(7)).await.unwrap();

        let (record, content) = lifecycle.download(uploaded.id).await.unwrap();
        assert_eq!(record, uploaded);
        assert_eq!(content, Bytes::from_static(b"%PDF-1.4 quarterly numbers"));

        assert!(matches!(
            lifecycle.download(999).await,
            Err(GestorError::NotFound(_))
        ));
    }
}
