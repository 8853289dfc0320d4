//! File records and their repository.
//!
//! A [`FileRecord`] is the metadata half of an uploaded file; the bytes live
//! in the object store under `storage_key`.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::{GestorError, Result};

const FILE_COLUMNS: &str = "id, file_name, file_type, file_metadata, folder_id, owner_id, \
                            storage_key, s3_url, uploaded_at";

/// Metadata row for one uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct FileRecord {
    /// Unique file ID.
    pub id: i64,
    /// Display name without extension.
    pub file_name: String,
    /// Extension including the leading dot (may be empty).
    pub file_type: String,
    /// Free-form JSON describing the content.
    #[sqlx(json)]
    pub file_metadata: Value,
    /// Folder the file belongs to.
    pub folder_id: i64,
    /// Owning user.
    pub owner_id: i64,
    /// Object store key.
    pub storage_key: String,
    /// Public URL of the object.
    pub s3_url: String,
    /// Upload time (UTC, `YYYY-MM-DD HH:MM:SS`).
    pub uploaded_at: String,
}

impl FileRecord {
    /// Name as uploaded, e.g. `report.pdf`.
    pub fn full_name(&self) -> String {
        format!("{}{}", self.file_name, self.file_type)
    }
}

/// Data for inserting a file record.
#[derive(Debug, Clone)]
pub struct NewFile {
    /// Display name without extension.
    pub file_name: String,
    /// Extension including the leading dot.
    pub file_type: String,
    /// Content description.
    pub file_metadata: Value,
    /// Folder the file belongs to.
    pub folder_id: i64,
    /// Owning user.
    pub owner_id: i64,
    /// Object store key.
    pub storage_key: String,
    /// Public URL of the object.
    pub s3_url: String,
}

/// Describe uploaded content for the `file_metadata` column.
///
/// ```text
/// {"size": "1.50kb", "size_bytes": 1536, "content_type": "...", "sha256": "..."}
/// ```
pub fn describe_content(data: &[u8], content_type: &str) -> Value {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let digest = hex::encode(hasher.finalize());

    json!({
        "size": format!("{:.2}kb", data.len() as f64 / 1024.0),
        "size_bytes": data.len(),
        "content_type": content_type,
        "sha256": digest,
    })
}

/// Metadata store operations the lifecycle coordinator depends on.
#[async_trait]
pub trait FileRecordStore: Send + Sync {
    /// Insert a new record, returning it with its assigned id.
    async fn insert(&self, file: &NewFile) -> Result<FileRecord>;

    /// Re-insert a previously deleted record with its original id and values.
    async fn restore(&self, record: &FileRecord) -> Result<()>;

    /// Get a record by id.
    async fn get_by_id(&self, id: i64) -> Result<Option<FileRecord>>;

    /// Get the record that owns a storage key.
    async fn get_by_storage_key(&self, key: &str) -> Result<Option<FileRecord>>;

    /// Records whose display name or full name equals `name`.
    async fn list_by_name(&self, name: &str) -> Result<Vec<FileRecord>>;

    /// Delete a record. Returns false if no row was removed.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLite-backed file record repository.
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List all files, newest first.
    pub async fn list_all(&self) -> Result<Vec<FileRecord>> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM files ORDER BY uploaded_at DESC, id DESC");
        sqlx::query_as::<_, FileRecord>(&sql)
            .fetch_all(self.pool)
            .await
            .map_err(|e| GestorError::Database(e.to_string()))
    }

    /// List files owned by a user, newest first.
    pub async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<FileRecord>> {
        let sql = format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE owner_id = ? ORDER BY uploaded_at DESC, id DESC"
        );
        sqlx::query_as::<_, FileRecord>(&sql)
            .bind(owner_id)
            .fetch_all(self.pool)
            .await
            .map_err(|e| GestorError::Database(e.to_string()))
    }

    /// Count files in a folder.
    pub async fn count_by_folder(&self, folder_id: i64) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM files WHERE folder_id = ?")
            .bind(folder_id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| GestorError::Database(e.to_string()))?;
        Ok(count.0)
    }

    /// Count files owned by a user.
    pub async fn count_by_owner(&self, owner_id: i64) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM files WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| GestorError::Database(e.to_string()))?;
        Ok(count.0)
    }
}

#[async_trait]
impl<'a> FileRecordStore for FileRepository<'a> {
    async fn insert(&self, file: &NewFile) -> Result<FileRecord> {
        let result = sqlx::query(
            "INSERT INTO files (file_name, file_type, file_metadata, folder_id, owner_id, storage_key, s3_url)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&file.file_name)
        .bind(&file.file_type)
        .bind(Json(&file.file_metadata))
        .bind(file.folder_id)
        .bind(file.owner_id)
        .bind(&file.storage_key)
        .bind(&file.s3_url)
        .execute(self.pool)
        .await
        .map_err(|e| GestorError::Database(e.to_string()))?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| GestorError::NotFound("file".to_string()))
    }

    async fn restore(&self, record: &FileRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO files (id, file_name, file_type, file_metadata, folder_id, owner_id, storage_key, s3_url, uploaded_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id)
        .bind(&record.file_name)
        .bind(&record.file_type)
        .bind(Json(&record.file_metadata))
        .bind(record.folder_id)
        .bind(record.owner_id)
        .bind(&record.storage_key)
        .bind(&record.s3_url)
        .bind(&record.uploaded_at)
        .execute(self.pool)
        .await
        .map_err(|e| GestorError::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?");
        sqlx::query_as::<_, FileRecord>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| GestorError::Database(e.to_string()))
    }

    async fn get_by_storage_key(&self, key: &str) -> Result<Option<FileRecord>> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE storage_key = ?");
        sqlx::query_as::<_, FileRecord>(&sql)
            .bind(key)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| GestorError::Database(e.to_string()))
    }

    async fn list_by_name(&self, name: &str) -> Result<Vec<FileRecord>> {
        let sql = format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE file_name = ? OR file_name || file_type = ?
             ORDER BY id"
        );
        sqlx::query_as::<_, FileRecord>(&sql)
            .bind(name)
            .bind(name)
            .fetch_all(self.pool)
            .await
            .map_err(|e| GestorError::Database(e.to_string()))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| GestorError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }
}
