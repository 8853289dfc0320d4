//! Folder types and repository.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::{GestorError, Result};

/// Maximum length of a folder name (in characters).
pub const MAX_FOLDER_NAME_LENGTH: usize = 100;

/// A folder files are filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Folder {
    /// Unique folder ID.
    pub id: i64,
    /// Folder name.
    pub folder_name: String,
    /// Parent folder ID (None for root folders).
    pub parent_folder_id: Option<i64>,
    /// When the folder was created.
    pub created_at: String,
    /// When the folder was last modified.
    pub updated_at: String,
}

/// Data for creating a new folder.
#[derive(Debug, Clone)]
pub struct NewFolder {
    /// Folder name.
    pub folder_name: String,
    /// Parent folder ID (None for root folders).
    pub parent_folder_id: Option<i64>,
}

impl NewFolder {
    /// Create a root folder.
    pub fn new(folder_name: impl Into<String>) -> Self {
        Self {
            folder_name: folder_name.into(),
            parent_folder_id: None,
        }
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_folder_id = Some(parent_id);
        self
    }
}

/// Repository for folder operations.
pub struct FolderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FolderRepository<'a> {
    /// Create a new FolderRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new folder.
    ///
    /// The parent, when given, must exist.
    pub async fn create(&self, folder: &NewFolder) -> Result<Folder> {
        let name = folder.folder_name.trim();
        if name.is_empty() {
            return Err(GestorError::Validation("folder name must not be empty".into()));
        }
        if name.chars().count() > MAX_FOLDER_NAME_LENGTH {
            return Err(GestorError::Validation(format!(
                "folder name exceeds {MAX_FOLDER_NAME_LENGTH} characters"
            )));
        }
        if let Some(parent_id) = folder.parent_folder_id {
            if self.get_by_id(parent_id).await?.is_none() {
                return Err(GestorError::NotFound("parent folder".to_string()));
            }
        }

        let result =
            sqlx::query("INSERT INTO folders (folder_name, parent_folder_id) VALUES (?, ?)")
                .bind(name)
                .bind(folder.parent_folder_id)
                .execute(self.pool)
                .await
                .map_err(|e| GestorError::Database(e.to_string()))?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| GestorError::NotFound("folder".to_string()))
    }

    /// Get a folder by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT id, folder_name, parent_folder_id, created_at, updated_at
             FROM folders WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| GestorError::Database(e.to_string()))
    }

    /// List all folders ordered by ID.
    pub async fn list_all(&self) -> Result<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT id, folder_name, parent_folder_id, created_at, updated_at
             FROM folders ORDER BY id",
        )
        .fetch_all(self.pool)
        .await
        .map_err(|e| GestorError::Database(e.to_string()))
    }
}
