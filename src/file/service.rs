//! File service for gestor.
//!
//! This module provides the file operations behind the HTTP API:
//! - Upload with owner, folder, role and size checks
//! - Download and listing
//! - Deletion on behalf of a user, with identity checks

use std::time::Duration;

use bytes::Bytes;

use crate::config::StorageConfig;
use crate::db::{Database, RoleRepository, UserRepository};
use crate::{GestorError, Result};

use super::folder::FolderRepository;
use super::key::{split_file_name, validate_file_name};
use super::lifecycle::{FileLifecycle, Requester, Upload, DEFAULT_CALL_TIMEOUT};
use super::metadata::{FileRecord, FileRecordStore, FileRepository};
use super::storage::ObjectStore;

/// Default maximum upload size (50MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Tunables shared by every file operation.
#[derive(Debug, Clone)]
pub struct FileSettings {
    /// Prefix for derived storage keys.
    pub key_prefix: Option<String>,
    /// Timeout applied to each store call.
    pub call_timeout: Duration,
    /// Largest accepted upload, in bytes.
    pub max_file_size: u64,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            key_prefix: None,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl FileSettings {
    /// Derive settings from the storage configuration.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            key_prefix: config.prefix.clone().filter(|p| !p.is_empty()),
            call_timeout: Duration::from_secs(config.call_timeout_secs),
            max_file_size: config.max_upload_size_mb * 1024 * 1024,
        }
    }
}

/// Request data for file upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Original filename, e.g. `report.pdf`.
    pub filename: String,
    /// File content.
    pub content: Bytes,
    /// Declared content type. Guessed from the filename when absent.
    pub content_type: Option<String>,
    /// Folder to upload to.
    pub folder_id: i64,
    /// Owning user.
    pub owner_id: i64,
}

/// File service for managing uploads, downloads and deletions.
pub struct FileService<'a> {
    db: &'a Database,
    objects: &'a dyn ObjectStore,
    settings: &'a FileSettings,
}

impl<'a> FileService<'a> {
    /// Create a new FileService.
    pub fn new(db: &'a Database, objects: &'a dyn ObjectStore, settings: &'a FileSettings) -> Self {
        Self {
            db,
            objects,
            settings,
        }
    }

    fn records(&self) -> FileRepository<'a> {
        FileRepository::new(self.db.pool())
    }

    fn lifecycle<'s, M: FileRecordStore>(
        &'s self,
        records: &'s M,
    ) -> FileLifecycle<'s, M, dyn ObjectStore> {
        FileLifecycle::new(records, self.objects)
            .with_key_prefix(self.settings.key_prefix.clone())
            .with_call_timeout(self.settings.call_timeout)
    }

    /// Upload a file.
    ///
    /// The owner and folder must exist and the owner's role must allow
    /// creating files.
    pub async fn upload(&self, request: UploadRequest) -> Result<FileRecord> {
        if request.content.len() as u64 > self.settings.max_file_size {
            let max_mb = self.settings.max_file_size / 1024 / 1024;
            return Err(GestorError::Validation(format!(
                "file is too large (max {max_mb}MB)"
            )));
        }
        validate_file_name(&request.filename)?;

        let owner = UserRepository::new(self.db.pool())
            .get_by_id(request.owner_id)
            .await?
            .ok_or_else(|| GestorError::NotFound("user".to_string()))?;

        FolderRepository::new(self.db.pool())
            .get_by_id(request.folder_id)
            .await?
            .ok_or_else(|| GestorError::NotFound("folder".to_string()))?;

        let role = RoleRepository::new(self.db.pool())
            .get_by_id(owner.role_id)
            .await?
            .ok_or_else(|| GestorError::NotFound("role".to_string()))?;
        if !role.can_create_files {
            return Err(GestorError::Permission(format!(
                "role {} cannot upload files",
                role.role_name
            )));
        }

        let content_type = request.content_type.filter(|c| !c.is_empty()).unwrap_or_else(|| {
            mime_guess::from_path(&request.filename)
                .first_or_octet_stream()
                .to_string()
        });
        let (file_name, file_type) = split_file_name(&request.filename);

        let records = self.records();
        self.lifecycle(&records)
            .upload(Upload {
                content: request.content,
                file_name,
                file_type,
                content_type,
                folder_id: request.folder_id,
                owner_id: owner.id,
            })
            .await
    }

    /// Download a file's record and content.
    pub async fn download(&self, file_id: i64) -> Result<(FileRecord, Bytes)> {
        let records = self.records();
        self.lifecycle(&records).download(file_id).await
    }

    /// Delete a file on behalf of `user_id`.
    ///
    /// `file_name` must name the file with `file_id`, either as display name
    /// or with its extension.
    pub async fn delete(&self, file_id: i64, file_name: &str, user_id: i64) -> Result<FileRecord> {
        let requester = self.requester(user_id).await?;
        let records = self.records();
        let lifecycle = self.lifecycle(&records);

        lifecycle.check_identity(file_id, file_name).await?;
        lifecycle.delete(file_id, &requester).await
    }

    async fn requester(&self, user_id: i64) -> Result<Requester> {
        let user = UserRepository::new(self.db.pool())
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| GestorError::NotFound("user".to_string()))?;
        let is_admin = RoleRepository::new(self.db.pool())
            .get_by_id(user.role_id)
            .await?
            .is_some_and(|role| role.is_admin);

        Ok(Requester {
            user_id: user.id,
            is_admin,
        })
    }

    /// Get a file record by ID.
    pub async fn get_file(&self, file_id: i64) -> Result<FileRecord> {
        self.records()
            .get_by_id(file_id)
            .await?
            .ok_or_else(|| GestorError::NotFound("file".to_string()))
    }

    /// List every file.
    pub async fn list_files(&self) -> Result<Vec<FileRecord>> {
        self.records().list_all().await
    }

    /// List files owned by a user.
    pub async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<FileRecord>> {
        self.records().list_by_owner(owner_id).await
    }

    /// List files matching a display or full name.
    pub async fn list_by_name(&self, name: &str) -> Result<Vec<FileRecord>> {
        self.records().list_by_name(name).await
    }
}
