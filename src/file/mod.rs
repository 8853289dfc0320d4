//! File management module for gestor.
//!
//! This module keeps uploaded files consistent across two stores:
//! - File records in the database
//! - File bytes in an object store (S3, local directory or memory)
//!
//! [`FileLifecycle`] orders every write and delete across the two;
//! [`FileService`] adds the user, role and folder checks around it.

mod folder;
mod key;
mod lifecycle;
mod metadata;
mod s3;
mod service;
mod storage;

pub use folder::{Folder, FolderRepository, NewFolder, MAX_FOLDER_NAME_LENGTH};
pub use key::{create_s3_url, split_file_name, storage_key, validate_file_name, MAX_FILENAME_LENGTH};
pub use lifecycle::{FileLifecycle, Requester, Upload, DEFAULT_CALL_TIMEOUT};
pub use metadata::{describe_content, FileRecord, FileRecordStore, FileRepository, NewFile};
pub use s3::S3Store;
pub use service::{FileService, FileSettings, UploadRequest, DEFAULT_MAX_FILE_SIZE};
pub use storage::{
    build_object_store, FilesystemStore, MemoryStore, ObjectStore, StorageError, StorageResult,
};
