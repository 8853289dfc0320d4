//! Response DTOs for Web API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::datetime::to_rfc3339;
use crate::db::{Role, User};
use crate::file::{FileRecord, Folder};

// ============================================================================
// Generic Response Wrappers
// ============================================================================

/// Generic API response wrapper.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Response data.
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Service banner returned by `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// Service name.
    pub name: String,
    /// Crate version.
    pub version: String,
    /// Object store backend in use.
    pub storage: String,
}

// ============================================================================
// File DTOs
// ============================================================================

/// File record response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileResponse {
    /// File ID.
    pub id: i64,
    /// Display name without extension.
    pub file_name: String,
    /// Extension including the leading dot.
    pub file_type: String,
    /// Size, content type and checksum of the content.
    #[schema(value_type = Object)]
    pub file_metadata: serde_json::Value,
    /// Folder ID.
    pub folder_id: i64,
    /// Owning user ID.
    pub owner_id: i64,
    /// Object store key.
    pub storage_key: String,
    /// Public object URL.
    pub s3_url: String,
    /// Upload timestamp (RFC3339).
    pub uploaded_at: String,
}

impl From<FileRecord> for FileResponse {
    fn from(file: FileRecord) -> Self {
        Self {
            id: file.id,
            file_name: file.file_name,
            file_type: file.file_type,
            file_metadata: file.file_metadata,
            folder_id: file.folder_id,
            owner_id: file.owner_id,
            storage_key: file.storage_key,
            s3_url: file.s3_url,
            uploaded_at: to_rfc3339(&file.uploaded_at),
        }
    }
}

// ============================================================================
// User DTOs
// ============================================================================

/// User response. The password hash is never included.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    /// User ID.
    pub id: i64,
    /// Full name.
    pub full_name: String,
    /// Login name.
    pub username: String,
    /// Role ID.
    pub role_id: i64,
    /// Creation timestamp (RFC3339).
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            username: user.username,
            role_id: user.role_id,
            created_at: to_rfc3339(&user.created_at),
        }
    }
}

// ============================================================================
// Role DTOs
// ============================================================================

/// Role response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleResponse {
    /// Role ID.
    pub id: i64,
    /// Role name.
    pub role_name: String,
    /// Description.
    pub role_description: String,
    /// Upload capability.
    pub can_create_files: bool,
    /// Folder creation capability.
    pub can_create_folders: bool,
    /// Administrative capability.
    pub is_admin: bool,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        Self {
            id: role.id,
            role_name: role.role_name,
            role_description: role.role_description,
            can_create_files: role.can_create_files,
            can_create_folders: role.can_create_folders,
            is_admin: role.is_admin,
        }
    }
}

// ============================================================================
// Folder DTOs
// ============================================================================

/// Folder response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FolderResponse {
    /// Folder ID.
    pub id: i64,
    /// Folder name.
    pub folder_name: String,
    /// Parent folder ID.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_folder_id: Option<i64>,
    /// Number of files in the folder.
    pub file_count: i64,
    /// Creation timestamp (RFC3339).
    pub created_at: String,
    /// Last modification timestamp (RFC3339).
    pub updated_at: String,
}

impl FolderResponse {
    /// Build a response from a folder and its file count.
    pub fn new(folder: Folder, file_count: i64) -> Self {
        Self {
            id: folder.id,
            folder_name: folder.folder_name,
            parent_folder_id: folder.parent_folder_id,
            file_count,
            created_at: to_rfc3339(&folder.created_at),
            updated_at: to_rfc3339(&folder.updated_at),
        }
    }
}
