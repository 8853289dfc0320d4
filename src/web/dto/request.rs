//! Request DTOs for Web API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::validation::{no_control_chars, valid_folder_name, valid_name};

/// User creation request.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    /// Full name.
    #[validate(
        length(min = 1, max = 100, message = "Must be 1-100 characters"),
        custom(function = "valid_name")
    )]
    pub full_name: String,
    /// Login name (unique, case-insensitive).
    #[validate(
        length(min = 3, max = 50, message = "Must be 3-50 characters"),
        custom(function = "no_control_chars")
    )]
    pub username: String,
    /// Plain-text password; stored hashed.
    #[validate(length(min = 8, max = 128, message = "Must be 8-128 characters"))]
    pub password: String,
    /// Role assigned to the user.
    pub role_id: i64,
}

/// User update request. Absent fields are left unchanged.
#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    /// New full name.
    #[serde(default)]
    #[validate(
        length(min = 1, max = 100, message = "Must be 1-100 characters"),
        custom(function = "valid_name")
    )]
    pub full_name: Option<String>,
    /// New login name.
    #[serde(default)]
    #[validate(
        length(min = 3, max = 50, message = "Must be 3-50 characters"),
        custom(function = "no_control_chars")
    )]
    pub username: Option<String>,
    /// New password; re-hashed before storing.
    #[serde(default)]
    #[validate(length(min = 8, max = 128, message = "Must be 8-128 characters"))]
    pub password: Option<String>,
    /// New role.
    #[serde(default)]
    pub role_id: Option<i64>,
}

/// Credential check request.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct VerifyCredentialsRequest {
    /// Login name.
    #[validate(length(min = 1, message = "Must not be empty"))]
    pub username: String,
    /// Plain-text password.
    #[validate(length(min = 1, message = "Must not be empty"))]
    pub password: String,
}

/// Role creation request.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateRoleRequest {
    /// Role name (unique).
    #[validate(
        length(min = 1, max = 50, message = "Must be 1-50 characters"),
        custom(function = "valid_name")
    )]
    pub role_name: String,
    /// Free-form description.
    #[serde(default)]
    #[validate(length(max = 500, message = "Must be at most 500 characters"))]
    pub role_description: String,
    /// Upload capability.
    #[serde(default)]
    pub can_create_files: bool,
    /// Folder creation capability.
    #[serde(default)]
    pub can_create_folders: bool,
    /// Administrative capability.
    #[serde(default)]
    pub is_admin: bool,
}

/// Role update request. Absent fields are left unchanged.
#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateRoleRequest {
    /// New name.
    #[serde(default)]
    #[validate(
        length(min = 1, max = 50, message = "Must be 1-50 characters"),
        custom(function = "valid_name")
    )]
    pub role_name: Option<String>,
    /// New description.
    #[serde(default)]
    #[validate(length(max = 500, message = "Must be at most 500 characters"))]
    pub role_description: Option<String>,
    /// New upload capability.
    #[serde(default)]
    pub can_create_files: Option<bool>,
    /// New folder capability.
    #[serde(default)]
    pub can_create_folders: Option<bool>,
    /// New administrative flag.
    #[serde(default)]
    pub is_admin: Option<bool>,
}

/// Folder creation request.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateFolderRequest {
    /// Folder name.
    #[validate(
        length(min = 1, max = 100, message = "Must be 1-100 characters"),
        custom(function = "valid_folder_name")
    )]
    pub folder_name: String,
    /// Parent folder (None for a root folder).
    #[serde(default)]
    pub parent_folder_id: Option<i64>,
    /// User creating the folder; their role must allow it.
    pub user_id: i64,
}
