//! Role model for gestor.

use serde::Serialize;

/// A role grants capabilities to the users assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Role {
    /// Unique role ID.
    pub id: i64,
    /// Role name (unique).
    pub role_name: String,
    /// Free-form description.
    pub role_description: String,
    /// Users with this role may upload files.
    pub can_create_files: bool,
    /// Users with this role may create folders.
    pub can_create_folders: bool,
    /// Users with this role may delete any file.
    pub is_admin: bool,
}

/// Data for creating a new role.
#[derive(Debug, Clone)]
pub struct NewRole {
    /// Role name.
    pub role_name: String,
    /// Free-form description.
    pub role_description: String,
    /// Upload capability.
    pub can_create_files: bool,
    /// Folder creation capability.
    pub can_create_folders: bool,
    /// Administrative capability.
    pub is_admin: bool,
}

impl NewRole {
    /// Create a role with no capabilities.
    pub fn new(role_name: impl Into<String>, role_description: impl Into<String>) -> Self {
        Self {
            role_name: role_name.into(),
            role_description: role_description.into(),
            can_create_files: false,
            can_create_folders: false,
            is_admin: false,
        }
    }

    /// Allow uploads.
    pub fn with_create_files(mut self, allowed: bool) -> Self {
        self.can_create_files = allowed;
        self
    }

    /// Allow folder creation.
    pub fn with_create_folders(mut self, allowed: bool) -> Self {
        self.can_create_folders = allowed;
        self
    }

    /// Mark the role as administrative.
    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }
}

/// Data for updating an existing role.
#[derive(Debug, Clone, Default)]
pub struct RoleUpdate {
    /// New name.
    pub role_name: Option<String>,
    /// New description.
    pub role_description: Option<String>,
    /// New upload capability.
    pub can_create_files: Option<bool>,
    /// New folder capability.
    pub can_create_folders: Option<bool>,
    /// New administrative flag.
    pub is_admin: Option<bool>,
}

impl RoleUpdate {
    /// Check if any fields are set.
    pub fn is_empty(&self) -> bool {
        self.role_name.is_none()
            && self.role_description.is_none()
            && self.can_create_files.is_none()
            && self.can_create_folders.is_none()
            && self.is_admin.is_none()
    }
}
