//! User model for gestor.

use serde::Serialize;

/// User entity representing a registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Full display name.
    pub full_name: String,
    /// Login username (unique, case-insensitive).
    pub username: String,
    /// Password hash (Argon2).
    #[serde(skip_serializing)]
    pub password: String,
    /// Role assigned to this user.
    pub role_id: i64,
    /// Account creation timestamp.
    pub created_at: String,
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Full display name.
    pub full_name: String,
    /// Login username.
    pub username: String,
    /// Password hash (should be pre-hashed with Argon2).
    pub password: String,
    /// Role assigned to the user.
    pub role_id: i64,
}

impl NewUser {
    /// Create a new user record.
    pub fn new(
        full_name: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        role_id: i64,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            username: username.into(),
            password: password.into(),
            role_id,
        }
    }
}

/// Data for updating an existing user.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    /// New full name.
    pub full_name: Option<String>,
    /// New username.
    pub username: Option<String>,
    /// New password hash.
    pub password: Option<String>,
    /// New role.
    pub role_id: Option<i64>,
}

impl UserUpdate {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the full name.
    pub fn full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    /// Set the username.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password hash.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the role.
    pub fn role_id(mut self, role_id: i64) -> Self {
        self.role_id = Some(role_id);
        self
    }

    /// Check if any fields are set.
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.username.is_none()
            && self.password.is_none()
            && self.role_id.is_none()
    }
}
