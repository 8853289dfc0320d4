//! Role repository for gestor.

use sqlx::{QueryBuilder, SqlitePool};

use super::role::{NewRole, Role, RoleUpdate};
use crate::{GestorError, Result};

const ROLE_COLUMNS: &str =
    "id, role_name, role_description, can_create_files, can_create_folders, is_admin";

/// Repository for role CRUD operations.
pub struct RoleRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> RoleRepository<'a> {
    /// Create a new RoleRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new role.
    pub async fn create(&self, role: &NewRole) -> Result<Role> {
        let result = sqlx::query(
            "INSERT INTO roles (role_name, role_description, can_create_files, can_create_folders, is_admin)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&role.role_name)
        .bind(&role.role_description)
        .bind(role.can_create_files)
        .bind(role.can_create_folders)
        .bind(role.is_admin)
        .execute(self.pool)
        .await
        .map_err(|e| GestorError::Database(e.to_string()))?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| GestorError::NotFound("role".to_string()))
    }

    /// Get a role by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Role>> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = ?");
        sqlx::query_as::<_, Role>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| GestorError::Database(e.to_string()))
    }

    /// Get a role by name.
    pub async fn get_by_name(&self, role_name: &str) -> Result<Option<Role>> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles WHERE role_name = ?");
        sqlx::query_as::<_, Role>(&sql)
            .bind(role_name)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| GestorError::Database(e.to_string()))
    }

    /// List all roles ordered by ID.
    pub async fn list_all(&self) -> Result<Vec<Role>> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles ORDER BY id");
        sqlx::query_as::<_, Role>(&sql)
            .fetch_all(self.pool)
            .await
            .map_err(|e| GestorError::Database(e.to_string()))
    }

    /// Update a role by ID.
    ///
    /// Returns the updated role, or None if not found.
    pub async fn update(&self, id: i64, update: &RoleUpdate) -> Result<Option<Role>> {
        if update.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE roles SET ");
        let mut separated = query.separated(", ");

        if let Some(ref role_name) = update.role_name {
            separated.push("role_name = ");
            separated.push_bind_unseparated(role_name);
        }
        if let Some(ref role_description) = update.role_description {
            separated.push("role_description = ");
            separated.push_bind_unseparated(role_description);
        }
        if let Some(can_create_files) = update.can_create_files {
            separated.push("can_create_files = ");
            separated.push_bind_unseparated(can_create_files);
        }
        if let Some(can_create_folders) = update.can_create_folders {
            separated.push("can_create_folders = ");
            separated.push_bind_unseparated(can_create_folders);
        }
        if let Some(is_admin) = update.is_admin {
            separated.push("is_admin = ");
            separated.push_bind_unseparated(is_admin);
        }

        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query
            .build()
            .execute(self.pool)
            .await
            .map_err(|e| GestorError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    /// Delete a role by ID.
    ///
    /// Returns true if a role was deleted, false if not found.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM roles WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| GestorError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }
}
