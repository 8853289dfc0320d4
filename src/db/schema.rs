//! Database schema and migrations for gestor.
//!
//! Migrations are applied in order when the database is first opened or
//! upgraded. The schema_version table tracks which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: Roles and users
    r#"
CREATE TABLE roles (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    role_name           TEXT NOT NULL UNIQUE,
    role_description    TEXT NOT NULL DEFAULT '',
    can_create_files    INTEGER NOT NULL DEFAULT 0,
    can_create_folders  INTEGER NOT NULL DEFAULT 0,
    is_admin            INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name   TEXT NOT NULL,
    username    TEXT NOT NULL,
    password    TEXT NOT NULL,           -- Argon2 hash
    role_id     INTEGER NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE UNIQUE INDEX idx_users_username_nocase ON users(username COLLATE NOCASE);
CREATE INDEX idx_users_role_id ON users(role_id);
"#,
    // v2: Folders and file records
    r#"
CREATE TABLE folders (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    folder_name       TEXT NOT NULL,
    parent_folder_id  INTEGER,
    created_at        TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at        TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_folders_parent ON folders(parent_folder_id);

-- One row per uploaded object. storage_key addresses the blob in the object store.
CREATE TABLE files (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    file_name      TEXT NOT NULL,
    file_type      TEXT NOT NULL DEFAULT '',
    file_metadata  TEXT NOT NULL DEFAULT '{}',
    folder_id      INTEGER NOT NULL,
    owner_id       INTEGER NOT NULL,
    storage_key    TEXT NOT NULL,
    s3_url         TEXT NOT NULL,
    uploaded_at    TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE UNIQUE INDEX idx_files_storage_key ON files(storage_key);
CREATE INDEX idx_files_owner ON files(owner_id);
CREATE INDEX idx_files_name ON files(file_name);
"#,
    // v3: Default roles
    r#"
INSERT INTO roles (role_name, role_description, can_create_files, can_create_folders, is_admin)
VALUES ('admin', 'Full access to every file and folder', 1, 1, 1);

INSERT INTO roles (role_name, role_description, can_create_files, can_create_folders, is_admin)
VALUES ('user', 'Uploads and manages own files', 1, 0, 0);
"#,
];
