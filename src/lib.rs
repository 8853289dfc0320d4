//! gestor - file-sharing backend
//!
//! Keeps file records in a relational store and file contents in an object
//! store (S3 or compatible) consistent with each other, and serves both
//! through a JSON HTTP API.

pub mod auth;
pub mod client;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use auth::{hash_password, validate_password, verify_password, PasswordError};
pub use client::{ApiClient, ClientError};
pub use config::Config;
pub use db::{Database, NewRole, NewUser, Role, RoleRepository, User, UserRepository, UserUpdate};
pub use error::{GestorError, Result};
pub use file::{FileLifecycle, FileRecord, FileService, ObjectStore};
pub use web::{AppState, WebServer};
