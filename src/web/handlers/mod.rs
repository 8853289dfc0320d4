//! API handlers.

pub mod file;
pub mod folder;
pub mod role;
pub mod user;

pub use file::*;
pub use folder::*;
pub use role::*;
pub use user::*;

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::file::{FileService, FileSettings, ObjectStore};
use crate::Database;

use super::dto::{ApiResponse, ServiceInfo};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Metadata store.
    pub db: Arc<Database>,
    /// Object store holding file contents.
    pub objects: Arc<dyn ObjectStore>,
    /// Upload limits and per-call timeout.
    pub files: FileSettings,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Arc<Database>, objects: Arc<dyn ObjectStore>) -> Self {
        Self {
            db,
            objects,
            files: FileSettings::default(),
        }
    }

    /// Override the file settings.
    pub fn with_file_settings(mut self, files: FileSettings) -> Self {
        self.files = files;
        self
    }

    /// File service bound to this state's stores.
    pub fn file_service(&self) -> FileService<'_> {
        FileService::new(&self.db, self.objects.as_ref(), &self.files)
    }
}

/// GET / - Service banner.
#[utoipa::path(
    get,
    path = "/",
    tag = "misc",
    responses(
        (status = 200, description = "Service name, version and storage backend", body = ServiceInfo)
    )
)]
pub async fn index(State(state): State<Arc<AppState>>) -> Json<ApiResponse<ServiceInfo>> {
    Json(ApiResponse::new(ServiceInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: state.objects.backend_name().to_string(),
    }))
}
