//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Json, Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use utoipa::OpenApi;

use super::dto::{
    CreateFolderRequest, CreateRoleRequest, CreateUserRequest, FileResponse, FolderResponse,
    RoleResponse, ServiceInfo, UpdateRoleRequest, UpdateUserRequest, UserResponse,
    VerifyCredentialsRequest,
};
use super::handlers::{self, AppState};
use super::middleware::create_cors_layer;

/// Headroom on top of the file size limit for multipart framing.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// OpenAPI document for the HTTP API.
#[derive(OpenApi)]
#[openapi(
    info(title = "gestor", description = "File-sharing API over a metadata store and an object store"),
    paths(
        handlers::index,
        handlers::file::list_files,
        handlers::file::list_files_by_owner,
        handlers::file::list_files_by_name,
        handlers::file::get_file,
        handlers::file::download_file,
        handlers::file::upload_file,
        handlers::file::delete_file,
        handlers::user::list_users,
        handlers::user::get_user,
        handlers::user::get_user_by_username,
        handlers::user::create_user,
        handlers::user::update_user,
        handlers::user::delete_user,
        handlers::user::verify_credentials,
        handlers::role::list_roles,
        handlers::role::get_role,
        handlers::role::get_role_by_name,
        handlers::role::create_role,
        handlers::role::update_role,
        handlers::role::delete_role,
        handlers::folder::list_folders,
        handlers::folder::get_folder,
        handlers::folder::create_folder,
    ),
    components(schemas(
        ServiceInfo,
        FileResponse,
        UserResponse,
        RoleResponse,
        FolderResponse,
        CreateUserRequest,
        UpdateUserRequest,
        VerifyCredentialsRequest,
        CreateRoleRequest,
        UpdateRoleRequest,
        CreateFolderRequest,
    )),
    tags(
        (name = "files", description = "File upload, download and deletion"),
        (name = "users", description = "User management"),
        (name = "roles", description = "Role management"),
        (name = "folders", description = "Folder management"),
        (name = "misc", description = "Service information")
    )
)]
pub struct ApiDoc;

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let body_limit = usize::try_from(app_state.files.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    let file_routes = Router::new()
        .route("/get-files", get(handlers::list_files))
        .route("/get-files-user-id/:user_id", get(handlers::list_files_by_owner))
        .route("/get-file-name/:file_name", get(handlers::list_files_by_name))
        .route("/get-file-id/:file_id", get(handlers::get_file))
        .route("/download-file/:file_id", get(handlers::download_file))
        .route(
            "/upload-register-file",
            post(handlers::upload_file).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/delete-file/:file_id/:file_name/:user_id",
            delete(handlers::delete_file),
        );

    let user_routes = Router::new()
        .route("/get-users", get(handlers::list_users))
        .route("/get-user-id/:user_id", get(handlers::get_user))
        .route("/get-user-username/:username", get(handlers::get_user_by_username))
        .route("/create-user", post(handlers::create_user))
        .route("/update-user/:user_id", patch(handlers::update_user))
        .route("/delete-user/:user_id", delete(handlers::delete_user))
        .route("/verify-credentials", post(handlers::verify_credentials));

    let role_routes = Router::new()
        .route("/get-roles", get(handlers::list_roles))
        .route("/get-role-id/:role_id", get(handlers::get_role))
        .route("/get-role-name/:role_name", get(handlers::get_role_by_name))
        .route("/create-role", post(handlers::create_role))
        .route("/update-role/:role_id", patch(handlers::update_role))
        .route("/delete-role/:role_id", delete(handlers::delete_role));

    let folder_routes = Router::new()
        .route("/get-folders", get(handlers::list_folders))
        .route("/get-folder-id/:folder_id", get(handlers::get_folder))
        .route("/create-folder", post(handlers::create_folder));

    Router::new()
        .route("/", get(handlers::index))
        .nest("/files", file_routes)
        .nest("/users", user_routes)
        .nest("/roles", role_routes)
        .nest("/folders", folder_routes)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(create_cors_layer(cors_origins)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Create the router serving the OpenAPI document.
pub fn create_openapi_router() -> Router {
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
