//! Folder handlers for Web API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::db::{RoleRepository, UserRepository};
use crate::file::{FileRepository, FolderRepository, NewFolder};
use crate::web::dto::{ApiResponse, CreateFolderRequest, FolderResponse, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// GET /folders/get-folders - List all folders.
#[utoipa::path(
    get,
    path = "/folders/get-folders",
    tag = "folders",
    responses(
        (status = 200, description = "All folders", body = Vec<FolderResponse>)
    )
)]
pub async fn list_folders(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<FolderResponse>>>, ApiError> {
    let folders = FolderRepository::new(state.db.pool()).list_all().await?;
    let file_repo = FileRepository::new(state.db.pool());

    let mut responses = Vec::with_capacity(folders.len());
    for folder in folders {
        let file_count = file_repo.count_by_folder(folder.id).await?;
        responses.push(FolderResponse::new(folder, file_count));
    }

    Ok(Json(ApiResponse::new(responses)))
}

/// GET /folders/get-folder-id/:folder_id - Get a folder by ID.
#[utoipa::path(
    get,
    path = "/folders/get-folder-id/{folder_id}",
    tag = "folders",
    params(
        ("folder_id" = i64, Path, description = "Folder ID")
    ),
    responses(
        (status = 200, description = "Folder", body = FolderResponse),
        (status = 404, description = "Folder not found")
    )
)]
pub async fn get_folder(
    State(state): State<Arc<AppState>>,
    Path(folder_id): Path<i64>,
) -> Result<Json<ApiResponse<FolderResponse>>, ApiError> {
    let folder = FolderRepository::new(state.db.pool())
        .get_by_id(folder_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Folder not found"))?;
    let file_count = FileRepository::new(state.db.pool())
        .count_by_folder(folder_id)
        .await?;

    Ok(Json(ApiResponse::new(FolderResponse::new(folder, file_count))))
}

/// POST /folders/create-folder - Create a folder.
///
/// The acting user's role must allow creating folders.
#[utoipa::path(
    post,
    path = "/folders/create-folder",
    tag = "folders",
    request_body = CreateFolderRequest,
    responses(
        (status = 201, description = "Folder created", body = FolderResponse),
        (status = 403, description = "User's role cannot create folders"),
        (status = 404, description = "User or parent folder not found"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateFolderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FolderResponse>>), ApiError> {
    let user = UserRepository::new(state.db.pool())
        .get_by_id(req.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let can_create = RoleRepository::new(state.db.pool())
        .get_by_id(user.role_id)
        .await?
        .is_some_and(|role| role.can_create_folders);
    if !can_create {
        return Err(ApiError::forbidden("Role cannot create folders"));
    }

    let mut new_folder = NewFolder::new(req.folder_name);
    if let Some(parent_id) = req.parent_folder_id {
        new_folder = new_folder.with_parent(parent_id);
    }
    let folder = FolderRepository::new(state.db.pool())
        .create(&new_folder)
        .await?;

    tracing::info!(folder_id = folder.id, user_id = user.id, "Folder created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(FolderResponse::new(folder, 0))),
    ))
}
