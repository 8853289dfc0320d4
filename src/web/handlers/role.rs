//! Role handlers for Web API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::db::{NewRole, RoleRepository, RoleUpdate, UserRepository};
use crate::web::dto::{
    ApiResponse, CreateRoleRequest, RoleResponse, UpdateRoleRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// GET /roles/get-roles - List all roles.
#[utoipa::path(
    get,
    path = "/roles/get-roles",
    tag = "roles",
    responses(
        (status = 200, description = "All roles", body = Vec<RoleResponse>)
    )
)]
pub async fn list_roles(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<RoleResponse>>>, ApiError> {
    let roles = RoleRepository::new(state.db.pool()).list_all().await?;
    Ok(Json(ApiResponse::new(
        roles.into_iter().map(RoleResponse::from).collect(),
    )))
}

/// GET /roles/get-role-id/:role_id - Get a role by ID.
#[utoipa::path(
    get,
    path = "/roles/get-role-id/{role_id}",
    tag = "roles",
    params(
        ("role_id" = i64, Path, description = "Role ID")
    ),
    responses(
        (status = 200, description = "Role", body = RoleResponse),
        (status = 404, description = "Role not found")
    )
)]
pub async fn get_role(
    State(state): State<Arc<AppState>>,
    Path(role_id): Path<i64>,
) -> Result<Json<ApiResponse<RoleResponse>>, ApiError> {
    let role = RoleRepository::new(state.db.pool())
        .get_by_id(role_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Role not found"))?;
    Ok(Json(ApiResponse::new(role.into())))
}

/// GET /roles/get-role-name/:role_name - Get a role by name.
#[utoipa::path(
    get,
    path = "/roles/get-role-name/{role_name}",
    tag = "roles",
    params(
        ("role_name" = String, Path, description = "Role name")
    ),
    responses(
        (status = 200, description = "Role", body = RoleResponse),
        (status = 404, description = "Role not found")
    )
)]
pub async fn get_role_by_name(
    State(state): State<Arc<AppState>>,
    Path(role_name): Path<String>,
) -> Result<Json<ApiResponse<RoleResponse>>, ApiError> {
    let role = RoleRepository::new(state.db.pool())
        .get_by_name(&role_name)
        .await?
        .ok_or_else(|| ApiError::not_found("Role not found"))?;
    Ok(Json(ApiResponse::new(role.into())))
}

/// POST /roles/create-role - Create a role.
#[utoipa::path(
    post,
    path = "/roles/create-role",
    tag = "roles",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Role created", body = RoleResponse),
        (status = 409, description = "Role name already taken"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create_role(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateRoleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RoleResponse>>), ApiError> {
    let role_repo = RoleRepository::new(state.db.pool());
    let role_name = req.role_name.trim();

    if role_repo.get_by_name(role_name).await?.is_some() {
        return Err(ApiError::conflict("Role name already taken"));
    }

    let role = role_repo
        .create(
            &NewRole::new(role_name, req.role_description)
                .with_create_files(req.can_create_files)
                .with_create_folders(req.can_create_folders)
                .with_admin(req.is_admin),
        )
        .await?;

    tracing::info!(role_id = role.id, role_name = %role.role_name, "Role created");

    Ok((StatusCode::CREATED, Json(ApiResponse::new(role.into()))))
}

/// PATCH /roles/update-role/:role_id - Update a role.
#[utoipa::path(
    patch,
    path = "/roles/update-role/{role_id}",
    tag = "roles",
    params(
        ("role_id" = i64, Path, description = "Role ID")
    ),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Updated role", body = RoleResponse),
        (status = 404, description = "Role not found"),
        (status = 409, description = "Role name already taken"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update_role(
    State(state): State<Arc<AppState>>,
    Path(role_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateRoleRequest>,
) -> Result<Json<ApiResponse<RoleResponse>>, ApiError> {
    let role_repo = RoleRepository::new(state.db.pool());

    let role_name = req.role_name.map(|name| name.trim().to_string());
    if let Some(ref name) = role_name {
        if let Some(existing) = role_repo.get_by_name(name).await? {
            if existing.id != role_id {
                return Err(ApiError::conflict("Role name already taken"));
            }
        }
    }

    let update = RoleUpdate {
        role_name,
        role_description: req.role_description,
        can_create_files: req.can_create_files,
        can_create_folders: req.can_create_folders,
        is_admin: req.is_admin,
    };

    let role = role_repo
        .update(role_id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("Role not found"))?;

    Ok(Json(ApiResponse::new(role.into())))
}

/// DELETE /roles/delete-role/:role_id - Delete a role.
///
/// A role still assigned to users cannot be deleted.
#[utoipa::path(
    delete,
    path = "/roles/delete-role/{role_id}",
    tag = "roles",
    params(
        ("role_id" = i64, Path, description = "Role ID")
    ),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 404, description = "Role not found"),
        (status = 409, description = "Role still assigned to users")
    )
)]
pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    Path(role_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let holders = UserRepository::new(state.db.pool())
        .count_by_role(role_id)
        .await?;
    if holders > 0 {
        return Err(ApiError::conflict(format!(
            "Role is assigned to {} user(s)",
            holders
        )));
    }

    if !RoleRepository::new(state.db.pool()).delete(role_id).await? {
        return Err(ApiError::not_found("Role not found"));
    }

    tracing::info!(role_id, "Role deleted");

    Ok(StatusCode::NO_CONTENT)
}
