//! User handlers for Web API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::auth::{hash_password, verify_password};
use crate::db::{NewUser, RoleRepository, User, UserRepository, UserUpdate};
use crate::file::FileRepository;
use crate::web::dto::{
    ApiResponse, CreateUserRequest, UpdateUserRequest, UserResponse, ValidatedJson,
    VerifyCredentialsRequest,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::GestorError;

async fn ensure_role_exists(state: &AppState, role_id: i64) -> Result<(), ApiError> {
    RoleRepository::new(state.db.pool())
        .get_by_id(role_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Role not found"))?;
    Ok(())
}

async fn load_user(state: &AppState, user_id: i64) -> Result<User, ApiError> {
    UserRepository::new(state.db.pool())
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// GET /users/get-users - List all users.
#[utoipa::path(
    get,
    path = "/users/get-users",
    tag = "users",
    responses(
        (status = 200, description = "All users", body = Vec<UserResponse>)
    )
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ApiError> {
    let users = UserRepository::new(state.db.pool()).list_all().await?;
    Ok(Json(ApiResponse::new(
        users.into_iter().map(UserResponse::from).collect(),
    )))
}

/// GET /users/get-user-id/:user_id - Get a user by ID.
#[utoipa::path(
    get,
    path = "/users/get-user-id/{user_id}",
    tag = "users",
    params(
        ("user_id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = load_user(&state, user_id).await?;
    Ok(Json(ApiResponse::new(user.into())))
}

/// GET /users/get-user-username/:username - Get a user by username.
#[utoipa::path(
    get,
    path = "/users/get-user-username/{username}",
    tag = "users",
    params(
        ("username" = String, Path, description = "Username (case-insensitive)")
    ),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_by_username(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = UserRepository::new(state.db.pool())
        .get_by_username(&username)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(ApiResponse::new(user.into())))
}

/// POST /users/create-user - Create a user.
#[utoipa::path(
    post,
    path = "/users/create-user",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 404, description = "Role not found"),
        (status = 409, description = "Username already taken"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    let user_repo = UserRepository::new(state.db.pool());

    if user_repo.username_exists(&req.username).await? {
        return Err(ApiError::conflict("Username already taken"));
    }
    ensure_role_exists(&state, req.role_id).await?;

    let password_hash = hash_password(&req.password).map_err(GestorError::from)?;
    let user = user_repo
        .create(&NewUser::new(
            req.full_name.trim(),
            &req.username,
            password_hash,
            req.role_id,
        ))
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "User created");

    Ok((StatusCode::CREATED, Json(ApiResponse::new(user.into()))))
}

/// PATCH /users/update-user/:user_id - Update a user.
///
/// Absent fields are left unchanged. A new password is re-hashed.
#[utoipa::path(
    patch,
    path = "/users/update-user/{user_id}",
    tag = "users",
    params(
        ("user_id" = i64, Path, description = "User ID")
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 404, description = "User or role not found"),
        (status = 409, description = "Username already taken"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let current = load_user(&state, user_id).await?;
    let user_repo = UserRepository::new(state.db.pool());

    let mut update = UserUpdate::new();
    if let Some(full_name) = req.full_name {
        update = update.full_name(full_name.trim());
    }
    if let Some(username) = req.username {
        if !username.eq_ignore_ascii_case(&current.username)
            && user_repo.username_exists(&username).await?
        {
            return Err(ApiError::conflict("Username already taken"));
        }
        update = update.username(username);
    }
    if let Some(password) = req.password {
        update = update.password(hash_password(&password).map_err(GestorError::from)?);
    }
    if let Some(role_id) = req.role_id {
        ensure_role_exists(&state, role_id).await?;
        update = update.role_id(role_id);
    }

    let user = user_repo
        .update(user_id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::new(user.into())))
}

/// DELETE /users/delete-user/:user_id - Delete a user.
///
/// Users that still own files cannot be deleted.
#[utoipa::path(
    delete,
    path = "/users/delete-user/{user_id}",
    tag = "users",
    params(
        ("user_id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User still owns files")
    )
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let owned = FileRepository::new(state.db.pool())
        .count_by_owner(user_id)
        .await?;
    if owned > 0 {
        return Err(ApiError::conflict(format!("User still owns {} file(s)", owned)));
    }

    if !UserRepository::new(state.db.pool()).delete(user_id).await? {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!(user_id, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// POST /users/verify-credentials - Check a username and password.
#[utoipa::path(
    post,
    path = "/users/verify-credentials",
    tag = "users",
    request_body = VerifyCredentialsRequest,
    responses(
        (status = 200, description = "Credentials valid", body = UserResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn verify_credentials(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<VerifyCredentialsRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = UserRepository::new(state.db.pool())
        .get_by_username(&req.username)
        .await?
        .ok_or_else(|| ApiError::unauthorized("invalid credentials"))?;

    verify_password(&req.password, &user.password).map_err(|e| {
        tracing::warn!(username = %req.username, "Credential check failed: {}", e);
        ApiError::unauthorized("invalid credentials")
    })?;

    Ok(Json(ApiResponse::new(user.into())))
}
