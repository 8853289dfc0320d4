//! File handlers for Web API.

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::file::UploadRequest;
use crate::web::dto::{ApiResponse, FileResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Generate a safe Content-Disposition header value for file downloads.
///
/// Control characters are dropped and quotes and backslashes replaced in
/// the plain `filename` parameter. Non-ASCII names also get an RFC 5987
/// `filename*` parameter.
pub(crate) fn content_disposition_header(filename: &str) -> String {
    let needs_escaping = filename
        .chars()
        .any(|c| c.is_control() || c == '"' || c == '\\');
    if filename.is_ascii() && !needs_escaping {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ => c,
        })
        .collect();
    let encoded = urlencoding::encode(filename);

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized, encoded
    )
}

/// GET /files/get-files - List every file.
#[utoipa::path(
    get,
    path = "/files/get-files",
    tag = "files",
    responses(
        (status = 200, description = "All file records", body = Vec<FileResponse>),
        (status = 502, description = "Metadata store unavailable")
    )
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<FileResponse>>>, ApiError> {
    let files = state.file_service().list_files().await?;
    Ok(Json(ApiResponse::new(
        files.into_iter().map(FileResponse::from).collect(),
    )))
}

/// GET /files/get-files-user-id/:user_id - List files owned by a user.
#[utoipa::path(
    get,
    path = "/files/get-files-user-id/{user_id}",
    tag = "files",
    params(
        ("user_id" = i64, Path, description = "Owner ID")
    ),
    responses(
        (status = 200, description = "Files owned by the user", body = Vec<FileResponse>),
        (status = 502, description = "Metadata store unavailable")
    )
)]
pub async fn list_files_by_owner(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<FileResponse>>>, ApiError> {
    let files = state.file_service().list_by_owner(user_id).await?;
    Ok(Json(ApiResponse::new(
        files.into_iter().map(FileResponse::from).collect(),
    )))
}

/// GET /files/get-file-name/:file_name - List files with a given name.
///
/// Matches either the display name (`report`) or the full name (`report.pdf`).
#[utoipa::path(
    get,
    path = "/files/get-file-name/{file_name}",
    tag = "files",
    params(
        ("file_name" = String, Path, description = "Display or full file name")
    ),
    responses(
        (status = 200, description = "Matching files", body = Vec<FileResponse>),
        (status = 502, description = "Metadata store unavailable")
    )
)]
pub async fn list_files_by_name(
    State(state): State<Arc<AppState>>,
    Path(file_name): Path<String>,
) -> Result<Json<ApiResponse<Vec<FileResponse>>>, ApiError> {
    let files = state.file_service().list_by_name(&file_name).await?;
    Ok(Json(ApiResponse::new(
        files.into_iter().map(FileResponse::from).collect(),
    )))
}

/// GET /files/get-file-id/:file_id - Get a file record.
#[utoipa::path(
    get,
    path = "/files/get-file-id/{file_id}",
    tag = "files",
    params(
        ("file_id" = i64, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File record", body = FileResponse),
        (status = 404, description = "File not found")
    )
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let file = state.file_service().get_file(file_id).await?;
    Ok(Json(ApiResponse::new(file.into())))
}

/// GET /files/download-file/:file_id - Download file content.
#[utoipa::path(
    get,
    path = "/files/download-file/{file_id}",
    tag = "files",
    params(
        ("file_id" = i64, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 404, description = "File record or content not found"),
        (status = 502, description = "Object store unavailable")
    )
)]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<i64>,
) -> Result<Response<Body>, ApiError> {
    let (file, content) = state.file_service().download(file_id).await?;

    let filename = file.full_name();
    let content_type = file
        .file_metadata
        .get("content_type")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| {
            mime_guess::from_path(&filename)
                .first_or_octet_stream()
                .to_string()
        });

    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&filename),
        )
        .header(header::CONTENT_LENGTH, content.len())
        .body(Body::from(content))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// POST /files/upload-register-file - Upload a file and register its record.
///
/// Request body: multipart/form-data with `file`, `folder_id` and `owner_id`.
#[utoipa::path(
    post,
    path = "/files/upload-register-file",
    tag = "files",
    responses(
        (status = 201, description = "File stored and registered", body = FileResponse),
        (status = 400, description = "Missing or malformed field"),
        (status = 403, description = "Owner's role cannot upload files"),
        (status = 404, description = "Owner or folder not found"),
        (status = 409, description = "A file already uses this storage key"),
        (status = 422, description = "Invalid file name or file too large"),
        (status = 502, description = "Metadata or object store unavailable")
    )
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<FileResponse>>), ApiError> {
    let mut filename: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut content = None;
    let mut folder_id: Option<i64> = None;
    let mut owner_id: Option<i64> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                filename = field.file_name().map(|s| s.to_string());
                content_type = field.content_type().map(|s| s.to_string());
                content = Some(field.bytes().await.map_err(|e| {
                    tracing::warn!("Failed to read file content: {}", e);
                    ApiError::bad_request("Failed to read file")
                })?);
            }
            "folder_id" => folder_id = Some(parse_id_field(&name, field.text().await)?),
            "owner_id" => owner_id = Some(parse_id_field(&name, field.text().await)?),
            _ => {}
        }
    }

    let filename = filename.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    let content = content.ok_or_else(|| ApiError::bad_request("No file content"))?;
    let folder_id = folder_id.ok_or_else(|| ApiError::bad_request("Missing folder_id"))?;
    let owner_id = owner_id.ok_or_else(|| ApiError::bad_request("Missing owner_id"))?;

    // Browsers send octet-stream for unknown types; prefer a guess from the name.
    let content_type = content_type.filter(|c| c != "application/octet-stream");

    let file = state
        .file_service()
        .upload(UploadRequest {
            filename,
            content,
            content_type,
            folder_id,
            owner_id,
        })
        .await?;

    tracing::info!(file_id = file.id, key = %file.storage_key, "File uploaded");

    Ok((StatusCode::CREATED, Json(ApiResponse::new(file.into()))))
}

fn parse_id_field(
    name: &str,
    text: Result<String, axum::extract::multipart::MultipartError>,
) -> Result<i64, ApiError> {
    let text = text.map_err(|e| {
        tracing::warn!("Failed to read {} field: {}", name, e);
        ApiError::bad_request(format!("Invalid {}", name))
    })?;
    text.trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("{} must be an integer", name)))
}

/// DELETE /files/delete-file/:file_id/:file_name/:user_id - Delete a file.
///
/// `user_id` must own the file or hold an administrative role. `file_name`
/// must name the file with `file_id`.
#[utoipa::path(
    delete,
    path = "/files/delete-file/{file_id}/{file_name}/{user_id}",
    tag = "files",
    params(
        ("file_id" = i64, Path, description = "File ID"),
        ("file_name" = String, Path, description = "Display or full name of the file"),
        ("user_id" = i64, Path, description = "Requesting user ID")
    ),
    responses(
        (status = 200, description = "Deleted file record", body = FileResponse),
        (status = 400, description = "File name does not match the file ID"),
        (status = 403, description = "Requester may not delete the file"),
        (status = 404, description = "File or user not found"),
        (status = 500, description = "Object delete failed; record restored or left inconsistent"),
        (status = 502, description = "Metadata store unavailable")
    )
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path((file_id, file_name, user_id)): Path<(i64, String, i64)>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let file = state
        .file_service()
        .delete(file_id, &file_name, user_id)
        .await?;

    tracing::info!(file_id, user_id, "File deleted");

    Ok(Json(ApiResponse::new(file.into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition_header("report.pdf"),
            "attachment; filename=\"report.pdf\""
        );
    }

    #[test]
    fn test_content_disposition_non_ascii() {
        let header = content_disposition_header("résumé.pdf");
        assert!(header.starts_with("attachment; filename=\"résumé.pdf\""));
        assert!(header.contains("filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"));
    }

    #[test]
    fn test_content_disposition_strips_injection() {
        let header = content_disposition_header("a\"b\r\nSet-Cookie: x.txt");
        assert!(!header.contains('\r'));
        assert!(!header.contains('\n'));
        assert!(header.starts_with("attachment; filename=\"a_bSet-Cookie: x.txt\""));
    }

    #[test]
    fn test_parse_id_field() {
        assert_eq!(parse_id_field("folder_id", Ok(" 7 ".to_string())).unwrap(), 7);
        let err = parse_id_field("owner_id", Ok("seven".to_string())).unwrap_err();
        assert_eq!(err.code(), crate::web::error::ErrorCode::BadRequest);
    }
}
