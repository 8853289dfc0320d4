//! HTTP client for the gestor API.
//!
//! Used by dashboards and scripts that talk to a running server.

use std::time::Duration;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::web::dto::{
    ApiResponse, CreateFolderRequest, CreateRoleRequest, CreateUserRequest, FileResponse,
    FolderResponse, RoleResponse, ServiceInfo, UpdateUserRequest, UserResponse,
    VerifyCredentialsRequest,
};

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Total timeout in seconds. Uploads and downloads may be large.
const TOTAL_TIMEOUT_SECS: u64 = 300;

/// User agent string.
const USER_AGENT: &str = concat!("gestor-client/", env!("CARGO_PKG_VERSION"));

/// Errors returned by [`ApiClient`].
#[derive(Error, Debug)]
pub enum ClientError {
    /// The request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error status.
    #[error("{status} {code}: {message}")]
    Api {
        /// HTTP status.
        status: StatusCode,
        /// Error code from the response body, e.g. `NOT_FOUND`.
        code: String,
        /// Human-readable message.
        message: String,
    },
}

impl ClientError {
    /// HTTP status of an API error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
        }
    }
}

/// Result type for client calls.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

/// Client for the gestor HTTP API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the server at `base_url` (e.g. `http://localhost:8000`).
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(TOTAL_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(request: RequestBuilder) -> ClientResult<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await?;
        let (code, message) = match serde_json::from_slice::<ErrorEnvelope>(&body) {
            Ok(envelope) => (envelope.error.code, envelope.error.message),
            Err(_) => (
                status.as_str().to_string(),
                String::from_utf8_lossy(&body).into_owned(),
            ),
        };
        Err(ClientError::Api {
            status,
            code,
            message,
        })
    }

    async fn data<T: DeserializeOwned>(request: RequestBuilder) -> ClientResult<T> {
        let response = Self::send(request).await?;
        Ok(response.json::<ApiResponse<T>>().await?.data)
    }

    /// GET /health.
    pub async fn health(&self) -> ClientResult<String> {
        let response = Self::send(self.client.get(self.url("/health"))).await?;
        Ok(response.text().await?)
    }

    /// GET / - Service banner.
    pub async fn info(&self) -> ClientResult<ServiceInfo> {
        Self::data(self.client.get(self.url("/"))).await
    }

    // ------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------

    /// List every file.
    pub async fn list_files(&self) -> ClientResult<Vec<FileResponse>> {
        Self::data(self.client.get(self.url("/files/get-files"))).await
    }

    /// List files owned by a user.
    pub async fn list_files_by_owner(&self, user_id: i64) -> ClientResult<Vec<FileResponse>> {
        Self::data(
            self.client
                .get(self.url(&format!("/files/get-files-user-id/{user_id}"))),
        )
        .await
    }

    /// List files matching a display or full name.
    pub async fn list_files_by_name(&self, file_name: &str) -> ClientResult<Vec<FileResponse>> {
        let path = format!("/files/get-file-name/{}", urlencoding::encode(file_name));
        Self::data(self.client.get(self.url(&path))).await
    }

    /// Get a file record.
    pub async fn get_file(&self, file_id: i64) -> ClientResult<FileResponse> {
        Self::data(
            self.client
                .get(self.url(&format!("/files/get-file-id/{file_id}"))),
        )
        .await
    }

    /// Download a file's content.
    pub async fn download_file(&self, file_id: i64) -> ClientResult<Bytes> {
        let response = Self::send(
            self.client
                .get(self.url(&format!("/files/download-file/{file_id}"))),
        )
        .await?;
        Ok(response.bytes().await?)
    }

    /// Upload a file into a folder on behalf of `owner_id`.
    pub async fn upload_file(
        &self,
        filename: &str,
        content: impl Into<Bytes>,
        folder_id: i64,
        owner_id: i64,
    ) -> ClientResult<FileResponse> {
        let content: Bytes = content.into();
        let mime = mime_guess::from_path(filename).first_or_octet_stream();
        let part = Part::bytes(content.to_vec())
            .file_name(filename.to_string())
            .mime_str(mime.as_ref())?;
        let form = Form::new()
            .part("file", part)
            .text("folder_id", folder_id.to_string())
            .text("owner_id", owner_id.to_string());

        Self::data(
            self.client
                .post(self.url("/files/upload-register-file"))
                .multipart(form),
        )
        .await
    }

    /// Delete a file on behalf of `user_id`.
    pub async fn delete_file(
        &self,
        file_id: i64,
        file_name: &str,
        user_id: i64,
    ) -> ClientResult<FileResponse> {
        let path = format!(
            "/files/delete-file/{file_id}/{}/{user_id}",
            urlencoding::encode(file_name)
        );
        Self::data(self.client.delete(self.url(&path))).await
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// List all users.
    pub async fn list_users(&self) -> ClientResult<Vec<UserResponse>> {
        Self::data(self.client.get(self.url("/users/get-users"))).await
    }

    /// Get a user by ID.
    pub async fn get_user(&self, user_id: i64) -> ClientResult<UserResponse> {
        Self::data(
            self.client
                .get(self.url(&format!("/users/get-user-id/{user_id}"))),
        )
        .await
    }

    /// Get a user by username.
    pub async fn get_user_by_username(&self, username: &str) -> ClientResult<UserResponse> {
        let path = format!("/users/get-user-username/{}", urlencoding::encode(username));
        Self::data(self.client.get(self.url(&path))).await
    }

    /// Create a user.
    pub async fn create_user(&self, request: &CreateUserRequest) -> ClientResult<UserResponse> {
        Self::data(self.client.post(self.url("/users/create-user")).json(request)).await
    }

    /// Update a user.
    pub async fn update_user(
        &self,
        user_id: i64,
        request: &UpdateUserRequest,
    ) -> ClientResult<UserResponse> {
        Self::data(
            self.client
                .patch(self.url(&format!("/users/update-user/{user_id}")))
                .json(request),
        )
        .await
    }

    /// Delete a user.
    pub async fn delete_user(&self, user_id: i64) -> ClientResult<()> {
        Self::send(
            self.client
                .delete(self.url(&format!("/users/delete-user/{user_id}"))),
        )
        .await?;
        Ok(())
    }

    /// Check a username and password. Invalid credentials give a 401 error.
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> ClientResult<UserResponse> {
        let request = VerifyCredentialsRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        Self::data(
            self.client
                .post(self.url("/users/verify-credentials"))
                .json(&request),
        )
        .await
    }

    // ------------------------------------------------------------------
    // Roles and folders
    // ------------------------------------------------------------------

    /// List all roles.
    pub async fn list_roles(&self) -> ClientResult<Vec<RoleResponse>> {
        Self::data(self.client.get(self.url("/roles/get-roles"))).await
    }

    /// Create a role.
    pub async fn create_role(&self, request: &CreateRoleRequest) -> ClientResult<RoleResponse> {
        Self::data(self.client.post(self.url("/roles/create-role")).json(request)).await
    }

    /// List all folders.
    pub async fn list_folders(&self) -> ClientResult<Vec<FolderResponse>> {
        Self::data(self.client.get(self.url("/folders/get-folders"))).await
    }

    /// Create a folder.
    pub async fn create_folder(
        &self,
        request: &CreateFolderRequest,
    ) -> ClientResult<FolderResponse> {
        Self::data(
            self.client
                .post(self.url("/folders/create-folder"))
                .json(request),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.url("/health"), "http://localhost:8000/health");
    }

    #[test]
    fn test_api_error_display() {
        let err = ClientError::Api {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND".to_string(),
            message: "file not found".to_string(),
        };
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.to_string(), "404 Not Found NOT_FOUND: file not found");
    }
}
