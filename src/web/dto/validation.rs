//! Validation utilities for Web API DTOs.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::web::error::ApiError;

/// A JSON extractor that validates the request body.
///
/// This extractor deserializes the request body as JSON and then validates it
/// using the `validator` crate. If validation fails, it returns a detailed
/// error response with field-level error information.
///
/// # Example
///
/// ```ignore
/// use gestor::web::dto::ValidatedJson;
///
/// async fn create_user(
///     ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
/// ) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
///     // payload is already validated
///     // ...
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        // First, extract the JSON body
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {}", e)))?;

        // Then, validate the deserialized value
        value.validate().map_err(ApiError::from_validation_errors)?;

        Ok(ValidatedJson(value))
    }
}

// ============================================================================
// Custom Validators
// ============================================================================

/// Validate that a string does not contain control characters or NULL bytes.
pub fn no_control_chars(value: &str) -> Result<(), validator::ValidationError> {
    if value
        .chars()
        .any(|c| c.is_control() && c != '\n' && c != '\r' && c != '\t')
    {
        return Err(validator::ValidationError::new("no_control_chars")
            .with_message("Must not contain control characters".into()));
    }
    Ok(())
}

/// Validate a display name: not blank and free of control characters.
pub fn valid_name(value: &str) -> Result<(), validator::ValidationError> {
    not_empty_trimmed(value)?;
    no_control_chars(value)
}

/// Validate a folder name: a valid name without path separators.
pub fn valid_folder_name(value: &str) -> Result<(), validator::ValidationError> {
    valid_name(value)?;
    no_path_separators(value)
}

/// Validate that a name does not contain path separators.
pub fn no_path_separators(value: &str) -> Result<(), validator::ValidationError> {
    if value.contains(['/', '\\']) {
        return Err(validator::ValidationError::new("no_path_separators")
            .with_message("Must not contain '/' or '\\'".into()));
    }
    Ok(())
}

/// Validate that a string is not empty after trimming whitespace.
pub fn not_empty_trimmed(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("not_empty_trimmed")
            .with_message("Must not be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_control_chars_valid() {
        assert!(no_control_chars("Hello, world!").is_ok());
        assert!(no_control_chars("Line 1\nLine 2").is_ok());
        assert!(no_control_chars("Tab\there").is_ok());
        assert!(no_control_chars("Return\rhere").is_ok());
    }

    #[test]
    fn test_no_control_chars_invalid() {
        assert!(no_control_chars("Hello\x00World").is_err()); // NULL byte
        assert!(no_control_chars("Hello\x07World").is_err()); // Bell
        assert!(no_control_chars("Hello\x1bWorld").is_err()); // Escape
    }

    #[test]
    fn test_no_path_separators() {
        assert!(no_path_separators("Invoices 2024").is_ok());
        assert!(no_path_separators("a/b").is_err());
        assert!(no_path_separators("a\\b").is_err());
    }

    #[test]
    fn test_valid_folder_name() {
        assert!(valid_folder_name("Invoices").is_ok());
        assert!(valid_folder_name(" ").is_err());
        assert!(valid_folder_name("a\x07b").is_err());
        assert!(valid_folder_name("a/b").is_err());
    }

    #[test]
    fn test_not_empty_trimmed_valid() {
        assert!(not_empty_trimmed("Hello").is_ok());
        assert!(not_empty_trimmed("  Hello  ").is_ok());
    }

    #[test]
    fn test_not_empty_trimmed_invalid() {
        assert!(not_empty_trimmed("").is_err());
        assert!(not_empty_trimmed("   ").is_err());
        assert!(not_empty_trimmed("\t\n").is_err());
    }

    #[derive(Debug, serde::Deserialize, Validate)]
    struct Named {
        #[validate(custom(function = "not_empty_trimmed"))]
        name: String,
    }

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_validated_json_accepts_valid_body() {
        let request = json_request(r#"{"name":"docs"}"#);
        let ValidatedJson(named) = ValidatedJson::<Named>::from_request(request, &())
            .await
            .unwrap();
        assert_eq!(named.name, "docs");
    }

    #[tokio::test]
    async fn test_validated_json_rejects_invalid_body() {
        let err = ValidatedJson::<Named>::from_request(json_request(r#"{"name":"  "}"#), &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.code(), crate::web::error::ErrorCode::ValidationError);

        let err = ValidatedJson::<Named>::from_request(json_request("{"), &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.code(), crate::web::error::ErrorCode::BadRequest);
    }
}
