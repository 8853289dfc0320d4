//! Storage key derivation and object URLs.

use std::path::Path;

use crate::{GestorError, Result};

/// Maximum length of a display name (in characters).
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Characters kept verbatim in object URLs besides ASCII alphanumerics.
const URL_SAFE: &str = "-._~,:;/=?& ()";

/// Split an uploaded file name into display name and type.
///
/// The type keeps its leading dot and may be empty:
/// `"report.pdf"` becomes `("report", ".pdf")`, `".hidden"` stays whole.
pub fn split_file_name(original: &str) -> (String, String) {
    let path = Path::new(original);
    let stem = path.file_stem().and_then(|s| s.to_str());
    let ext = path.extension().and_then(|s| s.to_str());

    match (stem, ext) {
        (Some(stem), Some(ext)) => (stem.to_string(), format!(".{ext}")),
        _ => (original.to_string(), String::new()),
    }
}

/// Validate a display name before it is used to derive a key.
pub fn validate_file_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(GestorError::Validation("file name must not be empty".into()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(GestorError::Validation(
            "file name must not contain path separators".into(),
        ));
    }
    if name == "." || name == ".." {
        return Err(GestorError::Validation(format!("invalid file name: {name}")));
    }
    if name.chars().count() > MAX_FILENAME_LENGTH {
        return Err(GestorError::Validation(format!(
            "file name exceeds {MAX_FILENAME_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Derive the object key for a file: `prefix/name+type`, or `name+type`
/// without a prefix.
///
/// The same name and type always map to the same key.
pub fn storage_key(prefix: Option<&str>, file_name: &str, file_type: &str) -> Result<String> {
    validate_file_name(file_name)?;
    if file_type.contains('/') || file_type.contains('\\') {
        return Err(GestorError::Validation(
            "file type must not contain path separators".into(),
        ));
    }

    let object_name = format!("{file_name}{file_type}");
    match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(prefix) => Ok(format!("{prefix}/{object_name}")),
        None => Ok(object_name),
    }
}

/// Public URL of an object in an S3 bucket.
///
/// Spaces become `+`; everything outside the safe set is percent-encoded.
pub fn create_s3_url(bucket: &str, region: &str, key: &str) -> String {
    format!(
        "https://{bucket}.s3.{region}.amazonaws.com/{}",
        encode_key(key)
    )
}

fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    let mut buf = [0u8; 4];
    for ch in key.chars() {
        if ch == ' ' {
            encoded.push('+');
        } else if ch.is_ascii_alphanumeric() || URL_SAFE.contains(ch) {
            encoded.push(ch);
        } else {
            encoded.push_str(&urlencoding::encode(ch.encode_utf8(&mut buf)));
        }
    }
    encoded
}
