//! Error types for gestor.

use thiserror::Error;

use crate::file::StorageError;

/// Common error type for gestor.
#[derive(Error, Debug)]
pub enum GestorError {
    /// Metadata store error.
    ///
    /// Wraps errors from the relational backend. Errors from sqlx are
    /// converted automatically.
    #[error("database error: {0}")]
    Database(String),

    /// Object store error.
    #[error("object storage error: {0}")]
    Storage(#[from] StorageError),

    /// A remote call did not finish within its deadline.
    #[error("timed out: {0}")]
    Timeout(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Permission denied error.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Two identifiers given for the same resource disagree.
    #[error("identity mismatch: {0}")]
    Mismatch(String),

    /// Resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Object delete failed after the metadata row was removed; the row was
    /// re-inserted from its snapshot.
    #[error("object delete failed for file {file_id} ({cause}); metadata restored")]
    InvariantRestored {
        /// Id of the file whose delete was rolled back.
        file_id: i64,
        /// Why the object delete failed.
        cause: String,
    },

    /// Object delete failed and re-inserting the metadata row failed too.
    /// The object exists without a row.
    #[error(
        "object delete failed for file {file_id} ({cause}); metadata restore failed ({restore_error})"
    )]
    InvariantViolated {
        /// Id of the file left inconsistent.
        file_id: i64,
        /// Why the object delete failed.
        cause: String,
        /// Why the restore failed.
        restore_error: String,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GestorError {
    /// Whether this error came from a call to the database or object store.
    /// A missing object counts as absent, not as an upstream failure.
    pub fn is_upstream(&self) -> bool {
        match self {
            GestorError::Storage(StorageError::NotFound(_)) => false,
            GestorError::Database(_) | GestorError::Storage(_) | GestorError::Timeout(_) => true,
            _ => false,
        }
    }
}

// Conversion from sqlx errors
impl From<sqlx::Error> for GestorError {
    fn from(e: sqlx::Error) -> Self {
        GestorError::Database(e.to_string())
    }
}

/// Result type alias for gestor operations.
pub type Result<T> = std::result::Result<T, GestorError>;
