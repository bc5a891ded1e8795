use orderdesk_shared::{DocId, RemoteError};
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (database directory, blob files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Document fields could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A document was expected but does not exist.
    #[error("Document not found: {0}")]
    NotFound(DocId),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Blob too large: {size} bytes (max {max})")]
    BlobTooLarge { size: usize, max: usize },

    #[error("Empty blob")]
    EmptyBlob,

    #[error("Path traversal detected: {0}")]
    PathTraversal(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for RemoteError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => RemoteError::NotFound(id),
            StoreError::BlobTooLarge { .. } | StoreError::EmptyBlob | StoreError::PathTraversal(_) => {
                RemoteError::Rejected(err.to_string())
            }
            other => RemoteError::Storage(other.to_string()),
        }
    }
}
