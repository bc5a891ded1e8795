use thiserror::Error;

use crate::types::DocId;

/// Errors reported by remote capabilities (document collections and the
/// blob store).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Remote service unavailable: {0}")]
    Unavailable(String),

    #[error("Document not found: {0}")]
    NotFound(DocId),

    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The change feed dropped notifications because the consumer fell
    /// behind. The consumer must resynchronise.
    #[error("Change feed lagged, {0} notifications dropped")]
    Lagged(u64),

    #[error("Storage error: {0}")]
    Storage(String),
}
