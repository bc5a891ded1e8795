use orderdesk_shared::{CollectionKind, DocId, RemoteError};
use orderdesk_store::StoreError;
use thiserror::Error;

/// Errors produced by the sync layer.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A page fetch or subscription failed. Mirror and page state are left
    /// as they were.
    #[error("Failed to fetch {collection}: {source}")]
    TransientFetch {
        collection: CollectionKind,
        #[source]
        source: RemoteError,
    },

    /// Delete refused because loaded orders still reference the customer.
    #[error("Customer {customer} has {orders} loaded order(s) and cannot be deleted")]
    CustomerReferenced { customer: DocId, orders: usize },

    /// Delete refused because the remote store reports referencing orders.
    #[error("Customer {0} has orders in the remote store and cannot be deleted")]
    CustomerReferencedRemotely(DocId),

    /// A draft failed validation before any remote call.
    #[error("Invalid {entity}: {reason}")]
    Invalid {
        entity: &'static str,
        reason: String,
    },

    #[error("Attachment rejected: {0}")]
    Attachment(String),

    /// A mutation failed at the remote store.
    #[error("Failed to {action}: {source}")]
    Remote {
        action: &'static str,
        #[source]
        source: RemoteError,
    },

    /// A record could not be encoded into document fields.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Remote collection mismatch: expected {expected}, got {actual}")]
    CollectionMismatch {
        expected: CollectionKind,
        actual: CollectionKind,
    },
}

impl SyncError {
    pub(crate) fn invalid(entity: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            entity,
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SyncError>;
