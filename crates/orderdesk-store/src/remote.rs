//! The remote collection capability consumed by the sync engine.
//!
//! A remote collection is an ordered, cursor-paginated set of documents with
//! a change feed. Every write is stamped with a [`Revision`] so consumers can
//! order writes without relying on delivery order.

use async_trait::async_trait;
use futures::stream::BoxStream;
use orderdesk_shared::{CollectionKind, Cursor, DocId, Fields, RemoteError, Revision, SortOrder};

/// A document as returned by a page fetch or carried by a notification.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub id: DocId,
    pub revision: Revision,
    pub fields: Fields,
}

impl RemoteDocument {
    pub fn cursor(&self, order: &SortOrder) -> Cursor {
        Cursor::new(order.value_of(&self.fields), self.id.clone())
    }
}

/// One change on a subscribed collection.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentChange {
    Added(RemoteDocument),
    Modified(RemoteDocument),
    Removed { id: DocId, revision: Revision },
}

impl DocumentChange {
    pub fn id(&self) -> &DocId {
        match self {
            Self::Added(doc) | Self::Modified(doc) => &doc.id,
            Self::Removed { id, .. } => id,
        }
    }

    pub fn revision(&self) -> Revision {
        match self {
            Self::Added(doc) | Self::Modified(doc) => doc.revision,
            Self::Removed { revision, .. } => *revision,
        }
    }
}

/// Ordered range request: `limit` documents strictly after `start_after`.
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub order: SortOrder,
    pub limit: usize,
    pub start_after: Option<Cursor>,
}

impl PageQuery {
    pub fn first(kind: CollectionKind, limit: usize) -> Self {
        Self {
            order: kind.sort_order(),
            limit,
            start_after: None,
        }
    }

    pub fn after(kind: CollectionKind, limit: usize, cursor: Cursor) -> Self {
        Self {
            order: kind.sort_order(),
            limit,
            start_after: Some(cursor),
        }
    }
}

/// Live change notifications. The stream ends when the subscription is
/// closed by the remote side.
pub type ChangeStream = BoxStream<'static, Result<DocumentChange, RemoteError>>;

#[async_trait]
pub trait RemoteCollection: Send + Sync {
    fn kind(&self) -> CollectionKind;

    async fn fetch_page(&self, query: PageQuery) -> Result<Vec<RemoteDocument>, RemoteError>;

    async fn subscribe(&self) -> Result<ChangeStream, RemoteError>;

    /// Create a document; the store assigns its identifier.
    async fn add(&self, fields: Fields) -> Result<DocId, RemoteError>;

    /// Replace (or create) the document with the given identifier.
    async fn set(&self, id: &DocId, fields: Fields) -> Result<(), RemoteError>;

    /// Merge `fields` into an existing document.
    async fn update(&self, id: &DocId, fields: Fields) -> Result<(), RemoteError>;

    async fn delete(&self, id: &DocId) -> Result<(), RemoteError>;

    /// Whether any document has `field` equal to `value`.
    async fn exists_where(&self, field: &str, value: &str) -> Result<bool, RemoteError>;
}
