//! [`RemoteCollection`] backed by the local SQLite database.
//!
//! Writes go through a single [`Database`] handle guarded by an async mutex.
//! Each committed write is published on the collection's broadcast feed while
//! the lock is still held, so subscribers observe notifications in revision
//! order.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use orderdesk_shared::constants::CHANGE_FEED_CAPACITY;
use orderdesk_shared::{CollectionKind, DocId, Fields, RemoteError};

use crate::database::Database;
use crate::remote::{ChangeStream, DocumentChange, PageQuery, RemoteCollection, RemoteDocument};

/// Shared SQLite backend for all three collections.
pub struct SqliteStore {
    db: Mutex<Database>,
    feeds: HashMap<CollectionKind, broadcast::Sender<DocumentChange>>,
}

impl SqliteStore {
    pub fn new(db: Database) -> Arc<Self> {
        let feeds = CollectionKind::ALL
            .into_iter()
            .map(|kind| (kind, broadcast::channel(CHANGE_FEED_CAPACITY).0))
            .collect();

        Arc::new(Self {
            db: Mutex::new(db),
            feeds,
        })
    }

    /// Handle to one collection of this store.
    pub fn collection(self: &Arc<Self>, kind: CollectionKind) -> SqliteCollection {
        SqliteCollection {
            store: Arc::clone(self),
            kind,
        }
    }

    fn publish(&self, kind: CollectionKind, change: DocumentChange) {
        if let Some(feed) = self.feeds.get(&kind) {
            // no subscribers is not an error
            let receivers = feed.send(change).unwrap_or(0);
            debug!(collection = %kind, receivers, "published change");
        }
    }
}

#[derive(Clone)]
pub struct SqliteCollection {
    store: Arc<SqliteStore>,
    kind: CollectionKind,
}

#[async_trait]
impl RemoteCollection for SqliteCollection {
    fn kind(&self) -> CollectionKind {
        self.kind
    }

    async fn fetch_page(&self, query: PageQuery) -> Result<Vec<RemoteDocument>, RemoteError> {
        let db = self.store.db.lock().await;
        Ok(db.page_documents(self.kind, &query)?)
    }

    async fn subscribe(&self) -> Result<ChangeStream, RemoteError> {
        let feed = self
            .store
            .feeds
            .get(&self.kind)
            .ok_or_else(|| RemoteError::Unavailable(format!("no feed for {}", self.kind)))?;
        let rx = feed.subscribe();

        let changes = stream::unfold(rx, |mut rx| async move {
            match rx.recv().await {
                Ok(change) => Some((Ok(change), rx)),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    Some((Err(RemoteError::Lagged(missed)), rx))
                }
                Err(broadcast::error::RecvError::Closed) => None,
            }
        });
        Ok(Box::pin(changes))
    }

    async fn add(&self, fields: Fields) -> Result<DocId, RemoteError> {
        let id = DocId::new();
        let db = self.store.db.lock().await;
        let revision = db.insert_document(self.kind, &id, &fields)?;

        self.store.publish(
            self.kind,
            DocumentChange::Added(RemoteDocument {
                id: id.clone(),
                revision,
                fields,
            }),
        );
        Ok(id)
    }

    async fn set(&self, id: &DocId, fields: Fields) -> Result<(), RemoteError> {
        if id.is_empty() {
            return Err(RemoteError::Rejected("empty document id".into()));
        }
        let db = self.store.db.lock().await;
        let written = db.replace_document(self.kind, id, &fields)?;

        let doc = RemoteDocument {
            id: id.clone(),
            revision: written.revision,
            fields,
        };
        let change = if written.existed {
            DocumentChange::Modified(doc)
        } else {
            DocumentChange::Added(doc)
        };
        self.store.publish(self.kind, change);
        Ok(())
    }

    async fn update(&self, id: &DocId, fields: Fields) -> Result<(), RemoteError> {
        let db = self.store.db.lock().await;
        let merged = db.merge_document(self.kind, id, &fields)?;

        self.store.publish(self.kind, DocumentChange::Modified(merged));
        Ok(())
    }

    async fn delete(&self, id: &DocId) -> Result<(), RemoteError> {
        let db = self.store.db.lock().await;
        // deleting a missing document succeeds silently
        if let Some(revision) = db.delete_document(self.kind, id)? {
            self.store.publish(
                self.kind,
                DocumentChange::Removed {
                    id: id.clone(),
                    revision,
                },
            );
        }
        Ok(())
    }

    async fn exists_where(&self, field: &str, value: &str) -> Result<bool, RemoteError> {
        let db = self.store.db.lock().await;
        Ok(db.document_exists_where(self.kind, field, value)?)
    }
}
