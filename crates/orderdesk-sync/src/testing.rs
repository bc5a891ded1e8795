//! In-memory remote collection and blob store for unit tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use orderdesk_shared::{CollectionKind, DocId, Fields, RemoteError, Revision};
use orderdesk_store::{
    BlobStore, ChangeStream, DocumentChange, PageQuery, RemoteCollection, RemoteDocument,
};
use parking_lot::Mutex;
use tokio::sync::{broadcast, Notify};

/// Poll `check` until it holds, failing the test after about a second.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

pub fn fields(value: serde_json::Value) -> Fields {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Fetch(PageQuery),
    Add,
    Set(DocId),
    Update(DocId, Fields),
    Delete(DocId),
    ExistsWhere(String, String),
}

/// Stalls page fetches between computing the page and returning it.
#[derive(Default)]
pub struct FetchGate {
    pub started: Notify,
    pub release: Notify,
}

#[derive(Default)]
struct MockState {
    docs: BTreeMap<DocId, (Revision, Fields)>,
    revision: Revision,
    calls: Vec<Call>,
    failing_fetches: usize,
    failing_writes: bool,
    gate: Option<Arc<FetchGate>>,
}

pub struct MockRemote {
    kind: CollectionKind,
    state: Mutex<MockState>,
    feed: broadcast::Sender<DocumentChange>,
}

impl MockRemote {
    pub fn new(kind: CollectionKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            state: Mutex::new(MockState::default()),
            feed: broadcast::channel(64).0,
        })
    }

    /// Write a document as another client would, notifying subscribers.
    pub fn put(&self, id: &str, fields: Fields) -> Revision {
        self.write(DocId::from(id), fields)
    }

    /// Delete a document as another client would.
    pub fn remove(&self, id: &str) -> Revision {
        let mut state = self.state.lock();
        state.revision = state.revision.next();
        let revision = state.revision;
        state.docs.remove(&DocId::from(id));
        let _ = self.feed.send(DocumentChange::Removed {
            id: DocId::from(id),
            revision,
        });
        revision
    }

    pub fn doc(&self, id: &DocId) -> Option<Fields> {
        self.state.lock().docs.get(id).map(|(_, f)| f.clone())
    }

    pub fn doc_count(&self) -> usize {
        self.state.lock().docs.len()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.count(|c| matches!(c, Call::Fetch(_)))
    }

    pub fn delete_count(&self) -> usize {
        self.count(|c| matches!(c, Call::Delete(_)))
    }

    pub fn write_count(&self) -> usize {
        self.count(|c| matches!(c, Call::Add | Call::Set(_) | Call::Update(..)))
    }

    pub fn fail_next_fetches(&self, n: usize) {
        self.state.lock().failing_fetches = n;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().failing_writes = fail;
    }

    /// Every fetch from now on signals `started` and waits for `release`.
    pub fn hold_fetches(&self) -> Arc<FetchGate> {
        let gate = Arc::new(FetchGate::default());
        self.state.lock().gate = Some(gate.clone());
        gate
    }

    /// Stop stalling fetches issued from now on.
    pub fn release_fetches(&self) {
        self.state.lock().gate = None;
    }

    fn count(&self, f: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| f(c)).count()
    }

    fn write(&self, id: DocId, fields: Fields) -> Revision {
        let mut state = self.state.lock();
        state.revision = state.revision.next();
        let revision = state.revision;
        let existed = state
            .docs
            .insert(id.clone(), (revision, fields.clone()))
            .is_some();
        let doc = RemoteDocument {
            id,
            revision,
            fields,
        };
        let change = if existed {
            DocumentChange::Modified(doc)
        } else {
            DocumentChange::Added(doc)
        };
        let _ = self.feed.send(change);
        revision
    }

    fn record_write(&self, call: Call) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        state.calls.push(call);
        if state.failing_writes {
            return Err(RemoteError::Unavailable("mock offline".into()));
        }
        Ok(())
    }

    fn page(&self, query: &PageQuery) -> Result<Vec<RemoteDocument>, RemoteError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Fetch(query.clone()));
        if state.failing_fetches > 0 {
            state.failing_fetches -= 1;
            return Err(RemoteError::Unavailable("mock offline".into()));
        }

        let order = query.order;
        let mut docs: Vec<RemoteDocument> = state
            .docs
            .iter()
            .map(|(id, (revision, fields))| RemoteDocument {
                id: id.clone(),
                revision: *revision,
                fields: fields.clone(),
            })
            .collect();
        docs.sort_by(|a, b| {
            order.compare(&order.value_of(&a.fields), &a.id, &order.value_of(&b.fields), &b.id)
        });
        Ok(docs
            .into_iter()
            .filter(|d| match &query.start_after {
                Some(cursor) => cursor.is_before(&order, &order.value_of(&d.fields), &d.id),
                None => true,
            })
            .take(query.limit)
            .collect())
    }
}

#[async_trait]
impl RemoteCollection for MockRemote {
    fn kind(&self) -> CollectionKind {
        self.kind
    }

    async fn fetch_page(&self, query: PageQuery) -> Result<Vec<RemoteDocument>, RemoteError> {
        let page = self.page(&query)?;
        let gate = self.state.lock().gate.clone();
        if let Some(gate) = gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }
        Ok(page)
    }

    async fn subscribe(&self) -> Result<ChangeStream, RemoteError> {
        let rx = self.feed.subscribe();
        let changes = stream::unfold(rx, |mut rx| async move {
            match rx.recv().await {
                Ok(change) => Some((Ok(change), rx)),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    Some((Err(RemoteError::Lagged(n)), rx))
                }
                Err(broadcast::error::RecvError::Closed) => None,
            }
        });
        Ok(Box::pin(changes))
    }

    async fn add(&self, fields: Fields) -> Result<DocId, RemoteError> {
        self.record_write(Call::Add)?;
        let id = DocId::new();
        self.write(id.clone(), fields);
        Ok(id)
    }

    async fn set(&self, id: &DocId, fields: Fields) -> Result<(), RemoteError> {
        self.record_write(Call::Set(id.clone()))?;
        self.write(id.clone(), fields);
        Ok(())
    }

    async fn update(&self, id: &DocId, fields: Fields) -> Result<(), RemoteError> {
        self.record_write(Call::Update(id.clone(), fields.clone()))?;
        let mut merged = self
            .doc(id)
            .ok_or_else(|| RemoteError::NotFound(id.clone()))?;
        merged.extend(fields);
        self.write(id.clone(), merged);
        Ok(())
    }

    async fn delete(&self, id: &DocId) -> Result<(), RemoteError> {
        self.record_write(Call::Delete(id.clone()))?;
        if self.doc(id).is_some() {
            self.remove(id.as_str());
        }
        Ok(())
    }

    async fn exists_where(&self, field: &str, value: &str) -> Result<bool, RemoteError> {
        let mut state = self.state.lock();
        state
            .calls
            .push(Call::ExistsWhere(field.to_string(), value.to_string()));
        Ok(state
            .docs
            .values()
            .any(|(_, f)| f.get(field).and_then(|v| v.as_str()) == Some(value)))
    }
}

#[derive(Default)]
pub struct MemoryBlobs {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    failing: Mutex<bool>,
}

impl MemoryBlobs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.blobs.lock().keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn fail_uploads(&self, fail: bool) {
        *self.failing.lock() = fail;
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<(), RemoteError> {
        if *self.failing.lock() {
            return Err(RemoteError::Unavailable("blob store offline".into()));
        }
        self.blobs.lock().insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn url(&self, path: &str) -> Result<String, RemoteError> {
        if self.blobs.lock().contains_key(path) {
            Ok(format!("mem://{path}"))
        } else {
            Err(RemoteError::NotFound(DocId::from(path)))
        }
    }
}
