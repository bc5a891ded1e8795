//! Notifications from the sync engine to whatever renders the collections.

use std::sync::Arc;

use orderdesk_shared::constants::VIEW_EVENT_CAPACITY;
use orderdesk_shared::CollectionKind;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ViewEvent {
    /// A collection's mirror changed. `active` tells whether it is the
    /// collection currently on screen.
    Changed {
        collection: CollectionKind,
        active: bool,
    },
    /// A user-visible message: failed fetches, failed saves, refused deletes.
    Notice(String),
}

/// Fan-out of [`ViewEvent`]s plus the currently active view.
///
/// Sending never blocks; with no subscriber the event is dropped.
#[derive(Debug, Clone)]
pub struct ViewBus {
    tx: broadcast::Sender<ViewEvent>,
    active: Arc<RwLock<CollectionKind>>,
}

impl Default for ViewBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(VIEW_EVENT_CAPACITY);
        Self {
            tx,
            active: Arc::new(RwLock::new(CollectionKind::Orders)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.tx.subscribe()
    }

    pub fn active(&self) -> CollectionKind {
        *self.active.read()
    }

    /// Switch the active view and ask the renderer to draw it.
    pub fn set_active(&self, collection: CollectionKind) {
        *self.active.write() = collection;
        self.emit(ViewEvent::Changed {
            collection,
            active: true,
        });
    }

    pub fn changed(&self, collection: CollectionKind) {
        let active = self.active() == collection;
        self.emit(ViewEvent::Changed { collection, active });
    }

    pub fn notice(&self, message: impl Into<String>) {
        self.emit(ViewEvent::Notice(message.into()));
    }

    fn emit(&self, event: ViewEvent) {
        if self.tx.send(event).is_err() {
            trace!("No view subscribers");
        }
    }
}
