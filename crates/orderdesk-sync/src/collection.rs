//! Synchronisation of one remote collection into a [`LocalMirror`].
//!
//! A [`CollectionSync`] owns the mirror and the page state of one
//! collection. Page fetches are serialised per collection by an async lock;
//! the mirror itself sits behind a short synchronous lock that is never held
//! across an await. Change notifications are consumed by a background pump
//! task (see [`CollectionSync::spawn_pump`]).

use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use orderdesk_shared::{CollectionKind, DocId, RemoteError, Revision};
use orderdesk_store::{ChangeStream, DocumentChange, Entity, PageQuery, RemoteCollection};
use parking_lot::Mutex;
use tokio::sync::{watch, Mutex as TokioMutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::config::ReconcilePolicy;
use crate::error::{Result, SyncError};
use crate::events::ViewBus;
use crate::mirror::LocalMirror;
use crate::page::PageState;

/// Result of a "load more" request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { fetched: usize, has_more: bool },
    /// Another fetch of this collection is in flight; nothing was issued.
    Busy,
    /// The last page was short; nothing was issued.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchMode {
    /// Next page after the cursor, merged.
    Next,
    /// First page, merged into what is loaded.
    First,
    /// First page, replacing the mirror.
    Replace,
}

struct SyncState<T: Entity> {
    mirror: LocalMirror<T>,
    page: PageState,
}

pub struct CollectionSync<T: Entity> {
    remote: Arc<dyn RemoteCollection>,
    state: Mutex<SyncState<T>>,
    fetch_lock: TokioMutex<()>,
    bus: ViewBus,
    policy: ReconcilePolicy,
}

impl<T: Entity> CollectionSync<T> {
    pub fn new(
        remote: Arc<dyn RemoteCollection>,
        page_size: usize,
        policy: ReconcilePolicy,
        bus: ViewBus,
    ) -> Result<Self> {
        if remote.kind() != T::KIND {
            return Err(SyncError::CollectionMismatch {
                expected: T::KIND,
                actual: remote.kind(),
            });
        }

        Ok(Self {
            remote,
            state: Mutex::new(SyncState {
                mirror: LocalMirror::new(),
                page: PageState::new(page_size),
            }),
            fetch_lock: TokioMutex::new(()),
            bus,
            policy,
        })
    }

    pub fn kind(&self) -> CollectionKind {
        T::KIND
    }

    pub fn policy(&self) -> ReconcilePolicy {
        self.policy
    }

    pub fn remote(&self) -> &Arc<dyn RemoteCollection> {
        &self.remote
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn snapshot(&self) -> Vec<T> {
        self.state.lock().mirror.snapshot()
    }

    pub fn get(&self, id: &DocId) -> Option<T> {
        self.state.lock().mirror.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().mirror.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_more(&self) -> bool {
        self.state.lock().page.has_more()
    }

    pub fn page_state(&self) -> PageState {
        self.state.lock().page.clone()
    }

    /// Run `f` against the mirror without copying it. `f` must not block.
    pub fn with_mirror<R>(&self, f: impl FnOnce(&LocalMirror<T>) -> R) -> R {
        f(&self.state.lock().mirror)
    }

    // -----------------------------------------------------------------------
    // Fetches
    // -----------------------------------------------------------------------

    /// Open the change subscription. Call before the first fetch so that no
    /// write between the fetch and the subscription is missed.
    pub async fn subscribe(&self) -> Result<ChangeStream> {
        self.remote
            .subscribe()
            .await
            .map_err(|source| self.fetch_failed("subscribe", source))
    }

    /// Fetch the first page and merge it into the mirror. Waits for any fetch
    /// already in flight.
    pub async fn load_first(&self) -> Result<usize> {
        let _guard = self.fetch_lock.lock().await;
        self.fetch(FetchMode::First).await
    }

    /// Fetch the page after the cursor, unless a fetch is already running or
    /// the collection is exhausted.
    pub async fn load_more(&self) -> Result<LoadOutcome> {
        let Ok(_guard) = self.fetch_lock.try_lock() else {
            debug!(collection = %T::KIND, "load more ignored, fetch in flight");
            return Ok(LoadOutcome::Busy);
        };

        if !self.state.lock().page.can_load_more() {
            return Ok(LoadOutcome::Exhausted);
        }

        let fetched = self.fetch(FetchMode::Next).await?;
        Ok(LoadOutcome::Loaded {
            fetched,
            has_more: self.has_more(),
        })
    }

    /// Drop the mirror and reload the first page. Waits for any fetch already
    /// in flight. Documents loaded beyond the first page are gone afterwards.
    pub async fn resync(&self) -> Result<usize> {
        let _guard = self.fetch_lock.lock().await;
        self.fetch(FetchMode::Replace).await
    }

    /// Caller holds `fetch_lock`.
    async fn fetch(&self, mode: FetchMode) -> Result<usize> {
        let (query, seen) = self.query(mode);
        debug!(collection = %T::KIND, ?mode, after = ?query.start_after, "fetching page");

        let page = match self.remote.fetch_page(query.clone()).await {
            Ok(page) => page,
            Err(source) => return Err(self.fetch_failed("load", source)),
        };

        let summary = {
            let mut state = self.state.lock();
            if mode == FetchMode::Replace {
                state.mirror.clear();
            }
            let summary = state.mirror.merge_page(&page);
            state.page.record(&query, &page);
            let pruned = state.mirror.prune_tombstones(seen);
            if pruned > 0 {
                trace!(collection = %T::KIND, pruned, "tombstones pruned");
            }
            summary
        };

        debug!(
            collection = %T::KIND,
            fetched = page.len(),
            inserted = summary.inserted,
            replaced = summary.replaced,
            skipped = summary.skipped,
            "page merged"
        );
        if summary.changed() || mode == FetchMode::Replace {
            self.bus.changed(T::KIND);
        }
        Ok(page.len())
    }

    /// The next page query and the mirror's high water mark at this point.
    fn query(&self, mode: FetchMode) -> (PageQuery, Revision) {
        let state = self.state.lock();
        let query = state.page.query(T::KIND, mode != FetchMode::Next);
        (query, state.mirror.high_water())
    }

    fn fetch_failed(&self, action: &str, source: RemoteError) -> SyncError {
        warn!(collection = %T::KIND, error = %source, "Failed to {action} collection");
        self.bus
            .notice(format!("Could not {action} {}: {source}", T::KIND));
        SyncError::TransientFetch {
            collection: T::KIND,
            source,
        }
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    /// Splice one notification into the mirror.
    pub fn apply_change(&self, change: &DocumentChange) -> bool {
        let outcome = self.state.lock().mirror.apply(change);
        trace!(collection = %T::KIND, id = %change.id(), ?outcome, "change applied");
        if outcome.changed() {
            self.bus.changed(T::KIND);
        }
        outcome.changed()
    }

    /// Consume `changes` in a background task until the stream ends or
    /// `shutdown` flips to true.
    ///
    /// Under [`ReconcilePolicy::FullResync`] every burst of notifications
    /// triggers one resync, and `resync_every` adds a periodic one.
    pub fn spawn_pump(
        self: Arc<Self>,
        changes: ChangeStream,
        mut shutdown: watch::Receiver<bool>,
        resync_every: Option<Duration>,
    ) -> JoinHandle<()> {
        let mut ticker = match self.policy {
            ReconcilePolicy::FullResync => resync_every.map(|period| {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                ticker
            }),
            ReconcilePolicy::IncrementalSplice => None,
        };

        tokio::spawn(async move {
            let mut changes = changes.fuse();
            info!(collection = %T::KIND, policy = ?self.policy, "Change pump started");

            loop {
                tokio::select! {
                    res = shutdown.changed() => {
                        if res.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = tick(&mut ticker) => {
                        debug!(collection = %T::KIND, "periodic resync");
                        let _ = self.resync().await;
                    }
                    next = changes.next() => {
                        match next {
                            Some(Ok(change)) => {
                                let open = self.on_change(change, &mut changes).await;
                                if !open {
                                    break;
                                }
                            }
                            Some(Err(RemoteError::Lagged(missed))) => {
                                warn!(collection = %T::KIND, missed, "Change feed lagged, resyncing");
                                let _ = self.resync().await;
                            }
                            Some(Err(e)) => {
                                warn!(collection = %T::KIND, error = %e, "Change feed error");
                                self.bus.notice(format!("Live updates for {} failed: {e}", T::KIND));
                            }
                            None => {
                                info!(collection = %T::KIND, "Change feed closed");
                                break;
                            }
                        }
                    }
                }
            }

            info!(collection = %T::KIND, "Change pump stopped");
        })
    }

    /// Returns false once the stream has ended.
    async fn on_change(
        &self,
        change: DocumentChange,
        changes: &mut futures::stream::Fuse<ChangeStream>,
    ) -> bool {
        match self.policy {
            ReconcilePolicy::IncrementalSplice => {
                self.apply_change(&change);
                true
            }
            ReconcilePolicy::FullResync => {
                // coalesce whatever is already queued into a single resync
                let mut coalesced = 1usize;
                let mut open = true;
                while let Some(next) = changes.next().now_or_never() {
                    match next {
                        Some(_) => coalesced += 1,
                        None => {
                            open = false;
                            break;
                        }
                    }
                }
                debug!(collection = %T::KIND, coalesced, "resyncing after notifications");
                let _ = self.resync().await;
                open
            }
        }
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
