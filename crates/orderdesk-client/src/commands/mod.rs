//! Command handlers.
//!
//! Each sub-module groups the commands of one collection. Handlers print a
//! projection of the mirror to stdout; diagnostics go through `tracing`.

pub mod customers;
pub mod orders;
pub mod products;
pub mod watch;

use std::time::Duration;

use orderdesk_shared::{CollectionKind, DocId};
use orderdesk_store::Entity;
use orderdesk_sync::{CollectionSync, LoadOutcome, SyncEngine};
use tracing::debug;

const BUSY_RETRY: Duration = Duration::from_millis(10);

/// Load up to `pages` pages in total (the first one is already loaded).
/// A fetch already in flight is waited out rather than counted.
pub async fn load_pages(
    engine: &SyncEngine,
    collection: CollectionKind,
    pages: usize,
) -> anyhow::Result<()> {
    let mut loaded = 1;
    while loaded < pages {
        match engine.load_more(collection).await? {
            LoadOutcome::Loaded { fetched, has_more } => {
                loaded += 1;
                debug!(%collection, fetched, has_more, "Loaded page");
                if !has_more {
                    break;
                }
            }
            LoadOutcome::Exhausted => break,
            LoadOutcome::Busy => tokio::time::sleep(BUSY_RETRY).await,
        }
    }
    Ok(())
}

/// Expand an id prefix to the single loaded document it matches. Anything
/// else is taken as a full id.
pub fn resolve_id<T: Entity>(collection: &CollectionSync<T>, input: &str) -> DocId {
    let input = input.trim();
    let matches: Vec<DocId> = collection.with_mirror(|mirror| {
        mirror
            .iter()
            .map(|record| record.id())
            .filter(|id| id.as_str().starts_with(input))
            .take(2)
            .cloned()
            .collect()
    });

    match matches.as_slice() {
        [only] if !input.is_empty() => only.clone(),
        _ => DocId::from(input),
    }
}

/// Footer telling whether more documents exist beyond those printed.
pub fn footer(engine: &SyncEngine, collection: CollectionKind, shown: usize) -> String {
    if engine.has_more(collection) {
        format!("{shown} shown, more available (use --pages)")
    } else {
        format!("{shown} shown")
    }
}
