//! Sync engine configuration.
//!
//! All settings have defaults so an engine can be built with
//! `SyncConfig::default()`; the client binary fills them from the
//! environment.

use std::str::FromStr;
use std::time::Duration;

use orderdesk_shared::constants::{DEFAULT_PAGE_SIZE, MAX_ATTACHMENT_SIZE};

/// How change notifications are folded into a mirror.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReconcilePolicy {
    /// Splice each added/modified/removed document into the mirror in
    /// place. Keeps everything loaded through "load more".
    #[default]
    IncrementalSplice,
    /// Drop the mirror and re-run the first page fetch on every
    /// notification. Pagination depth is lost.
    FullResync,
}

impl FromStr for ReconcilePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "splice" | "incremental" => Ok(Self::IncrementalSplice),
            "resync" | "full" => Ok(Self::FullResync),
            other => Err(format!("unknown reconcile policy: {other}")),
        }
    }
}

/// How deleting a customer checks for referencing orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteGuard {
    /// Inspect only the orders currently loaded in the mirror.
    #[default]
    LoadedWindow,
    /// Inspect the loaded orders, then ask the remote orders collection.
    RemoteCheck,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Documents per page for the initial load and each "load more".
    pub page_size: usize,

    pub policy: ReconcilePolicy,

    /// Periodic full resync. Only honoured under
    /// [`ReconcilePolicy::FullResync`].
    pub resync_interval: Option<Duration>,

    pub delete_guard: DeleteGuard,

    /// Largest attachment accepted for upload, in bytes.
    pub max_attachment_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            policy: ReconcilePolicy::default(),
            resync_interval: None,
            delete_guard: DeleteGuard::default(),
            max_attachment_size: MAX_ATTACHMENT_SIZE,
        }
    }
}

impl SyncConfig {
    /// Page size actually used; a zero page size would never make progress.
    pub fn effective_page_size(&self) -> usize {
        self.page_size.max(1)
    }
}
