//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so the binary runs with zero configuration
//! against the per-user data directory.

use std::path::PathBuf;
use std::time::Duration;

use orderdesk_sync::{DeleteGuard, ReconcilePolicy, SyncConfig};

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// SQLite database file.
    /// Env: `ORDERDESK_DB_PATH`
    /// Default: `orderdesk.db` in the platform data directory.
    pub db_path: Option<PathBuf>,

    /// Directory receiving uploaded attachments.
    /// Env: `ORDERDESK_BLOB_PATH`
    /// Default: `blobs/` next to the database file.
    pub blob_path: Option<PathBuf>,

    /// Sync engine settings.
    /// Env: `ORDERDESK_PAGE_SIZE`, `ORDERDESK_SYNC_POLICY` (splice/resync),
    /// `ORDERDESK_RESYNC_SECS`, `ORDERDESK_STRICT_DELETE` (true/false),
    /// `ORDERDESK_MAX_ATTACHMENT` (bytes).
    pub sync: SyncConfig,
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = var("ORDERDESK_DB_PATH").filter(|p| !p.is_empty()) {
            config.db_path = Some(PathBuf::from(path));
        }

        if let Some(path) = var("ORDERDESK_BLOB_PATH").filter(|p| !p.is_empty()) {
            config.blob_path = Some(PathBuf::from(path));
        }

        if let Some(val) = var("ORDERDESK_PAGE_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.sync.page_size = n,
                _ => tracing::warn!(value = %val, "Invalid ORDERDESK_PAGE_SIZE, using default"),
            }
        }

        if let Some(val) = var("ORDERDESK_SYNC_POLICY") {
            match val.parse::<ReconcilePolicy>() {
                Ok(policy) => config.sync.policy = policy,
                Err(e) => tracing::warn!(error = %e, "Invalid ORDERDESK_SYNC_POLICY, using default"),
            }
        }

        if let Some(val) = var("ORDERDESK_RESYNC_SECS") {
            match val.parse::<u64>() {
                Ok(0) => config.sync.resync_interval = None,
                Ok(secs) => config.sync.resync_interval = Some(Duration::from_secs(secs)),
                Err(_) => tracing::warn!(value = %val, "Invalid ORDERDESK_RESYNC_SECS, ignoring"),
            }
        }

        if let Some(val) = var("ORDERDESK_STRICT_DELETE") {
            config.sync.delete_guard = if val != "false" && val != "0" {
                DeleteGuard::RemoteCheck
            } else {
                DeleteGuard::LoadedWindow
            };
        }

        if let Some(val) = var("ORDERDESK_MAX_ATTACHMENT") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.sync.max_attachment_size = n,
                _ => tracing::warn!(value = %val, "Invalid ORDERDESK_MAX_ATTACHMENT, using default"),
            }
        }

        config
    }
}
