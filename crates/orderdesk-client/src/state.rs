//! Application state shared by every command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use orderdesk_store::{Database, FsBlobStore, SqliteStore};
use orderdesk_sync::{Remotes, SyncEngine};
use tracing::info;

use crate::config::ClientConfig;

/// The running sync engine over the local SQLite store.
pub struct AppState {
    pub engine: SyncEngine,
}

impl AppState {
    /// Open the database and blob directory, then start the engine.
    pub async fn open(config: &ClientConfig) -> anyhow::Result<Self> {
        let db_path = match &config.db_path {
            Some(path) => path.clone(),
            None => Database::default_path()?,
        };
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let db = Database::open_at(&db_path)
            .with_context(|| format!("opening database {}", db_path.display()))?;

        let blob_path = match &config.blob_path {
            Some(path) => path.clone(),
            None => db_path
                .parent()
                .map(|p| p.join("blobs"))
                .unwrap_or_else(|| PathBuf::from("blobs")),
        };
        let blobs = FsBlobStore::new(blob_path, config.sync.max_attachment_size).await?;

        Self::start(Database::path(&db), db, blobs, config).await
    }

    /// In-memory database, for tests.
    #[cfg(test)]
    pub async fn open_in_memory(blob_dir: PathBuf, config: &ClientConfig) -> anyhow::Result<Self> {
        let db = Database::open_in_memory()?;
        let blobs = FsBlobStore::new(blob_dir, config.sync.max_attachment_size).await?;
        Self::start(None, db, blobs, config).await
    }

    async fn start(
        db_path: Option<PathBuf>,
        db: Database,
        blobs: FsBlobStore,
        config: &ClientConfig,
    ) -> anyhow::Result<Self> {
        let store = SqliteStore::new(db);
        let engine = SyncEngine::new(Remotes::sqlite(&store), Arc::new(blobs), config.sync.clone())?;
        engine.start().await?;

        info!(
            db = ?db_path,
            page_size = config.sync.page_size,
            policy = ?config.sync.policy,
            "Application state ready"
        );
        Ok(Self { engine })
    }

    pub async fn close(self) {
        self.engine.shutdown().await;
    }
}
