use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use orderdesk_shared::RemoteError;

use crate::error::{Result, StoreError};

/// Blob store capability used for order attachments.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: &[u8]) -> std::result::Result<(), RemoteError>;

    /// Public URL under which an uploaded blob can be viewed.
    async fn url(&self, path: &str) -> std::result::Result<String, RemoteError>;
}

/// Resolve a relative blob path under `base`, rejecting anything that could
/// escape it.
fn ensure_within(base: &Path, relative: &str) -> Result<PathBuf> {
    if relative.is_empty() || relative.contains('\\') {
        return Err(StoreError::PathTraversal(relative.to_string()));
    }

    let mut resolved = base.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(c) => resolved.push(c),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(StoreError::PathTraversal(relative.to_string()));
            }
        }
    }

    if resolved == base {
        return Err(StoreError::PathTraversal(relative.to_string()));
    }
    Ok(resolved)
}

/// Blob store writing files below a base directory and handing out
/// `file://` URLs.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    base_path: PathBuf,
    max_size: usize,
}

impl FsBlobStore {
    pub async fn new(base_path: PathBuf, max_size: usize) -> Result<Self> {
        fs::create_dir_all(&base_path).await?;
        let base_path = base_path.canonicalize().unwrap_or(base_path);

        info!(path = %base_path.display(), "Blob store initialized");

        Ok(Self {
            base_path,
            max_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub async fn store(&self, path: &str, data: &[u8]) -> Result<PathBuf> {
        if data.is_empty() {
            return Err(StoreError::EmptyBlob);
        }
        if data.len() > self.max_size {
            return Err(StoreError::BlobTooLarge {
                size: data.len(),
                max: self.max_size,
            });
        }

        let target = ensure_within(&self.base_path, path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, data).await?;

        debug!(path, size = data.len(), "Stored blob");
        Ok(target)
    }

    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let target = ensure_within(&self.base_path, path)?;
        Ok(fs::read(&target).await?)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, path: &str, bytes: &[u8]) -> std::result::Result<(), RemoteError> {
        self.store(path, bytes).await?;
        Ok(())
    }

    async fn url(&self, path: &str) -> std::result::Result<String, RemoteError> {
        let target = ensure_within(&self.base_path, path)?;
        if !fs::try_exists(&target).await.unwrap_or(false) {
            return Err(RemoteError::Rejected(format!("no blob at {path}")));
        }
        Ok(format!("file://{}", target.display()))
    }
}
