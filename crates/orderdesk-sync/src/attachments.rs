//! Receipt photos and PDFs attached to orders.

use std::path::Path;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use orderdesk_shared::constants::ATTACHMENT_PREFIX;
use orderdesk_store::BlobStore;
use tracing::info;

use crate::error::{Result, SyncError};

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "webp", "heic"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Pdf,
}

impl AttachmentKind {
    /// Kind by file extension; `None` for anything that is neither an image
    /// nor a PDF.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        if ext == "pdf" {
            Some(Self::Pdf)
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else {
            None
        }
    }
}

/// A file picked for upload.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Bytes,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn kind(&self) -> Option<AttachmentKind> {
        AttachmentKind::from_file_name(&self.file_name)
    }

    fn validate(&self, max_size: usize) -> Result<AttachmentKind> {
        let kind = self.kind().ok_or_else(|| {
            SyncError::Attachment(format!(
                "{} is not an image or PDF",
                self.file_name
            ))
        })?;
        if self.bytes.is_empty() {
            return Err(SyncError::Attachment(format!("{} is empty", self.file_name)));
        }
        if self.bytes.len() > max_size {
            return Err(SyncError::Attachment(format!(
                "{} is {} bytes, limit is {max_size}",
                self.file_name,
                self.bytes.len()
            )));
        }
        Ok(kind)
    }
}

/// Blob path of an attachment uploaded at `now`.
pub fn attachment_path(file_name: &str, now: DateTime<Utc>) -> String {
    format!(
        "{ATTACHMENT_PREFIX}/{}_{}",
        now.timestamp_millis(),
        sanitize_file_name(file_name)
    )
}

/// Keep the final path component, replacing anything outside
/// `[A-Za-z0-9._-]` with `_`.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Whether a stored attachment URL points at a PDF (preview as a link rather
/// than an image).
pub fn is_pdf_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.to_ascii_lowercase().ends_with(".pdf")
}

/// Validate, upload and resolve the URL of `attachment`.
pub(crate) async fn upload(
    blobs: &dyn BlobStore,
    attachment: &Attachment,
    max_size: usize,
    now: DateTime<Utc>,
) -> Result<String> {
    let kind = attachment.validate(max_size)?;
    let path = attachment_path(&attachment.file_name, now);

    blobs
        .upload(&path, &attachment.bytes)
        .await
        .map_err(|source| SyncError::Remote {
            action: "upload attachment",
            source,
        })?;
    let url = blobs.url(&path).await.map_err(|source| SyncError::Remote {
        action: "resolve attachment URL",
        source,
    })?;

    info!(path = %path, ?kind, size = attachment.bytes.len(), "Attachment uploaded");
    Ok(url)
}
