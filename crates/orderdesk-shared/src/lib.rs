//! Types shared by every orderdesk crate: identifiers, revisions, collection
//! kinds and the error type returned by remote capabilities.

pub mod constants;
pub mod error;
pub mod types;

pub use error::RemoteError;
pub use types::{text_of, CollectionKind, Cursor, DocId, Fields, Revision, SortDirection, SortOrder};
