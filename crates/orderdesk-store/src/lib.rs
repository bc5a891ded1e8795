//! # orderdesk-store
//!
//! Typed records for customers, products and orders, the remote capabilities
//! the sync engine consumes ([`RemoteCollection`] and [`BlobStore`]), and a
//! local SQLite backend that implements them with an in-process change feed.
//!
//! The SQLite backend stands in for the hosted document database: it assigns
//! identifiers and monotonic revisions, serves cursor-paginated ordered
//! queries, and publishes added/modified/removed notifications to every
//! subscriber of a collection.

pub mod blobs;
pub mod collection;
pub mod database;
pub mod documents;
pub mod migrations;
pub mod models;
pub mod remote;

mod error;
mod lenient;

pub use blobs::{BlobStore, FsBlobStore};
pub use collection::{SqliteCollection, SqliteStore};
pub use database::Database;
pub use error::StoreError;
pub use models::*;
pub use remote::{ChangeStream, DocumentChange, PageQuery, RemoteCollection, RemoteDocument};
