//! # orderdesk-sync
//!
//! Client-side reconciliation of the customers, products and orders
//! collections against a remote document store.
//!
//! Each collection is mirrored by a [`CollectionSync`]: an ordered,
//! de-duplicated [`LocalMirror`] filled by cursor-paginated fetches
//! ([`PageState`]) and kept current by a long-lived change subscription.
//! Merges are keyed by document id and ordered by the store's write
//! revision, so the mirror converges no matter in which order page responses
//! and notifications arrive.
//!
//! [`SyncEngine`] owns the three collections, the order filter, the
//! customer delete guard and every mutation, and broadcasts [`ViewEvent`]s to
//! whatever renders the data.

pub mod attachments;
pub mod collection;
pub mod config;
pub mod drafts;
pub mod engine;
pub mod events;
pub mod filter;
pub mod mirror;
pub mod page;

mod error;

#[cfg(test)]
mod testing;

pub use attachments::{Attachment, AttachmentKind};
pub use collection::{CollectionSync, LoadOutcome};
pub use config::{DeleteGuard, ReconcilePolicy, SyncConfig};
pub use drafts::{CustomerDraft, LineItemDraft, OrderDraft, ProductDraft};
pub use engine::{Remotes, SyncEngine};
pub use error::{Result, SyncError};
pub use events::{ViewBus, ViewEvent};
pub use filter::OrderFilter;
pub use mirror::{LocalMirror, MergeOutcome};
pub use page::PageState;
