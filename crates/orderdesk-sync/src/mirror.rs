//! In-memory ordered mirror of one remote collection.
//!
//! Entries are kept sorted by the collection's ordering and keyed by
//! document id. Every merge compares revisions, so applying the same change
//! twice, or applying changes out of order, converges on the newest write.
//! Removals leave a tombstone so that a page fetched before the removal
//! cannot bring the document back. Once a page requested after the removal
//! has been merged the tombstone is no longer needed and is pruned (see
//! [`LocalMirror::prune_tombstones`]).

use std::cmp::Ordering;
use std::collections::HashMap;

use orderdesk_shared::{DocId, Revision, SortOrder};
use orderdesk_store::{DocumentChange, Entity, RemoteDocument};
use tracing::warn;

/// What a single merge did to the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    /// Replaced in place.
    Replaced,
    /// Replaced and re-positioned because its sort value changed.
    Moved,
    Removed,
    /// Same revision already applied, or nothing to remove.
    Unchanged,
    /// Older than what the mirror already knows.
    Stale,
    /// The document could not be decoded.
    Rejected,
}

impl MergeOutcome {
    pub fn changed(&self) -> bool {
        matches!(
            self,
            Self::Inserted | Self::Replaced | Self::Moved | Self::Removed
        )
    }
}

/// Tally of a page merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub inserted: usize,
    pub replaced: usize,
    pub skipped: usize,
}

impl MergeSummary {
    pub fn changed(&self) -> bool {
        self.inserted + self.replaced > 0
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    record: T,
    revision: Revision,
}

#[derive(Debug, Clone)]
pub struct LocalMirror<T: Entity> {
    entries: Vec<Entry<T>>,
    tombstones: HashMap<DocId, Revision>,
    /// Highest revision merged or removed so far.
    high_water: Revision,
    order: SortOrder,
}

impl<T: Entity> Default for LocalMirror<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> LocalMirror<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            tombstones: HashMap::new(),
            high_water: Revision::ZERO,
            order: T::KIND.sort_order(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.iter().map(|e| &e.record)
    }

    /// Ordered copy of the records.
    pub fn snapshot(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    pub fn get(&self, id: &DocId) -> Option<&T> {
        self.position(id).map(|i| &self.entries[i].record)
    }

    pub fn contains(&self, id: &DocId) -> bool {
        self.position(id).is_some()
    }

    pub fn revision_of(&self, id: &DocId) -> Option<Revision> {
        self.position(id).map(|i| self.entries[i].revision)
    }

    /// Number of removals remembered.
    pub fn tombstone_count(&self) -> usize {
        self.tombstones.len()
    }

    /// Highest revision the mirror has seen, from pages and notifications.
    pub fn high_water(&self) -> Revision {
        self.high_water
    }

    /// Forget removals at or below `seen`, the high water mark taken when a
    /// page was requested, once that page has been merged. The store had
    /// already applied those removals when it served the page, and the
    /// change feed delivers writes in order, so nothing older can arrive
    /// afterwards. Returns how many tombstones were dropped.
    pub fn prune_tombstones(&mut self, seen: Revision) -> usize {
        let before = self.tombstones.len();
        self.tombstones.retain(|_, removed_at| *removed_at > seen);
        before - self.tombstones.len()
    }

    /// Insert or replace `record` if `revision` is newer than anything the
    /// mirror has seen for its id.
    pub fn upsert(&mut self, record: T, revision: Revision) -> MergeOutcome {
        let id = record.id().clone();
        self.high_water = self.high_water.max(revision);

        if let Some(&removed_at) = self.tombstones.get(&id) {
            if revision <= removed_at {
                return MergeOutcome::Stale;
            }
            self.tombstones.remove(&id);
        }

        let Some(index) = self.position(&id) else {
            self.insert_sorted(Entry { record, revision });
            return MergeOutcome::Inserted;
        };

        let existing = &self.entries[index];
        match revision.cmp(&existing.revision) {
            Ordering::Less => MergeOutcome::Stale,
            Ordering::Equal => MergeOutcome::Unchanged,
            Ordering::Greater if existing.record.sort_value() == record.sort_value() => {
                self.entries[index] = Entry { record, revision };
                MergeOutcome::Replaced
            }
            Ordering::Greater => {
                self.entries.remove(index);
                self.insert_sorted(Entry { record, revision });
                MergeOutcome::Moved
            }
        }
    }

    /// Remove `id` unless the mirror holds a write newer than `revision`.
    pub fn remove(&mut self, id: &DocId, revision: Revision) -> MergeOutcome {
        self.high_water = self.high_water.max(revision);
        let removed_at = self.tombstones.entry(id.clone()).or_insert(revision);
        if *removed_at < revision {
            *removed_at = revision;
        }

        match self.position(id) {
            Some(index) if self.entries[index].revision > revision => MergeOutcome::Stale,
            Some(index) => {
                self.entries.remove(index);
                MergeOutcome::Removed
            }
            None => MergeOutcome::Unchanged,
        }
    }

    /// Decode and merge one remote document.
    pub fn merge_document(&mut self, doc: &RemoteDocument) -> MergeOutcome {
        match T::from_fields(doc.id.clone(), &doc.fields) {
            Ok(record) => self.upsert(record, doc.revision),
            Err(e) => {
                warn!(
                    collection = %T::KIND,
                    id = %doc.id,
                    error = %e,
                    "skipping malformed document"
                );
                MergeOutcome::Rejected
            }
        }
    }

    /// Merge one change notification.
    pub fn apply(&mut self, change: &DocumentChange) -> MergeOutcome {
        match change {
            DocumentChange::Added(doc) | DocumentChange::Modified(doc) => self.merge_document(doc),
            DocumentChange::Removed { id, revision } => self.remove(id, *revision),
        }
    }

    /// Merge a fetched page.
    pub fn merge_page(&mut self, page: &[RemoteDocument]) -> MergeSummary {
        let mut summary = MergeSummary::default();
        for doc in page {
            match self.merge_document(doc) {
                MergeOutcome::Inserted => summary.inserted += 1,
                MergeOutcome::Replaced | MergeOutcome::Moved => summary.replaced += 1,
                _ => summary.skipped += 1,
            }
        }
        summary
    }

    /// Drop every entry but keep the tombstones.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn position(&self, id: &DocId) -> Option<usize> {
        self.entries.iter().position(|e| e.record.id() == id)
    }

    fn insert_sorted(&mut self, entry: Entry<T>) {
        let (value, id) = (entry.record.sort_value(), entry.record.id());
        let at = self.entries.partition_point(|e| {
            self.order
                .compare(e.record.sort_value(), e.record.id(), value, id)
                == Ordering::Less
        });
        self.entries.insert(at, entry);
    }
}

#[cfg(test)]
mod tests {
    use orderdesk_shared::Fields;
    use orderdesk_store::{Customer, Order};
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    fn customer(id: &str, name: &str) -> Customer {
        Customer {
            id: DocId::from(id),
            name: name.into(),
            ..Customer::default()
        }
    }

    fn names(mirror: &LocalMirror<Customer>) -> Vec<String> {
        mirror.iter().map(|c| c.name.clone()).collect()
    }

    #[test]
    fn test_insert_keeps_sort_order() {
        let mut mirror = LocalMirror::new();
        mirror.upsert(customer("3", "Carla"), Revision(1));
        mirror.upsert(customer("1", "Ana"), Revision(2));
        mirror.upsert(customer("2", "Bruno"), Revision(3));

        assert_eq!(names(&mirror), vec!["Ana", "Bruno", "Carla"]);
    }

    #[test]
    fn test_orders_sort_newest_first() {
        let mut mirror = LocalMirror::<Order>::new();
        for (id, date) in [("a", "2024-01-01T08:00"), ("b", "2024-01-03T08:00"), ("c", "2024-01-02T08:00")] {
            let order = Order {
                id: DocId::from(id),
                date: date.into(),
                ..Order::default()
            };
            mirror.upsert(order, Revision(1));
        }

        let ids: Vec<_> = mirror.iter().map(|o| o.id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_modified_replaces_in_place() {
        let mut mirror = LocalMirror::new();
        mirror.upsert(customer("1", "Ana"), Revision(1));
        mirror.upsert(customer("2", "Bruno"), Revision(2));

        let mut updated = customer("1", "Ana");
        updated.phone = "555".into();
        assert_eq!(mirror.upsert(updated, Revision(3)), MergeOutcome::Replaced);
        assert_eq!(mirror.get(&DocId::from("1")).unwrap().phone, "555");
        assert_eq!(names(&mirror), vec!["Ana", "Bruno"]);
    }

    #[test]
    fn test_rename_moves_entry() {
        let mut mirror = LocalMirror::new();
        mirror.upsert(customer("1", "Ana"), Revision(1));
        mirror.upsert(customer("2", "Bruno"), Revision(2));

        assert_eq!(
            mirror.upsert(customer("1", "Zoe"), Revision(3)),
            MergeOutcome::Moved
        );
        assert_eq!(names(&mirror), vec!["Bruno", "Zoe"]);
    }

    #[test]
    fn test_same_modification_twice_is_idempotent() {
        let mut doc_fields = Fields::new();
        doc_fields.insert("name".into(), json!("Ana"));
        doc_fields.insert("email".into(), json!("ana@example.com"));
        let change = DocumentChange::Modified(RemoteDocument {
            id: DocId::from("1"),
            revision: Revision(7),
            fields: doc_fields,
        });

        let mut once = LocalMirror::<Customer>::new();
        once.upsert(customer("1", "Ana"), Revision(1));
        once.apply(&change);

        let mut twice = once.clone();
        assert_eq!(twice.apply(&change), MergeOutcome::Unchanged);
        assert_eq!(twice.snapshot(), once.snapshot());
        assert_eq!(twice.revision_of(&DocId::from("1")), Some(Revision(7)));
    }

    #[test]
    fn test_older_write_is_stale() {
        let mut mirror = LocalMirror::new();
        mirror.upsert(customer("1", "Ana"), Revision(5));

        assert_eq!(
            mirror.upsert(customer("1", "Old Ana"), Revision(4)),
            MergeOutcome::Stale
        );
        assert_eq!(mirror.get(&DocId::from("1")).unwrap().name, "Ana");
    }

    #[test]
    fn test_tombstone_blocks_older_page_copy() {
        let mut mirror = LocalMirror::new();
        assert_eq!(
            mirror.remove(&DocId::from("1"), Revision(9)),
            MergeOutcome::Unchanged
        );

        assert_eq!(
            mirror.upsert(customer("1", "Ana"), Revision(8)),
            MergeOutcome::Stale
        );
        assert!(mirror.is_empty());

        // a write after the removal brings it back
        assert_eq!(
            mirror.upsert(customer("1", "Ana"), Revision(10)),
            MergeOutcome::Inserted
        );
        assert_eq!(mirror.tombstone_count(), 0);
    }

    #[test]
    fn test_removal_older_than_entry_is_stale() {
        let mut mirror = LocalMirror::new();
        mirror.upsert(customer("1", "Ana"), Revision(6));

        assert_eq!(
            mirror.remove(&DocId::from("1"), Revision(3)),
            MergeOutcome::Stale
        );
        assert!(mirror.contains(&DocId::from("1")));
    }

    #[test]
    fn test_ill_typed_fields_still_decode() {
        let mut fields = Fields::new();
        fields.insert("items".into(), json!({ "not": "a list" }));
        fields.insert("date".into(), json!("2024-01-01T10:00"));
        let doc = RemoteDocument {
            id: DocId::from("o1"),
            revision: Revision(1),
            fields,
        };

        // ill-typed optional fields default instead of failing
        let mut orders = LocalMirror::<Order>::new();
        assert_eq!(orders.merge_document(&doc), MergeOutcome::Inserted);
        assert!(orders.get(&DocId::from("o1")).unwrap().items.is_empty());
    }

    #[test]
    fn test_clear_keeps_tombstones() {
        let mut mirror = LocalMirror::new();
        mirror.upsert(customer("1", "Ana"), Revision(1));
        mirror.remove(&DocId::from("2"), Revision(2));
        mirror.clear();

        assert!(mirror.is_empty());
        assert_eq!(mirror.tombstone_count(), 1);
    }

    #[test]
    fn test_prune_drops_only_covered_tombstones() {
        let mut mirror = LocalMirror::<Customer>::new();
        mirror.upsert(customer("1", "Ana"), Revision(1));
        mirror.remove(&DocId::from("1"), Revision(4));
        let seen = mirror.high_water();
        mirror.remove(&DocId::from("2"), Revision(6));
        assert_eq!(mirror.high_water(), Revision(6));

        assert_eq!(mirror.prune_tombstones(seen), 1);
        assert_eq!(mirror.tombstone_count(), 1);

        // the later removal still blocks a stale copy
        assert_eq!(
            mirror.upsert(customer("2", "Bruno"), Revision(5)),
            MergeOutcome::Stale
        );
    }

    #[derive(Debug, Clone)]
    enum Write {
        Put { id: u8, name: u8 },
        Delete { id: u8 },
    }

    fn write_strategy() -> impl Strategy<Value = Write> {
        prop_oneof![
            (0u8..6, 0u8..4).prop_map(|(id, name)| Write::Put { id, name }),
            (0u8..6).prop_map(|id| Write::Delete { id }),
        ]
    }

    fn as_change(write: &Write, revision: Revision) -> DocumentChange {
        match write {
            Write::Put { id, name } => {
                let mut fields = Fields::new();
                fields.insert("name".into(), json!(format!("n{name}")));
                DocumentChange::Modified(RemoteDocument {
                    id: DocId(format!("{id}")),
                    revision,
                    fields,
                })
            }
            Write::Delete { id } => DocumentChange::Removed {
                id: DocId(format!("{id}")),
                revision,
            },
        }
    }

    /// Documents a page fetched after the first `at` writes would return.
    fn snapshot_page(writes: &[Write], at: usize) -> Vec<RemoteDocument> {
        let mut latest: HashMap<u8, (usize, &Write)> = HashMap::new();
        for (i, write) in writes.iter().enumerate().take(at) {
            let id = match write {
                Write::Put { id, .. } | Write::Delete { id } => *id,
            };
            latest.insert(id, (i, write));
        }
        latest
            .into_values()
            .filter_map(|(i, write)| match as_change(write, Revision(i as u64 + 1)) {
                DocumentChange::Modified(doc) => Some(doc),
                _ => None,
            })
            .collect()
    }

    proptest! {
        // Writes carry unique increasing revisions; delivery order is a
        // random permutation, with some writes delivered twice, and pages
        // taken at arbitrary points of the write history are merged at
        // arbitrary points of the delivery.
        #[test]
        fn prop_mirror_converges_regardless_of_delivery_order(
            (writes, delivery, pages) in prop::collection::vec(write_strategy(), 1..40)
                .prop_flat_map(|writes| {
                    let n = writes.len();
                    let order: Vec<usize> = (0..n).chain(0..n / 2).collect();
                    let steps = order.len();
                    (
                        Just(writes),
                        Just(order).prop_shuffle(),
                        prop::collection::vec((0..=n, 0..=steps), 0..5),
                    )
                })
        ) {
            let changes: Vec<DocumentChange> = writes
                .iter()
                .enumerate()
                .map(|(i, w)| as_change(w, Revision(i as u64 + 1)))
                .collect();

            let mut mirror = LocalMirror::<Customer>::new();
            for step in 0..=delivery.len() {
                for (at, _) in pages.iter().filter(|(_, merged_at)| *merged_at == step) {
                    mirror.merge_page(&snapshot_page(&writes, *at));
                }
                if let Some(&index) = delivery.get(step) {
                    mirror.apply(&changes[index]);
                }
            }

            // no identifier twice
            let mut ids: Vec<_> = mirror.iter().map(|c| c.id.clone()).collect();
            let total = ids.len();
            ids.sort();
            ids.dedup();
            prop_assert_eq!(ids.len(), total);

            // sorted by the collection ordering
            let snapshot = mirror.snapshot();
            for pair in snapshot.windows(2) {
                let order = Customer::KIND.sort_order();
                prop_assert_eq!(
                    order.compare(&pair[0].name, &pair[0].id, &pair[1].name, &pair[1].id),
                    Ordering::Less
                );
            }

            // each id reflects its newest write
            let mut newest: HashMap<DocId, &DocumentChange> = HashMap::new();
            for change in &changes {
                newest.insert(change.id().clone(), change);
            }
            for (id, change) in newest {
                match change {
                    DocumentChange::Removed { .. } => prop_assert!(!mirror.contains(&id)),
                    _ => prop_assert_eq!(mirror.revision_of(&id), Some(change.revision())),
                }
            }
        }
    }
}
