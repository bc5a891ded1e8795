//! Pagination bookkeeping for one collection.

use orderdesk_shared::{CollectionKind, Cursor};
use orderdesk_store::{PageQuery, RemoteDocument};

/// Cursor and "more available" flag of a paginated collection.
///
/// `has_more` is true only when the most recent fetch returned a full page.
/// The cursor points at the last document of the most recent non-empty page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageState {
    cursor: Option<Cursor>,
    has_more: bool,
    page_size: usize,
    started: bool,
    pages_loaded: usize,
}

impl PageState {
    pub fn new(page_size: usize) -> Self {
        Self {
            cursor: None,
            has_more: false,
            page_size: page_size.max(1),
            started: false,
            pages_loaded: 0,
        }
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Whether the first page has been fetched since the last reset.
    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn pages_loaded(&self) -> usize {
        self.pages_loaded
    }

    /// A "load more" is worth issuing: nothing was fetched yet, or the last
    /// page came back full.
    pub fn can_load_more(&self) -> bool {
        !self.started || self.has_more
    }

    /// Query for the next fetch. A reset (or a first fetch) starts from the
    /// top of the ordering.
    pub fn query(&self, kind: CollectionKind, reset: bool) -> PageQuery {
        match (&self.cursor, reset || !self.started) {
            (Some(cursor), false) => PageQuery::after(kind, self.page_size, cursor.clone()),
            _ => PageQuery::first(kind, self.page_size),
        }
    }

    /// Record the outcome of a successful fetch issued with `query`.
    pub fn record(&mut self, query: &PageQuery, page: &[RemoteDocument]) {
        if query.start_after.is_none() {
            self.cursor = None;
            self.pages_loaded = 0;
        }
        if let Some(last) = page.last() {
            self.cursor = Some(last.cursor(&query.order));
            self.pages_loaded += 1;
        }
        self.has_more = page.len() == self.page_size;
        self.started = true;
    }

    /// Forget the cursor; the next fetch starts over.
    pub fn reset(&mut self) {
        self.cursor = None;
        self.has_more = false;
        self.started = false;
        self.pages_loaded = 0;
    }
}

#[cfg(test)]
mod tests {
    use orderdesk_shared::{DocId, Fields, Revision};
    use serde_json::json;

    use super::*;

    const KIND: CollectionKind = CollectionKind::Customers;

    fn doc(id: &str, name: &str) -> RemoteDocument {
        let mut fields = Fields::new();
        fields.insert("name".into(), json!(name));
        RemoteDocument {
            id: DocId::from(id),
            revision: Revision(1),
            fields,
        }
    }

    #[test]
    fn test_full_page_sets_cursor_and_has_more() {
        let mut page = PageState::new(2);
        let query = page.query(KIND, true);
        assert!(query.start_after.is_none());

        page.record(&query, &[doc("a", "Ana"), doc("b", "Bea")]);
        assert!(page.has_more());
        assert_eq!(page.cursor(), Some(&Cursor::new("Bea", DocId::from("b"))));

        let next = page.query(KIND, false);
        assert_eq!(next.start_after, Some(Cursor::new("Bea", DocId::from("b"))));
        assert_eq!(next.limit, 2);
    }

    #[test]
    fn test_short_page_clears_has_more() {
        let mut page = PageState::new(2);
        let first = page.query(KIND, true);
        page.record(&first, &[doc("a", "Ana"), doc("b", "Bea")]);

        let next = page.query(KIND, false);
        page.record(&next, &[doc("c", "Caro")]);
        assert!(!page.has_more());
        assert!(!page.can_load_more());
        assert_eq!(page.cursor(), Some(&Cursor::new("Caro", DocId::from("c"))));
        assert_eq!(page.pages_loaded(), 2);
    }

    #[test]
    fn test_empty_collection_keeps_cursor_absent() {
        let mut page = PageState::new(5);
        let query = page.query(KIND, true);
        page.record(&query, &[]);

        assert!(!page.has_more());
        assert!(page.cursor().is_none());
        assert!(page.is_started());
    }

    #[test]
    fn test_empty_next_page_keeps_cursor() {
        let mut page = PageState::new(1);
        let first = page.query(KIND, true);
        page.record(&first, &[doc("a", "Ana")]);

        let next = page.query(KIND, false);
        page.record(&next, &[]);
        assert!(!page.has_more());
        assert_eq!(page.cursor(), Some(&Cursor::new("Ana", DocId::from("a"))));
    }

    #[test]
    fn test_reset_query_replaces_cursor() {
        let mut page = PageState::new(1);
        let first = page.query(KIND, true);
        page.record(&first, &[doc("b", "Bea")]);

        let again = page.query(KIND, true);
        assert!(again.start_after.is_none());
        page.record(&again, &[doc("a", "Ana")]);
        assert_eq!(page.cursor(), Some(&Cursor::new("Ana", DocId::from("a"))));
        assert_eq!(page.pages_loaded(), 1);
    }

    #[test]
    fn test_load_more_before_first_fetch_starts_at_top() {
        let page = PageState::new(3);
        assert!(page.can_load_more());
        assert!(page.query(KIND, false).start_after.is_none());
    }
}
