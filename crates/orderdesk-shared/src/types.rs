use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Flat field mapping of a stored document, as the remote store sees it.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Text form of a scalar field value. Numbers and booleans are spelled out;
/// null, arrays and objects read as the empty string.
pub fn text_of(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

// Document identifier assigned by the remote store on creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct DocId(pub String);

impl DocId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn short(&self) -> &str {
        let end = self.0.char_indices().nth(8).map_or(self.0.len(), |(i, _)| i);
        &self.0[..end]
    }
}

impl From<&str> for DocId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DocId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Monotonic write-sequence token. Every write accepted by the remote store
/// gets a strictly larger revision than the writes before it.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(transparent)]
pub struct Revision(pub u64);

impl Revision {
    pub const ZERO: Revision = Revision(0);

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Customers,
    Products,
    Orders,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 3] = [
        CollectionKind::Customers,
        CollectionKind::Products,
        CollectionKind::Orders,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Customers => "customers",
            Self::Products => "products",
            Self::Orders => "orders",
        }
    }

    /// Ordering used by both the remote query and the local mirror.
    pub fn sort_order(&self) -> SortOrder {
        match self {
            Self::Customers | Self::Products => SortOrder {
                field: "name",
                direction: SortDirection::Ascending,
            },
            Self::Orders => SortOrder {
                field: "date",
                direction: SortDirection::Descending,
            },
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub field: &'static str,
    pub direction: SortDirection,
}

impl SortOrder {
    /// Total order over `(sort value, id)` pairs. Ties on the sort value are
    /// always broken by ascending id so that pages never overlap.
    pub fn compare(&self, a_value: &str, a_id: &DocId, b_value: &str, b_id: &DocId) -> Ordering {
        let by_value = match self.direction {
            SortDirection::Ascending => a_value.cmp(b_value),
            SortDirection::Descending => b_value.cmp(a_value),
        };
        by_value.then_with(|| a_id.cmp(b_id))
    }

    /// Extract the sort value of a document from its fields, coerced with
    /// [`text_of`]. Missing fields sort as the empty string.
    pub fn value_of(&self, fields: &Fields) -> String {
        fields.get(self.field).map(text_of).unwrap_or_default()
    }
}

/// Position of the last document of a fetched page. The next page starts
/// strictly after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub sort_value: String,
    pub id: DocId,
}

impl Cursor {
    pub fn new(sort_value: impl Into<String>, id: DocId) -> Self {
        Self {
            sort_value: sort_value.into(),
            id,
        }
    }

    /// Whether `(value, id)` lies strictly after this cursor under `order`.
    pub fn is_before(&self, order: &SortOrder, value: &str, id: &DocId) -> bool {
        order.compare(&self.sort_value, &self.id, value, id) == Ordering::Less
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descending_order_breaks_ties_by_id() {
        let order = CollectionKind::Orders.sort_order();
        let a = DocId::from("a");
        let b = DocId::from("b");

        assert_eq!(
            order.compare("2024-01-02", &a, "2024-01-01", &b),
            Ordering::Less
        );
        assert_eq!(
            order.compare("2024-01-01", &a, "2024-01-01", &b),
            Ordering::Less
        );
    }

    #[test]
    fn test_cursor_is_before() {
        let order = CollectionKind::Customers.sort_order();
        let cursor = Cursor::new("Bruno", DocId::from("x"));

        assert!(cursor.is_before(&order, "Carla", &DocId::from("a")));
        assert!(cursor.is_before(&order, "Bruno", &DocId::from("y")));
        assert!(!cursor.is_before(&order, "Bruno", &DocId::from("x")));
        assert!(!cursor.is_before(&order, "Ana", &DocId::from("z")));
    }

    #[test]
    fn test_value_of_missing_field() {
        let order = CollectionKind::Products.sort_order();
        assert_eq!(order.value_of(&Fields::new()), "");
    }

    #[test]
    fn test_value_of_coerces_scalars() {
        let order = CollectionKind::Customers.sort_order();
        let mut fields = Fields::new();

        fields.insert("name".into(), serde_json::Value::Bool(true));
        assert_eq!(order.value_of(&fields), "true");

        fields.insert("name".into(), serde_json::json!(42));
        assert_eq!(order.value_of(&fields), "42");

        fields.insert("name".into(), serde_json::Value::Null);
        assert_eq!(order.value_of(&fields), "");
    }

    #[test]
    fn test_kind_from_name() {
        assert_eq!(CollectionKind::from_name("orders"), Some(CollectionKind::Orders));
        assert_eq!(CollectionKind::from_name("tickets"), None);
    }

    #[test]
    fn test_doc_id_short() {
        assert_eq!(DocId::from("0123456789abcdef").short(), "01234567");
        assert_eq!(DocId::from("abc").short(), "abc");
    }
}
