//! Typed records decoded from remote documents.
//!
//! Every record derives `Serialize` and `Deserialize`; the wire form is the
//! flat camelCase field mapping the document store keeps. The identifier is
//! not part of the field mapping and is attached after decoding.

use std::borrow::Cow;
use std::fmt::Debug;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use orderdesk_shared::{CollectionKind, DocId, Fields};

use crate::error::Result;
use crate::lenient;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A record type stored in one remote collection.
pub trait Entity: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Collection the record lives in.
    const KIND: CollectionKind;

    fn id(&self) -> &DocId;

    fn set_id(&mut self, id: DocId);

    /// Value of the collection's sort field.
    fn sort_value(&self) -> &str;

    /// Decode a record from its stored fields. Missing or ill-typed optional
    /// fields fall back to their defaults.
    fn from_fields(id: DocId, fields: &Fields) -> Result<Self> {
        let mut record: Self = serde_json::from_value(serde_json::Value::Object(fields.clone()))?;
        record.set_id(id);
        Ok(record)
    }

    /// Encode the record's fields (without its identifier).
    fn to_fields(&self) -> Result<Fields> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(fields) => Ok(fields),
            _ => Ok(Fields::new()),
        }
    }
}

// ---------------------------------------------------------------------------
// Customer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Customer {
    #[serde(skip)]
    pub id: DocId,
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub phone: String,
    #[serde(deserialize_with = "lenient::string")]
    pub address: String,
    #[serde(deserialize_with = "lenient::string")]
    pub email: String,
}

impl Entity for Customer {
    const KIND: CollectionKind = CollectionKind::Customers;

    fn id(&self) -> &DocId {
        &self.id
    }

    fn set_id(&mut self, id: DocId) {
        self.id = id;
    }

    fn sort_value(&self) -> &str {
        &self.name
    }
}

// ---------------------------------------------------------------------------
// Product
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    #[serde(skip)]
    pub id: DocId,
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(
        deserialize_with = "lenient::opt_price",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<f64>,
}

impl Entity for Product {
    const KIND: CollectionKind = CollectionKind::Products;

    fn id(&self) -> &DocId {
        &self.id
    }

    fn set_id(&mut self, id: DocId) {
        self.id = id;
    }

    fn sort_value(&self) -> &str {
        &self.name
    }
}

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    #[default]
    Pending,
    Delivered,
    Incomplete,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [
        OrderStatus::Pending,
        OrderStatus::Delivered,
        OrderStatus::Incomplete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Delivered => "delivered",
            Self::Incomplete => "incomplete",
        }
    }

    /// Value kept in the `status` field of stored documents.
    pub fn stored_value(&self) -> &'static str {
        match self {
            Self::Pending => "pendiente",
            Self::Delivered => "entregado",
            Self::Incomplete => "incompleto",
        }
    }

    /// Accepts both the display name and the stored value, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|status| {
            status.as_str().eq_ignore_ascii_case(s) || status.stored_value().eq_ignore_ascii_case(s)
        })
    }
}

// unknown stored values read as pending
impl From<String> for OrderStatus {
    fn from(s: String) -> Self {
        Self::parse(&s).unwrap_or_default()
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.stored_value().to_string()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One product line of an order. Product names are free text, not
/// references into the products collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LineItem {
    #[serde(deserialize_with = "lenient::string")]
    pub product_name: String,
    #[serde(deserialize_with = "lenient::quantity")]
    pub quantity: u32,
    #[serde(deserialize_with = "lenient::price")]
    pub price: f64,
}

impl Default for LineItem {
    fn default() -> Self {
        Self {
            product_name: String::new(),
            quantity: 1,
            price: 0.0,
        }
    }
}

impl LineItem {
    pub fn subtotal(&self) -> f64 {
        f64::from(self.quantity) * self.price
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Order {
    #[serde(skip)]
    pub id: DocId,
    #[serde(deserialize_with = "lenient::doc_id")]
    pub customer_id: DocId,
    /// Local date-time as entered, `YYYY-MM-DDTHH:MM`.
    #[serde(deserialize_with = "lenient::string")]
    pub date: String,
    #[serde(deserialize_with = "lenient::status")]
    pub status: OrderStatus,
    #[serde(deserialize_with = "lenient::string")]
    pub comments: String,
    #[serde(deserialize_with = "lenient::seq")]
    pub items: Vec<LineItem>,
    /// Lowercase search text computed when the order was saved. Documents
    /// written before the field existed do not have it.
    #[serde(
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub search_blob: Option<String>,
    /// URL of the receipt photo or PDF, empty when there is none.
    #[serde(rename = "ticketPhoto", deserialize_with = "lenient::string")]
    pub attachment_url: String,
}

impl Entity for Order {
    const KIND: CollectionKind = CollectionKind::Orders;

    fn id(&self) -> &DocId {
        &self.id
    }

    fn set_id(&mut self, id: DocId) {
        self.id = id;
    }

    fn sort_value(&self) -> &str {
        &self.date
    }
}

impl Order {
    /// Calendar day of the order date, if it parses.
    pub fn day(&self) -> Option<NaiveDate> {
        let day = self.date.split('T').next()?;
        NaiveDate::parse_from_str(day.trim(), "%Y-%m-%d").ok()
    }

    pub fn total(&self) -> f64 {
        self.items.iter().map(LineItem::subtotal).sum()
    }

    pub fn has_attachment(&self) -> bool {
        !self.attachment_url.is_empty()
    }

    /// Lowercase searchable text from the linked customer, the comments and
    /// the item names.
    pub fn compose_search_text(
        customer: Option<&Customer>,
        comments: &str,
        items: &[LineItem],
    ) -> String {
        let (name, phone, address, email) = customer
            .map(|c| (c.name.as_str(), c.phone.as_str(), c.address.as_str(), c.email.as_str()))
            .unwrap_or_default();
        let item_names: Vec<&str> = items.iter().map(|i| i.product_name.as_str()).collect();

        format!(
            "{name} {phone} {address} {email} {comments} {}",
            item_names.join(" ")
        )
        .to_lowercase()
    }

    /// Text used for free-text filtering: the stored search blob, or a live
    /// join against `customer` when the order has none.
    pub fn search_text(&self, customer: Option<&Customer>) -> Cow<'_, str> {
        match self.search_blob.as_deref() {
            Some(blob) if !blob.is_empty() => Cow::Borrowed(blob),
            _ => Cow::Owned(Self::compose_search_text(
                customer,
                &self.comments,
                &self.items,
            )),
        }
    }
}
