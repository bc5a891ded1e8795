//! Unvalidated form input for the save operations.
//!
//! A draft without an id creates a new document; with an id it replaces the
//! existing one.

use std::str::FromStr;

use chrono::NaiveDateTime;
use orderdesk_shared::constants::ORDER_DATE_FORMAT;
use orderdesk_shared::DocId;
use orderdesk_store::{Customer, LineItem, Order, OrderStatus, Product};

use crate::error::{Result, SyncError};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerDraft {
    pub id: Option<DocId>,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub email: String,
}

impl CustomerDraft {
    pub(crate) fn into_customer(self) -> Result<Customer> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(SyncError::invalid("customer", "name is required"));
        }

        Ok(Customer {
            id: self.id.unwrap_or_default(),
            name: name.to_string(),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
            email: self.email.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductDraft {
    pub id: Option<DocId>,
    pub name: String,
    pub price: Option<f64>,
}

impl ProductDraft {
    pub(crate) fn into_product(self) -> Result<Product> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(SyncError::invalid("product", "name is required"));
        }
        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                return Err(SyncError::invalid("product", format!("bad price {price}")));
            }
        }

        Ok(Product {
            id: self.id.unwrap_or_default(),
            name: name.to_string(),
            price: self.price,
        })
    }
}

/// One row of the order form. Quantity defaults to 1 and price to 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineItemDraft {
    pub product_name: String,
    pub quantity: Option<u32>,
    pub price: Option<f64>,
}

impl LineItemDraft {
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            ..Self::default()
        }
    }

    fn is_blank(&self) -> bool {
        self.product_name.trim().is_empty()
    }

    fn into_line_item(self) -> LineItem {
        LineItem {
            product_name: self.product_name.trim().to_string(),
            quantity: self.quantity.filter(|q| *q > 0).unwrap_or(1),
            price: self.price.filter(|p| p.is_finite()).unwrap_or(0.0),
        }
    }
}

/// `NAME[:QTY[:PRICE]]`, e.g. `Pan de campo:2:1500`.
impl FromStr for LineItemDraft {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let product_name = parts.next().unwrap_or_default().trim().to_string();

        let quantity = match parts.next().map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => Some(q.parse::<u32>().map_err(|_| format!("bad quantity '{q}'"))?),
            None => None,
        };
        let price = match parts.next().map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => Some(p.parse::<f64>().map_err(|_| format!("bad price '{p}'"))?),
            None => None,
        };

        Ok(Self {
            product_name,
            quantity,
            price,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderDraft {
    pub id: Option<DocId>,
    pub customer_id: DocId,
    /// Local date-time. Defaults to now for new orders and to the stored
    /// date when editing.
    pub date: Option<NaiveDateTime>,
    /// Defaults to pending for new orders and to the stored status when
    /// editing.
    pub status: Option<OrderStatus>,
    /// Same defaulting as `status`, with empty comments for new orders.
    pub comments: Option<String>,
    pub items: Vec<LineItemDraft>,
    /// Drop the stored attachment when no new one is given.
    pub clear_attachment: bool,
}

impl OrderDraft {
    /// Validate and build the order, without search blob or attachment.
    /// Fields the draft leaves unset come from `existing`, or from
    /// `now` and the defaults for a new order.
    pub(crate) fn into_order(self, existing: Option<&Order>, now: &str) -> Result<Order> {
        let customer_id = DocId::from(self.customer_id.as_str().trim());
        if customer_id.is_empty() {
            return Err(SyncError::invalid("order", "a customer is required"));
        }

        let items: Vec<LineItem> = self
            .items
            .into_iter()
            .filter(|item| !item.is_blank())
            .map(LineItemDraft::into_line_item)
            .collect();
        if items.is_empty() {
            return Err(SyncError::invalid("order", "at least one item is required"));
        }

        let date = match (self.date, existing) {
            (Some(date), _) => date.format(ORDER_DATE_FORMAT).to_string(),
            (None, Some(order)) => order.date.clone(),
            (None, None) => now.to_string(),
        };
        let status = self
            .status
            .or(existing.map(|order| order.status))
            .unwrap_or_default();
        let comments = match (self.comments, existing) {
            (Some(comments), _) => comments.trim().to_string(),
            (None, Some(order)) => order.comments.clone(),
            (None, None) => String::new(),
        };

        Ok(Order {
            id: self.id.unwrap_or_default(),
            customer_id,
            date,
            status,
            comments,
            items,
            search_blob: None,
            attachment_url: String::new(),
        })
    }
}
