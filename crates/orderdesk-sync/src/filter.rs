//! Order filter and free-text search over the loaded orders.
//!
//! Evaluation is purely local: only orders already in the mirror are
//! considered and nothing here ever triggers a fetch.

use chrono::NaiveDate;
use orderdesk_shared::DocId;
use orderdesk_store::{Customer, Order, OrderStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    /// Case-insensitive substring. Blank text does not restrict.
    pub text: Option<String>,
    pub status: Option<OrderStatus>,
    /// Inclusive lower bound on the order's calendar day.
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on the order's calendar day.
    pub date_to: Option<NaiveDate>,
}

impl OrderFilter {
    pub fn is_empty(&self) -> bool {
        self.needle().is_none()
            && self.status.is_none()
            && self.date_from.is_none()
            && self.date_to.is_none()
    }

    fn needle(&self) -> Option<String> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }

    /// Whether `order` passes. `customer` is the order's linked customer, if
    /// it is loaded; it is only consulted when the order has no search blob.
    pub fn matches(&self, order: &Order, customer: Option<&Customer>) -> bool {
        self.matches_with(order, customer, self.needle().as_deref())
    }

    fn matches_with(&self, order: &Order, customer: Option<&Customer>, needle: Option<&str>) -> bool {
        if let Some(status) = self.status {
            if order.status != status {
                return false;
            }
        }

        if self.date_from.is_some() || self.date_to.is_some() {
            let Some(day) = order.day() else {
                return false;
            };
            if self.date_from.is_some_and(|from| day < from) {
                return false;
            }
            if self.date_to.is_some_and(|to| day > to) {
                return false;
            }
        }

        match needle {
            Some(needle) => order.search_text(customer).contains(needle),
            None => true,
        }
    }
}

/// The ordered subsequence of `orders` passing `filter`. `customer` resolves
/// an order's customer id against the loaded customers.
pub fn filter_orders<'a, F>(orders: &[Order], filter: &OrderFilter, customer: F) -> Vec<Order>
where
    F: Fn(&DocId) -> Option<&'a Customer>,
{
    let needle = filter.needle();
    orders
        .iter()
        .filter(|order| {
            let linked = if needle.is_some() && !has_blob(order) {
                customer(&order.customer_id)
            } else {
                None
            };
            filter.matches_with(order, linked, needle.as_deref())
        })
        .cloned()
        .collect()
}

fn has_blob(order: &Order) -> bool {
    order.search_blob.as_deref().is_some_and(|b| !b.is_empty())
}
