//! Forgiving field decoders.
//!
//! Documents written by older clients (or by hand) may carry `null`, numbers
//! where strings are expected, or lack fields entirely. These helpers map
//! anything unexpected to the field's default instead of rejecting the whole
//! document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use orderdesk_shared::{text_of, DocId};

use crate::models::OrderStatus;

pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|value| text_of(&value))
}

pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

pub fn doc_id<'de, D>(deserializer: D) -> Result<DocId, D::Error>
where
    D: Deserializer<'de>,
{
    string(deserializer).map(DocId)
}

pub fn status<'de, D>(deserializer: D) -> Result<OrderStatus, D::Error>
where
    D: Deserializer<'de>,
{
    string(deserializer).map(OrderStatus::from)
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number(&value).filter(|p| p.is_finite()).unwrap_or(0.0))
}

pub fn opt_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number(&value).filter(|p| p.is_finite()))
}

pub fn quantity<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number(&value)
        .filter(|q| *q >= 1.0)
        .map(|q| q.min(f64::from(u32::MAX)) as u32)
        .unwrap_or(1))
}

/// Decode an array, dropping elements that do not decode. Anything that is
/// not an array becomes an empty list.
pub fn seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}
