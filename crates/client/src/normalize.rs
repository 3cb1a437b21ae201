//! Response normalization across API generations.
//!
//! Three list shapes are recognized, in priority order:
//!
//! 1. `{ data, pagination }` (current): pagination defaults when absent
//! 2. `{ bookings, total, page, pageSize }` (legacy): renamed and rebuilt
//! 3. `[ ... ]` (oldest): wrapped, no pagination
//!
//! Anything else becomes an empty page. Malformed input is logged, never
//! returned as an error, so one bad response cannot take the UI down.

use bookingsync_core::Booking;
use serde_json::{Map, Value};

use crate::types::{BookingPage, PaginationInfo};

/// Convert a raw list payload into the canonical envelope.
pub fn normalize(raw: &Value) -> BookingPage {
    match raw {
        Value::Object(map) if map.contains_key("data") => current(map),
        Value::Object(map) if map.contains_key("bookings") => legacy(map),
        Value::Array(items) => BookingPage::new(decode_records(items), None),
        Value::Null => {
            tracing::debug!("empty booking list response");
            BookingPage::default()
        }
        other => {
            tracing::warn!(shape = shape_name(other), "unrecognized booking list response");
            BookingPage::default()
        }
    }
}

fn current(map: &Map<String, Value>) -> BookingPage {
    let data = records_at(map, "data");
    let pagination = match map.get("pagination") {
        None => Some(PaginationInfo::default()),
        Some(Value::Null) => None,
        Some(raw) => match serde_json::from_value::<PaginationInfo>(raw.clone()) {
            Ok(p) => Some(p),
            Err(err) => {
                tracing::warn!("malformed pagination block, using defaults: {err}");
                Some(PaginationInfo::default())
            }
        },
    };
    BookingPage::new(data, pagination)
}

fn legacy(map: &Map<String, Value>) -> BookingPage {
    let data = records_at(map, "bookings");
    let defaults = PaginationInfo::default();

    let page = u64_at(map, "page").unwrap_or(defaults.page);
    let limit = u64_at(map, "pageSize").unwrap_or(defaults.limit);
    let total = u64_at(map, "total").unwrap_or(data.len() as u64);
    let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };

    BookingPage::new(
        data,
        Some(PaginationInfo {
            page,
            limit,
            total,
            total_pages,
        }),
    )
}

fn records_at(map: &Map<String, Value>, field: &str) -> Vec<Booking> {
    match map.get(field) {
        Some(Value::Array(items)) => decode_records(items),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            tracing::warn!(field, shape = shape_name(other), "booking list field is not an array");
            Vec::new()
        }
    }
}

/// Decode each record independently; undecodable records are dropped.
fn decode_records(items: &[Value]) -> Vec<Booking> {
    items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value::<Booking>(item.clone()) {
            Ok(booking) => Some(booking),
            Err(err) => {
                tracing::warn!(index = idx, "skipping malformed booking record: {err}");
                None
            }
        })
        .collect()
}

fn u64_at(map: &Map<String, Value>, field: &str) -> Option<u64> {
    map.get(field).and_then(Value::as_u64)
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
