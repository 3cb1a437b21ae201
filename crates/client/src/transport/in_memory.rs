//! In-memory booking API for tests/dev.
//!
//! Behaves like the REST API closely enough to exercise the whole
//! synchronization layer: it assigns server ids and booking numbers, honours
//! the `month`/`status`/`take` list filters, can answer in any of the three
//! list response generations, records every call, and can be told to fail or
//! stall a given verb.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use bookingsync_core::{Booking, BookingId, CreateBookingDto, UpdateBookingDto};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use url::form_urlencoded;

use super::{Transport, TransportError};
use crate::filter::BOOKINGS_ROUTE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportCall {
    pub verb: Verb,
    pub path: String,
    pub body: Option<Value>,
}

/// Which list response generation the fake answers with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseShape {
    #[default]
    Current,
    Legacy,
    BareArray,
}

#[derive(Default)]
struct FakeApi {
    bookings: Vec<Booking>,
    next_seq: u64,
    calls: Vec<TransportCall>,
    failures: HashMap<Verb, VecDeque<TransportError>>,
    latency: HashMap<Verb, Duration>,
    shape: ResponseShape,
}

#[derive(Default)]
pub struct InMemoryTransport {
    state: Mutex<FakeApi>,
}

#[derive(Deserialize)]
struct BulkIds {
    ids: Vec<BookingId>,
}

#[derive(Deserialize)]
struct BulkRecords {
    bookings: Vec<Booking>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bookings(bookings: Vec<Booking>) -> Self {
        let transport = Self::new();
        if let Ok(mut api) = transport.state.lock() {
            api.bookings = bookings;
        }
        transport
    }

    /// Insert a record directly, bypassing the call log.
    pub fn seed(&self, booking: Booking) {
        if let Ok(mut api) = self.state.lock() {
            api.bookings.push(booking);
        }
    }

    /// Server-side truth.
    pub fn bookings(&self) -> Vec<Booking> {
        self.state
            .lock()
            .map(|api| api.bookings.clone())
            .unwrap_or_default()
    }

    pub fn set_shape(&self, shape: ResponseShape) {
        if let Ok(mut api) = self.state.lock() {
            api.shape = shape;
        }
    }

    /// Fail the next call of `verb` with `err` (queued; one per call).
    pub fn fail_next(&self, verb: Verb, err: TransportError) {
        if let Ok(mut api) = self.state.lock() {
            api.failures.entry(verb).or_default().push_back(err);
        }
    }

    /// Delay every call of `verb` by `latency`.
    pub fn set_latency(&self, verb: Verb, latency: Duration) {
        if let Ok(mut api) = self.state.lock() {
            api.latency.insert(verb, latency);
        }
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.state
            .lock()
            .map(|api| api.calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self, verb: Verb) -> usize {
        self.calls().iter().filter(|c| c.verb == verb).count()
    }

    /// Calls whose path equals `path` exactly.
    pub fn calls_to(&self, verb: Verb, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.verb == verb && c.path == path)
            .count()
    }

    pub fn clear_calls(&self) {
        if let Ok(mut api) = self.state.lock() {
            api.calls.clear();
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, FakeApi>, TransportError> {
        self.state
            .lock()
            .map_err(|_| TransportError::Network("in-memory API lock poisoned".to_string()))
    }

    /// Record the call, apply latency, then surface any injected failure.
    async fn begin(&self, verb: Verb, path: &str, body: Option<&Value>) -> Result<(), TransportError> {
        let latency = {
            let mut api = self.lock()?;
            api.calls.push(TransportCall {
                verb,
                path: path.to_string(),
                body: body.cloned(),
            });
            api.latency.get(&verb).copied()
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut api = self.lock()?;
        match api.failures.get_mut(&verb).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl FakeApi {
    fn list(&self, query: &str) -> Value {
        let mut month = None;
        let mut status = None;
        let mut take = None;
        for (name, value) in form_urlencoded::parse(query.as_bytes()) {
            match name.as_ref() {
                "month" => month = Some(value.into_owned()),
                "status" => status = Some(value.into_owned()),
                "take" | "limit" => take = value.parse::<usize>().ok(),
                _ => {}
            }
        }

        let matching: Vec<&Booking> = self
            .bookings
            .iter()
            .filter(|b| {
                month.as_deref().is_none_or(|m| {
                    b.start_date.month_key() == m || b.end_date.month_key() == m
                })
            })
            .filter(|b| status.as_deref().is_none_or(|s| b.status.as_str() == s))
            .collect();

        let total = matching.len();
        let limit = take.unwrap_or(1000);
        let data: Vec<&Booking> = matching.into_iter().take(limit).collect();
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };

        match self.shape {
            ResponseShape::Current => json!({
                "data": data,
                "pagination": { "page": 1, "limit": limit, "total": total, "totalPages": total_pages }
            }),
            ResponseShape::Legacy => json!({
                "bookings": data,
                "total": total,
                "page": 1,
                "pageSize": limit
            }),
            ResponseShape::BareArray => json!(data),
        }
    }

    fn position(&self, id: &str) -> Result<usize, TransportError> {
        self.bookings
            .iter()
            .position(|b| b.id.as_str() == id)
            .ok_or_else(|| TransportError::api(404, format!("booking {id} not found")))
    }

    fn create(&mut self, body: Value) -> Result<Value, TransportError> {
        let dto: CreateBookingDto = decode_body(body)?;
        self.next_seq += 1;
        let seq = self.next_seq;

        let mut booking = Booking::optimistic(&dto, Utc::now());
        booking.id = BookingId::new(format!("bk-{seq}"));
        booking.booking_number = format!("BK-{seq:05}");
        booking.created_by = "agent@example.test".to_string();

        self.bookings.push(booking.clone());
        to_json(&booking)
    }

    fn update(&mut self, id: &str, body: Value) -> Result<Value, TransportError> {
        let patch: UpdateBookingDto = decode_body(body)?;
        let idx = self.position(id)?;
        let booking = &mut self.bookings[idx];
        booking.apply_patch(&patch, Utc::now());
        to_json(booking)
    }

    fn remove(&mut self, id: &str) -> Result<Value, TransportError> {
        let idx = self.position(id)?;
        self.bookings.remove(idx);
        Ok(json!({ "id": id }))
    }

    fn bulk_delete(&mut self, body: Option<Value>) -> Result<Value, TransportError> {
        let req: BulkIds = decode_body(body.unwrap_or(Value::Null))?;
        let before = self.bookings.len();
        self.bookings.retain(|b| !req.ids.contains(&b.id));
        Ok(json!({ "deleted": before - self.bookings.len() }))
    }

    fn bulk_restore(&mut self, body: Value) -> Result<Value, TransportError> {
        let req: BulkRecords = decode_body(body)?;
        let mut restored = 0;
        for booking in req.bookings {
            if !self.bookings.iter().any(|b| b.id == booking.id) {
                self.bookings.push(booking);
                restored += 1;
            }
        }
        Ok(json!({ "restored": restored }))
    }
}

fn decode_body<T: serde::de::DeserializeOwned>(body: Value) -> Result<T, TransportError> {
    serde_json::from_value(body).map_err(|e| TransportError::api(400, e.to_string()))
}

fn to_json(booking: &Booking) -> Result<Value, TransportError> {
    serde_json::to_value(booking).map_err(|e| TransportError::Decode(e.to_string()))
}

/// Decoded id segment of `/api/bookings/<id>`.
fn route_id(path: &str) -> Option<String> {
    path.strip_prefix(BOOKINGS_ROUTE)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|raw| !raw.is_empty() && !raw.contains('/'))
        .and_then(|raw| form_urlencoded::parse(raw.as_bytes()).next())
        .map(|(id, _)| id.into_owned())
}

fn not_found(path: &str) -> TransportError {
    TransportError::api(404, format!("no route for {path}"))
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn get(&self, path: &str) -> Result<Value, TransportError> {
        self.begin(Verb::Get, path, None).await?;
        let api = self.lock()?;

        let (route, query) = path.split_once('?').unwrap_or((path, ""));
        if route == BOOKINGS_ROUTE {
            return Ok(api.list(query));
        }
        match route_id(route) {
            Some(id) => to_json(&api.bookings[api.position(&id)?]),
            None => Err(not_found(path)),
        }
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, TransportError> {
        self.begin(Verb::Post, path, Some(&body)).await?;
        let mut api = self.lock()?;

        match path {
            BOOKINGS_ROUTE => api.create(body),
            p if p == format!("{BOOKINGS_ROUTE}/bulk-restore") => api.bulk_restore(body),
            _ => Err(not_found(path)),
        }
    }

    async fn put(&self, path: &str, body: Value) -> Result<Value, TransportError> {
        self.begin(Verb::Put, path, Some(&body)).await?;
        let mut api = self.lock()?;

        match route_id(path) {
            Some(id) => api.update(&id, body),
            None => Err(not_found(path)),
        }
    }

    async fn delete(&self, path: &str, body: Option<Value>) -> Result<Value, TransportError> {
        self.begin(Verb::Delete, path, body.as_ref()).await?;
        let mut api = self.lock()?;

        match route_id(path).as_deref() {
            Some("bulk") => api.bulk_delete(body),
            Some(id) => api.remove(id),
            None => Err(not_found(path)),
        }
    }
}
