//! Booking Service: validated writes that invalidate the list cache.
//!
//! Each write validates first (no network on failure), makes exactly one
//! transport call, and only on success invalidates every booking list key.
//! Failed writes leave the cache untouched.

use std::sync::Arc;

use bookingsync_core::{Booking, BookingId, CreateBookingDto, UpdateBookingDto, ValidationError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::cache::{CacheProvider, KeyMatcher};
use crate::error::SyncResult;
use crate::filter::{BOOKINGS_ROUTE, BookingFilter, booking_path};
use crate::transport::{Transport, TransportError};
use crate::types::{BookingPage, BulkOutcome};

const DEFAULT_TAKE: u32 = 1000;

#[derive(Clone)]
pub struct BookingService {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn CacheProvider>,
    default_take: u32,
}

impl BookingService {
    pub fn new(transport: Arc<dyn Transport>, cache: Arc<dyn CacheProvider>) -> Self {
        Self {
            transport,
            cache,
            default_take: DEFAULT_TAKE,
        }
    }

    pub fn with_default_take(mut self, take: u32) -> Self {
        self.default_take = take;
        self
    }

    /// List read through the cache (deduplicated, normalized).
    pub async fn get_bookings(&self, filter: &BookingFilter) -> SyncResult<BookingPage> {
        let key = filter.cache_key(self.default_take);
        Ok(self.cache.fetch(&key).await?)
    }

    pub async fn create_booking(&self, dto: &CreateBookingDto) -> SyncResult<Booking> {
        dto.validate()?;

        let raw = self
            .transport
            .post(BOOKINGS_ROUTE, to_body(dto)?)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "create booking failed"))?;

        self.invalidate_lists().await;
        let booking: Booking = decode_record(raw)?;
        tracing::info!(id = %booking.id, "booking created");
        Ok(booking)
    }

    /// Partial update.
    ///
    /// The list invalidation also covers the detail key `/api/bookings/<id>`,
    /// which shares the route prefix.
    pub async fn update_booking(&self, id: &BookingId, patch: &UpdateBookingDto) -> SyncResult<Booking> {
        require_id(id)?;
        patch.validate()?;

        let raw = self
            .transport
            .put(&booking_path(id), to_body(patch)?)
            .await
            .inspect_err(|e| tracing::warn!(%id, error = %e, "update booking failed"))?;

        self.invalidate_lists().await;
        let booking: Booking = decode_record(raw)?;
        tracing::info!(%id, "booking updated");
        Ok(booking)
    }

    pub async fn delete_booking(&self, id: &BookingId) -> SyncResult<()> {
        require_id(id)?;

        self.transport
            .delete(&booking_path(id), None)
            .await
            .inspect_err(|e| tracing::warn!(%id, error = %e, "delete booking failed"))?;

        self.invalidate_lists().await;
        tracing::info!(%id, "booking deleted");
        Ok(())
    }

    pub async fn bulk_delete(&self, ids: &[BookingId]) -> SyncResult<BulkOutcome> {
        if ids.is_empty() {
            return Err(ValidationError::empty_bulk("ids").into());
        }
        ids.iter().try_for_each(require_id)?;

        let raw = self
            .transport
            .delete(&format!("{BOOKINGS_ROUTE}/bulk"), Some(json!({ "ids": ids })))
            .await
            .inspect_err(|e| tracing::warn!(count = ids.len(), error = %e, "bulk delete failed"))?;

        self.invalidate_lists().await;
        let deleted = count_at(&raw, "deleted").unwrap_or(ids.len() as u64);
        tracing::info!(deleted, "bookings bulk-deleted");
        Ok(BulkOutcome::Deleted(deleted))
    }

    /// Re-create previously deleted records (undo of a bulk delete).
    pub async fn bulk_restore(&self, bookings: &[Booking]) -> SyncResult<BulkOutcome> {
        if bookings.is_empty() {
            return Err(ValidationError::empty_bulk("bookings").into());
        }

        let raw = self
            .transport
            .post(
                &format!("{BOOKINGS_ROUTE}/bulk-restore"),
                json!({ "bookings": bookings }),
            )
            .await
            .inspect_err(|e| tracing::warn!(count = bookings.len(), error = %e, "bulk restore failed"))?;

        self.invalidate_lists().await;
        let restored = count_at(&raw, "restored").unwrap_or(bookings.len() as u64);
        tracing::info!(restored, "bookings restored");
        Ok(BulkOutcome::Restored(restored))
    }

    async fn invalidate_lists(&self) {
        self.cache.invalidate(KeyMatcher::bookings()).await;
    }
}

fn require_id(id: &BookingId) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::missing("id"));
    }
    Ok(())
}

fn to_body<T: Serialize>(value: &T) -> Result<Value, TransportError> {
    serde_json::to_value(value).map_err(|e| TransportError::Decode(e.to_string()))
}

/// A single record, bare or wrapped in `{ data }`.
fn decode_record<T: DeserializeOwned>(raw: Value) -> Result<T, TransportError> {
    let inner = match raw {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value(inner).map_err(|e| TransportError::Decode(e.to_string()))
}

fn count_at(raw: &Value, field: &str) -> Option<u64> {
    raw.get(field).and_then(Value::as_u64)
}
