//! Shared value types for the synchronization layer.

use bookingsync_core::Booking;
use serde::{Deserialize, Serialize};

use crate::transport::TransportError;

/// Pagination block of the canonical list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl Default for PaginationInfo {
    /// Used when a current-schema response omits `pagination`.
    fn default() -> Self {
        Self {
            page: 1,
            limit: 1000,
            total: 0,
            total_pages: 0,
        }
    }
}

/// Canonical list envelope `{ data, pagination }`.
///
/// `pagination` is `None` for responses that never had one (bare arrays). It
/// always serializes (as `null` when absent) so that normalizing the
/// serialized form yields the same page again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingPage {
    pub data: Vec<Booking>,
    pub pagination: Option<PaginationInfo>,
}

impl BookingPage {
    pub fn new(data: Vec<Booking>, pagination: Option<PaginationInfo>) -> Self {
        Self { data, pagination }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Load state of one hook instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HookStatus {
    #[default]
    Idle,
    Loading,
    Ready,
}

/// What a hook exposes to its consumer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingsView {
    pub bookings: Vec<Booking>,
    pub pagination: Option<PaginationInfo>,
    pub status: HookStatus,
    pub is_mutating: bool,
    /// Last read error; cleared by the next successful read.
    pub error: Option<TransportError>,
}

impl BookingsView {
    pub fn is_loading(&self) -> bool {
        self.status == HookStatus::Loading
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Server acknowledgement of a bulk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkOutcome {
    Deleted(u64),
    Restored(u64),
}

impl BulkOutcome {
    pub fn count(&self) -> u64 {
        match self {
            BulkOutcome::Deleted(n) | BulkOutcome::Restored(n) => *n,
        }
    }
}
