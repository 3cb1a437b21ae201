//! Booking record as returned by the booking API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::date::BookingDate;
use crate::dto::{CreateBookingDto, UpdateBookingDto};
use crate::id::BookingId;

/// Currency assumed when neither the server nor the caller provides one.
pub const DEFAULT_CURRENCY: &str = "KRW";

/// `createdBy` placeholder on optimistic records (the server fills in the real actor).
pub const OPTIMISTIC_AUTHOR: &str = "current-user";

/// Booking lifecycle status.
///
/// The UI expects PENDING → CONFIRMED | CANCELLED, but transitions are not
/// enforced client-side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingType {
    Package,
    Fit,
    Group,
    Business,
}

impl BookingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingType::Package => "PACKAGE",
            BookingType::Fit => "FIT",
            BookingType::Group => "GROUP",
            BookingType::Business => "BUSINESS",
        }
    }
}

/// A travel booking.
///
/// Decoding is lenient so that records from older API generations still load:
/// `departureDate`/`returnDate`, `totalCount` and `memo` are accepted in place
/// of `startDate`/`endDate`, `paxCount` and `notes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    #[serde(default)]
    pub booking_number: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub team_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_type: Option<BookingType>,
    #[serde(default)]
    pub destination: String,
    #[serde(alias = "departureDate")]
    pub start_date: BookingDate,
    #[serde(alias = "returnDate")]
    pub end_date: BookingDate,
    #[serde(default = "default_pax", alias = "totalCount")]
    pub pax_count: u32,
    #[serde(default)]
    pub nights: u32,
    #[serde(default)]
    pub days: u32,
    #[serde(default)]
    pub status: BookingStatus,
    /// Amount in the smallest currency unit (KRW has no minor unit).
    #[serde(default)]
    pub total_price: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit_amount: Option<i64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "memo")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

fn default_pax() -> u32 {
    1
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl Booking {
    /// Synthesize the locally-visible record shown while a create is in flight.
    ///
    /// The temporary id and booking number are derived from `now` and are
    /// replaced by server values on reconciliation.
    pub fn optimistic(dto: &CreateBookingDto, now: DateTime<Utc>) -> Self {
        let millis = now.timestamp_millis();
        Self {
            id: BookingId::temporary(millis),
            booking_number: format!("TEMP-{millis}"),
            customer_name: dto.customer_name.clone(),
            team_name: dto.team_name.clone(),
            booking_type: Some(dto.booking_type),
            destination: dto.destination.clone(),
            start_date: dto.start_date,
            end_date: dto.end_date,
            pax_count: dto.pax_count,
            nights: dto.nights,
            days: dto.days,
            status: BookingStatus::Pending,
            total_price: dto.total_price,
            deposit_amount: dto.deposit_amount,
            currency: dto
                .currency
                .clone()
                .unwrap_or_else(default_currency),
            notes: dto.notes.clone(),
            created_at: Some(now),
            updated_at: Some(now),
            created_by: OPTIMISTIC_AUTHOR.to_string(),
            updated_by: None,
        }
    }

    /// Overlay the fields present in `patch`, stamping `updatedAt`.
    pub fn apply_patch(&mut self, patch: &UpdateBookingDto, now: DateTime<Utc>) {
        if let Some(v) = &patch.customer_name {
            self.customer_name = v.clone();
        }
        if let Some(v) = &patch.team_name {
            self.team_name = v.clone();
        }
        if let Some(v) = patch.booking_type {
            self.booking_type = Some(v);
        }
        if let Some(v) = &patch.destination {
            self.destination = v.clone();
        }
        if let Some(v) = patch.start_date {
            self.start_date = v;
        }
        if let Some(v) = patch.end_date {
            self.end_date = v;
        }
        if let Some(v) = patch.pax_count {
            self.pax_count = v;
        }
        if let Some(v) = patch.nights {
            self.nights = v;
        }
        if let Some(v) = patch.days {
            self.days = v;
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
        if let Some(v) = patch.total_price {
            self.total_price = v;
        }
        if let Some(v) = patch.deposit_amount {
            self.deposit_amount = Some(v);
        }
        if let Some(v) = &patch.currency {
            self.currency = v.clone();
        }
        if let Some(v) = &patch.notes {
            self.notes = Some(v.clone());
        }
        self.updated_at = Some(now);
    }
}
