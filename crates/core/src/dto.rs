//! Create/update payloads and the client-side validation gate.

use serde::{Deserialize, Serialize};

use crate::booking::{BookingStatus, BookingType};
use crate::date::BookingDate;
use crate::error::{ValidationError, ValidationResult};

/// Payload for `POST /api/bookings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingDto {
    pub customer_name: String,
    pub team_name: String,
    pub booking_type: BookingType,
    pub destination: String,
    pub start_date: BookingDate,
    pub end_date: BookingDate,
    pub pax_count: u32,
    #[serde(default)]
    pub nights: u32,
    #[serde(default)]
    pub days: u32,
    /// Smallest currency unit.
    pub total_price: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit_amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CreateBookingDto {
    /// Enforce the client-side invariants; the first violation wins.
    pub fn validate(&self) -> ValidationResult<()> {
        require_text("customerName", &self.customer_name)?;
        require_text("teamName", &self.team_name)?;
        require_text("destination", &self.destination)?;
        check_range(self.start_date, self.end_date)?;
        check_pax(self.pax_count)?;
        check_amount("totalPrice", self.total_price)?;
        if let Some(deposit) = self.deposit_amount {
            check_amount("depositAmount", deposit)?;
        }
        Ok(())
    }
}

/// Partial patch for `PUT /api/bookings/:id`; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_type: Option<BookingType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<BookingDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<BookingDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pax_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nights: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BookingStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit_amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl UpdateBookingDto {
    /// Same invariants as create, applied only to the fields being changed.
    ///
    /// The date range is only checked when both ends are part of the patch;
    /// a single-ended change is left to the server.
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.customer_name {
            require_text("customerName", name)?;
        }
        if let Some(team) = &self.team_name {
            require_text("teamName", team)?;
        }
        if let Some(dest) = &self.destination {
            require_text("destination", dest)?;
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            check_range(start, end)?;
        }
        if let Some(pax) = self.pax_count {
            check_pax(pax)?;
        }
        if let Some(total) = self.total_price {
            check_amount("totalPrice", total)?;
        }
        if let Some(deposit) = self.deposit_amount {
            check_amount("depositAmount", deposit)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn require_text(field: &'static str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::missing(field));
    }
    Ok(())
}

fn check_range(start: BookingDate, end: BookingDate) -> ValidationResult<()> {
    if end <= start {
        return Err(ValidationError::DateRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    Ok(())
}

fn check_pax(pax: u32) -> ValidationResult<()> {
    if pax < 1 {
        return Err(ValidationError::PaxCount(pax));
    }
    Ok(())
}

fn check_amount(field: &'static str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::negative(field, value));
    }
    Ok(())
}
