//! Calendar dates for booking ranges.
//!
//! The API has returned both plain `YYYY-MM-DD` strings and full RFC 3339
//! timestamps for `startDate`/`endDate` over time; both decode to the same
//! calendar date. Dates always serialize as `YYYY-MM-DD`.

use core::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BookingDate(NaiveDate);

impl BookingDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }

    /// `YYYY-MM` month bucket used by calendar filters.
    pub fn month_key(&self) -> String {
        self.0.format("%Y-%m").to_string()
    }

    fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(d) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
            return Some(Self(d));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Self(dt.date_naive()));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|dt| Self(dt.date()))
    }
}

impl core::fmt::Display for BookingDate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for BookingDate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ValidationError::InvalidDate {
            field: "date",
            value: s.to_string(),
        })
    }
}

impl From<NaiveDate> for BookingDate {
    fn from(value: NaiveDate) -> Self {
        Self(value)
    }
}

impl Serialize for BookingDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BookingDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid booking date: {raw}")))
    }
}
