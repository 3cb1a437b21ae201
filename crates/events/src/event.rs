//! Booking change events delivered over the push channel.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named event with an opaque payload.
///
/// Consumers in this workspace never inspect `payload`: any booking event is
/// treated as an invalidation trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEvent {
    pub name: String,
    #[serde(default)]
    pub payload: Value,
}

impl PushEvent {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// The booking event this envelope carries, if it is one.
    pub fn booking_event(&self) -> Option<BookingEvent> {
        self.name.parse().ok()
    }
}

/// Booking resource events published by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingEvent {
    Create,
    Update,
    Delete,
    BulkCreate,
    BulkDelete,
}

impl BookingEvent {
    pub const ALL: [BookingEvent; 5] = [
        BookingEvent::Create,
        BookingEvent::Update,
        BookingEvent::Delete,
        BookingEvent::BulkCreate,
        BookingEvent::BulkDelete,
    ];

    /// Wire name, scoped to the booking resource.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingEvent::Create => "booking:create",
            BookingEvent::Update => "booking:update",
            BookingEvent::Delete => "booking:delete",
            BookingEvent::BulkCreate => "booking:bulk-create",
            BookingEvent::BulkDelete => "booking:bulk-delete",
        }
    }

    /// All wire names, in subscription order.
    pub fn names() -> [&'static str; 5] {
        Self::ALL.map(|e| e.as_str())
    }
}

impl core::fmt::Display for BookingEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("unknown booking event: {s}"))
    }
}
