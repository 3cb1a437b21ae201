//! `bookingsync-core` — booking data model and client-side invariants.
//!
//! This crate contains **pure** types (no IO, no caching mechanics). The
//! server stays authoritative; the checks here only exist to fail fast before
//! a request is ever issued.

pub mod booking;
pub mod date;
pub mod dto;
pub mod error;
pub mod id;

pub use booking::{Booking, BookingStatus, BookingType, DEFAULT_CURRENCY, OPTIMISTIC_AUTHOR};
pub use date::BookingDate;
pub use dto::{CreateBookingDto, UpdateBookingDto};
pub use error::{ValidationError, ValidationResult};
pub use id::BookingId;
