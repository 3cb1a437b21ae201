//! Validation error model.

use thiserror::Error;

/// Result type used by the client-side validation gate.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Client-side validation failure.
///
/// Raised before any network call. Every variant names the offending field so
/// the UI can attach the message to the right form input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was empty.
    #[error("{field} is required")]
    MissingField { field: &'static str },

    /// `endDate` was not strictly after `startDate`.
    #[error("endDate ({end}) must be after startDate ({start})")]
    DateRange { start: String, end: String },

    /// Headcount below one.
    #[error("paxCount must be at least 1 (got {0})")]
    PaxCount(u32),

    /// A monetary total was negative.
    #[error("{field} cannot be negative (got {value})")]
    NegativeAmount { field: &'static str, value: i64 },

    /// A date string could not be parsed.
    #[error("{field} is not a valid date: {value}")]
    InvalidDate { field: &'static str, value: String },

    /// A bulk operation was called with nothing to operate on.
    #[error("{field} must not be empty")]
    EmptyBulk { field: &'static str },
}

impl ValidationError {
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    pub fn negative(field: &'static str, value: i64) -> Self {
        Self::NegativeAmount { field, value }
    }

    pub fn empty_bulk(field: &'static str) -> Self {
        Self::EmptyBulk { field }
    }

    /// Name of the field (camelCase, as sent on the wire) that failed.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingField { field }
            | Self::NegativeAmount { field, .. }
            | Self::InvalidDate { field, .. }
            | Self::EmptyBulk { field } => field,
            Self::DateRange { .. } => "endDate",
            Self::PaxCount(_) => "paxCount",
        }
    }
}
