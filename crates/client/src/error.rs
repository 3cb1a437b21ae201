//! Error model of the synchronization layer.

use bookingsync_core::ValidationError;
use thiserror::Error;

use crate::transport::TransportError;

/// Result type of every service and hook operation.
pub type SyncResult<T> = Result<T, SyncError>;

/// Failure surfaced to the UI layer.
///
/// Validation errors never reach the network; transport errors are passed
/// through unchanged. Malformed list responses are not errors at all (see
/// `normalize`).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SyncError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SyncError {
    pub fn is_validation(&self) -> bool {
        matches!(self, SyncError::Validation(_))
    }

    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            SyncError::Transport(e) => Some(e),
            SyncError::Validation(_) => None,
        }
    }
}
