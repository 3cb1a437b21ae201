//! Transport Adapter contract.
//!
//! The synchronization layer never talks HTTP directly: everything goes through
//! `Transport`, so the same cache/service/hook code runs against the real API
//! (`HttpTransport`, feature `http`) or the in-memory fake used by tests.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod in_memory;
#[cfg(feature = "http")]
pub mod http;

pub use in_memory::{InMemoryTransport, ResponseShape, TransportCall, Verb};
#[cfg(feature = "http")]
pub use http::HttpTransport;

/// Network or HTTP failure.
///
/// `Clone` because one deduplicated read result is handed to every waiter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("client is offline")]
    Offline,
    #[error("network error: {0}")]
    Network(String),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// HTTP verbs against the booking REST API, over JSON bodies.
///
/// Retries, auth and cookies are the implementation's concern; callers see one
/// call per method invocation.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, path: &str) -> Result<Value, TransportError>;

    async fn post(&self, path: &str, body: Value) -> Result<Value, TransportError>;

    async fn put(&self, path: &str, body: Value) -> Result<Value, TransportError>;

    /// `DELETE`, optionally with a JSON body (bulk delete sends `{ ids }`).
    async fn delete(&self, path: &str, body: Option<Value>) -> Result<Value, TransportError>;
}
