//! `bookingsync-client`
//!
//! **Responsibility:** keep booking lists in the UI consistent with the server.
//!
//! This crate provides:
//! - Response normalization across three API generations
//! - A shared stale-while-revalidate cache with read deduplication
//! - The booking service (validated writes + list invalidation)
//! - The synchronization hook (optimistic writes, reconcile-by-refetch)
//! - A bridge from push-channel booking events to cache revalidation
//!
//! The server is the authority. Local state is only ever a cached or
//! optimistic projection of it and is refetched after every write.

pub mod bridge;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod hook;
pub mod normalize;
pub mod service;
pub mod transport;
pub mod types;

pub use bridge::{PushBridge, PushBurst};
pub use cache::{CacheEvent, CacheProvider, KeyMatcher, Mutator, SwrCache};
pub use config::SyncConfig;
pub use context::SyncContext;
pub use error::{SyncError, SyncResult};
pub use filter::{BOOKINGS_ROUTE, BookingFilter, SortOrder, booking_path};
pub use hook::{BookingsHook, HookOptions};
pub use normalize::normalize;
pub use service::BookingService;
pub use transport::{InMemoryTransport, ResponseShape, Transport, TransportCall, TransportError, Verb};
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use types::{BookingPage, BookingsView, BulkOutcome, HookStatus, PaginationInfo};
