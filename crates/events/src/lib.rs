//! `bookingsync-events` — push channel abstraction for booking change events.
//!
//! The server announces booking changes on a publish/subscribe socket. This
//! crate only models the **subscriber** side: event names, an opaque event
//! envelope, the `PushChannel` contract and an in-memory channel for tests/dev.

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{PushChannel, Subscription};
pub use event::{BookingEvent, PushEvent};
pub use in_memory_bus::{InMemoryChannelError, InMemoryPushChannel};
