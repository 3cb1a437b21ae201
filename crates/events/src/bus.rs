//! Push channel subscription abstraction (mechanics only).
//!
//! The push channel is a **server → client** notification path. It carries no
//! ordering or exactly-once guarantees that this workspace relies on:
//!
//! - **At-least-once, possibly duplicated**: a client's own mutation is echoed
//!   back to it, and consumers must tolerate that.
//! - **Opaque payloads**: events are invalidation triggers, not deltas.
//! - **Unsubscribe by drop**: dropping a `Subscription` detaches it; the
//!   channel prunes dead subscribers on its next publish.

use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, error::TryRecvError};

use crate::event::PushEvent;

/// A live subscription to one or more event names.
#[derive(Debug)]
pub struct Subscription<M = PushEvent> {
    receiver: UnboundedReceiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: UnboundedReceiver<M>) -> Self {
        Self { receiver }
    }

    /// Wait for the next message; `None` once the channel side is gone.
    pub async fn recv(&mut self) -> Option<M> {
        self.receiver.recv().await
    }

    /// Try to receive a message without waiting.
    pub fn try_recv(&mut self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }
}

/// Subscriber-side contract of the push transport.
///
/// Implementations wrap whatever socket client the application uses. The
/// trait requires `Send + Sync` so one handle can be shared by every hook.
pub trait PushChannel: Send + Sync {
    /// Subscribe to the given event names. Events with other names are not
    /// delivered to this subscription.
    fn subscribe(&self, events: &[&str]) -> Subscription<PushEvent>;

    /// Whether a live connection is currently available.
    fn is_connected(&self) -> bool {
        true
    }
}

impl<C> PushChannel for Arc<C>
where
    C: PushChannel + ?Sized,
{
    fn subscribe(&self, events: &[&str]) -> Subscription<PushEvent> {
        (**self).subscribe(events)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}
