//! In-memory push channel for tests/dev.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::sync::mpsc;

use crate::bus::{PushChannel, Subscription};
use crate::event::PushEvent;

#[derive(Debug, thiserror::Error)]
pub enum InMemoryChannelError {
    /// Publish failed due to internal lock poisoning.
    #[error("push channel lock poisoned")]
    Poisoned,
}

struct Subscriber {
    events: Vec<String>,
    tx: mpsc::UnboundedSender<PushEvent>,
}

/// In-memory pub/sub channel.
///
/// - Best-effort fan-out to every live subscriber of the event name
/// - Dead subscribers (dropped `Subscription`s) are pruned on publish
/// - Connectivity can be toggled to simulate a dropped socket
pub struct InMemoryPushChannel {
    subscribers: Mutex<Vec<Subscriber>>,
    connected: AtomicBool,
}

impl InMemoryPushChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `name` to every matching subscriber; returns how many received it.
    pub fn publish(&self, name: &str, payload: Value) -> Result<usize, InMemoryChannelError> {
        let mut subs = self
            .subscribers
            .lock()
            .map_err(|_| InMemoryChannelError::Poisoned)?;

        subs.retain(|s| !s.tx.is_closed());

        let event = PushEvent::new(name, payload);
        let mut delivered = 0;
        for sub in subs.iter().filter(|s| s.events.iter().any(|e| e == name)) {
            if sub.tx.send(event.clone()).is_ok() {
                delivered += 1;
            }
        }

        tracing::debug!(event = name, delivered, "push event published");
        Ok(delivered)
    }

    /// Number of subscriptions that are still alive.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .map(|subs| subs.iter().filter(|s| !s.tx.is_closed()).count())
            .unwrap_or(0)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl Default for InMemoryPushChannel {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
        }
    }
}

impl PushChannel for InMemoryPushChannel {
    fn subscribe(&self, events: &[&str]) -> Subscription<PushEvent> {
        let (tx, rx) = mpsc::unbounded_channel();

        // If the lock is poisoned we still hand out a subscription;
        // it just never receives anything.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(Subscriber {
                events: events.iter().map(|e| e.to_string()).collect(),
                tx,
            });
        }

        Subscription::new(rx)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
