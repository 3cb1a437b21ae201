//! Push Channel bridge: booking events in, debounced revalidation bursts out.
//!
//! Payloads are never inspected. Events arriving within `push_debounce` of
//! the first one in a burst collapse into a single revalidation.

use std::time::Duration;

use bookingsync_events::{BookingEvent, PushChannel, PushEvent, Subscription};
use tokio::time::Instant;

/// Live subscription to the booking events of one hook.
///
/// Dropping it unsubscribes.
#[derive(Debug)]
pub struct PushBridge {
    subscription: Subscription<PushEvent>,
    debounce: Duration,
    pending: Option<Burst>,
}

/// Events coalesced into one revalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushBurst {
    pub events: usize,
    /// When the first event of the burst arrived. Any read started after
    /// this already reflects the change.
    pub first_seen: Instant,
}

#[derive(Debug, Clone, Copy)]
struct Burst {
    due: Instant,
    first_seen: Instant,
    events: usize,
}

impl From<Burst> for PushBurst {
    fn from(burst: Burst) -> Self {
        Self {
            events: burst.events,
            first_seen: burst.first_seen,
        }
    }
}

impl PushBridge {
    /// Subscribe to every booking event, or `None` if the channel is down.
    pub fn attach(channel: &dyn PushChannel, debounce: Duration) -> Option<Self> {
        if !channel.is_connected() {
            tracing::debug!("push channel not connected, live updates disabled");
            return None;
        }

        let subscription = channel.subscribe(&BookingEvent::names());
        Some(Self {
            subscription,
            debounce,
            pending: None,
        })
    }

    /// Resolve once a burst's window has closed. `None` when the channel has
    /// gone away and nothing is pending.
    ///
    /// Cancel-safe: all progress lives in `self`, so this can sit in a
    /// `select!` next to other branches.
    pub async fn next_burst(&mut self) -> Option<PushBurst> {
        loop {
            let Some(burst) = self.pending else {
                let event = self.subscription.recv().await?;
                self.record(&event);
                continue;
            };

            tokio::select! {
                _ = tokio::time::sleep_until(burst.due) => {
                    return self.pending.take().map(PushBurst::from);
                }
                event = self.subscription.recv() => match event {
                    Some(event) => self.record(&event),
                    None => return self.pending.take().map(PushBurst::from),
                },
            }
        }
    }

    fn record(&mut self, event: &PushEvent) {
        tracing::debug!(event = %event.name, "push event received");
        match &mut self.pending {
            Some(burst) => burst.events += 1,
            None => {
                let now = Instant::now();
                self.pending = Some(Burst {
                    due: now + self.debounce,
                    first_seen: now,
                    events: 1,
                });
            }
        }
    }
}
