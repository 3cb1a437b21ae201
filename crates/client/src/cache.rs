//! Cache Provider: keyed stale-while-revalidate store of normalized list pages.
//!
//! Every entry holds the last-known-good page for one request key, a
//! generation counter, and at most one shared in-flight read. Invalidation and
//! local writes bump the generation; a read that settles under an older
//! generation never overwrites what replaced it. Invalidation keeps the stale
//! page around, so consumers can keep rendering it until the refetch lands.
//!
//! Since invalidation drops the in-flight read, any read registered under the
//! current generation started after the key last changed. Callers reacting to
//! a change use that to share one refetch instead of issuing their own.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{OnceCell, broadcast};
use tokio::time::Instant;

use crate::config::SyncConfig;
use crate::filter::BOOKINGS_ROUTE;
use crate::normalize::normalize;
use crate::transport::{Transport, TransportError};
use crate::types::BookingPage;

const EVENT_CAPACITY: usize = 256;

/// Selects which keys an invalidation applies to.
#[derive(Clone)]
pub enum KeyMatcher {
    Exact(String),
    Prefix(String),
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl KeyMatcher {
    pub fn exact(key: impl Into<String>) -> Self {
        Self::Exact(key.into())
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::Prefix(prefix.into())
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    /// Every booking list page (and detail) key.
    pub fn bookings() -> Self {
        Self::Prefix(BOOKINGS_ROUTE.to_string())
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyMatcher::Exact(k) => k == key,
            KeyMatcher::Prefix(p) => key.starts_with(p.as_str()),
            KeyMatcher::Predicate(f) => f(key),
        }
    }
}

impl fmt::Debug for KeyMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMatcher::Exact(k) => f.debug_tuple("Exact").field(k).finish(),
            KeyMatcher::Prefix(p) => f.debug_tuple("Prefix").field(p).finish(),
            KeyMatcher::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Change notification broadcast to every subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// New data was stored for the key (fetch result or local write).
    Updated(String),
    /// The key was marked stale; the next read refetches.
    Invalidated(String),
}

impl CacheEvent {
    pub fn key(&self) -> &str {
        match self {
            CacheEvent::Updated(k) | CacheEvent::Invalidated(k) => k,
        }
    }
}

/// Local write applied by [`CacheProvider::mutate`]. Returning `None` clears
/// the cached page.
pub type Mutator = Box<dyn FnOnce(Option<BookingPage>) -> Option<BookingPage> + Send>;

/// Key-addressed store of normalized responses plus invalidation.
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Cached-or-fresh page for `key`.
    ///
    /// Identical reads within the dedup window share one transport call.
    async fn fetch(&self, key: &str) -> Result<BookingPage, TransportError>;

    /// Mark every matching key stale; returns how many keys matched.
    ///
    /// Does not refetch. Cached data stays readable through [`get`](Self::get).
    async fn invalidate(&self, matcher: KeyMatcher) -> usize;

    /// Apply a local write without revalidating.
    async fn mutate(&self, key: &str, f: Mutator);

    /// Like [`fetch`](Self::fetch), but joins any read started since `key`
    /// last changed, however old. Used right after an invalidation.
    async fn fetch_current(&self, key: &str) -> Result<BookingPage, TransportError> {
        self.fetch(key).await
    }

    /// Invalidate `key` and read it again.
    async fn revalidate(&self, key: &str) -> Result<BookingPage, TransportError> {
        self.invalidate(KeyMatcher::exact(key)).await;
        self.fetch(key).await
    }

    /// Revalidate, unless a read started after `since` already covers it.
    async fn revalidate_since(
        &self,
        key: &str,
        _since: Instant,
    ) -> Result<BookingPage, TransportError> {
        self.revalidate(key).await
    }

    /// Last stored page, stale or not. Never touches the network.
    fn get(&self, key: &str) -> Option<BookingPage>;

    fn keys(&self) -> Vec<String>;

    fn subscribe(&self) -> broadcast::Receiver<CacheEvent>;
}

type ReadResult = Result<BookingPage, TransportError>;

#[derive(Clone)]
struct InFlight {
    cell: Arc<OnceCell<ReadResult>>,
    started_at: Instant,
    generation: u64,
}

impl InFlight {
    fn start(generation: u64) -> Self {
        Self {
            cell: Arc::new(OnceCell::new()),
            started_at: Instant::now(),
            generation,
        }
    }
}

/// Which live read a new reader may share.
#[derive(Debug, Clone, Copy)]
enum Reuse {
    /// Started within the dedup window.
    Window,
    /// Started under the current generation.
    Current,
    /// Started strictly after the given instant.
    After(Instant),
}

#[derive(Default)]
struct Entry {
    data: Option<BookingPage>,
    generation: u64,
    in_flight: Option<InFlight>,
}

/// Stale-while-revalidate cache in front of a [`Transport`].
///
/// One instance is shared by every hook and service of a [`SyncContext`].
///
/// [`SyncContext`]: crate::context::SyncContext
pub struct SwrCache {
    transport: Arc<dyn Transport>,
    dedup_interval: Duration,
    entries: Mutex<HashMap<String, Entry>>,
    events: broadcast::Sender<CacheEvent>,
}

impl SwrCache {
    pub fn new(transport: Arc<dyn Transport>, dedup_interval: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            transport,
            dedup_interval,
            entries: Mutex::new(HashMap::new()),
            events,
        }
    }

    pub fn from_config(transport: Arc<dyn Transport>, config: &SyncConfig) -> Self {
        Self::new(transport, config.dedup_interval)
    }

    pub fn dedup_interval(&self) -> Duration {
        self.dedup_interval
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, event: CacheEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn reusable(&self, entry: &Entry, reuse: Reuse) -> Option<InFlight> {
        let flight = entry.in_flight.as_ref()?;
        if flight.generation != entry.generation || matches!(flight.cell.get(), Some(Err(_))) {
            return None;
        }
        let fresh = match reuse {
            Reuse::Window => flight.started_at.elapsed() < self.dedup_interval,
            Reuse::Current => true,
            Reuse::After(since) => flight.started_at > since,
        };
        fresh.then(|| flight.clone())
    }

    /// Join a live read for `key` or register a new one.
    fn join_or_start(&self, key: &str, reuse: Reuse) -> InFlight {
        let mut entries = self.entries();
        let entry = entries.entry(key.to_string()).or_default();

        if let Some(flight) = self.reusable(entry, reuse) {
            tracing::debug!(key, ?reuse, "joining deduplicated read");
            return flight;
        }

        let flight = InFlight::start(entry.generation);
        entry.in_flight = Some(flight.clone());
        flight
    }

    async fn read(&self, key: &str, flight: InFlight) -> ReadResult {
        let transport = Arc::clone(&self.transport);

        let result = flight
            .cell
            .get_or_init(|| async move {
                tracing::debug!(key, "fetching");
                transport.get(key).await.map(|raw| normalize(&raw))
            })
            .await
            .clone();

        if let Err(err) = &result {
            tracing::warn!(key, error = %err, "read failed");
        }
        self.settle(key, &flight, result)
    }

    /// Store a settled read unless the entry moved on meanwhile.
    fn settle(&self, key: &str, flight: &InFlight, result: ReadResult) -> ReadResult {
        let mut updated = false;
        let outcome = {
            let mut entries = self.entries();
            let entry = entries.entry(key.to_string()).or_default();

            match result {
                Ok(page) if entry.generation == flight.generation => {
                    if entry.data.as_ref() != Some(&page) {
                        entry.data = Some(page.clone());
                        updated = true;
                    }
                    Ok(page)
                }
                Ok(page) => {
                    tracing::debug!(key, "discarding superseded read");
                    Ok(entry.data.clone().unwrap_or(page))
                }
                Err(err) => {
                    let ours = entry
                        .in_flight
                        .as_ref()
                        .is_some_and(|f| Arc::ptr_eq(&f.cell, &flight.cell));
                    if ours {
                        entry.in_flight = None;
                    }
                    Err(err)
                }
            }
        };

        if updated {
            self.notify(CacheEvent::Updated(key.to_string()));
        }
        outcome
    }
}

#[async_trait]
impl CacheProvider for SwrCache {
    async fn fetch(&self, key: &str) -> Result<BookingPage, TransportError> {
        let flight = self.join_or_start(key, Reuse::Window);
        self.read(key, flight).await
    }

    async fn fetch_current(&self, key: &str) -> Result<BookingPage, TransportError> {
        let flight = self.join_or_start(key, Reuse::Current);
        self.read(key, flight).await
    }

    async fn revalidate_since(
        &self,
        key: &str,
        since: Instant,
    ) -> Result<BookingPage, TransportError> {
        let joined = {
            let entries = self.entries();
            entries
                .get(key)
                .and_then(|entry| self.reusable(entry, Reuse::After(since)))
        };
        match joined {
            Some(flight) => {
                tracing::debug!(key, "change already covered by a newer read");
                self.read(key, flight).await
            }
            None => self.revalidate(key).await,
        }
    }

    async fn invalidate(&self, matcher: KeyMatcher) -> usize {
        let stale: Vec<String> = {
            let mut entries = self.entries();
            entries
                .iter_mut()
                .filter(|(key, _)| matcher.matches(key))
                .map(|(key, entry)| {
                    entry.generation += 1;
                    entry.in_flight = None;
                    key.clone()
                })
                .collect()
        };

        tracing::debug!(?matcher, count = stale.len(), "invalidated");
        let count = stale.len();
        for key in stale {
            self.notify(CacheEvent::Invalidated(key));
        }
        count
    }

    async fn mutate(&self, key: &str, f: Mutator) {
        {
            let mut entries = self.entries();
            let entry = entries.entry(key.to_string()).or_default();
            entry.data = f(entry.data.take());
            entry.generation += 1;
            entry.in_flight = None;
        }
        self.notify(CacheEvent::Updated(key.to_string()));
    }

    fn get(&self, key: &str) -> Option<BookingPage> {
        self.entries().get(key).and_then(|e| e.data.clone())
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }
}
