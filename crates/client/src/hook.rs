//! Synchronization Hook: one booking list session bound to one filter.
//!
//! A mounted hook reads its key through the shared cache, publishes a
//! [`BookingsView`] on a `watch` channel, and runs a background task that
//! follows push events, cache changes for its key and optional polling.
//!
//! Writes follow the optimistic protocol: validate, patch the cached page in
//! place, call the service, then always reconcile by refetching. A failed
//! write therefore rolls back to server truth before the error is returned,
//! or to the page it replaced when server truth cannot be read either.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use bookingsync_core::{Booking, BookingId, CreateBookingDto, UpdateBookingDto, ValidationError};
use chrono::Utc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Notify, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::bridge::{PushBridge, PushBurst};
use crate::cache::{CacheEvent, CacheProvider, Mutator};
use crate::config::SyncConfig;
use crate::context::SyncContext;
use crate::error::SyncResult;
use crate::filter::BookingFilter;
use crate::service::BookingService;
use crate::transport::TransportError;
use crate::types::{BookingPage, BookingsView, BulkOutcome, HookStatus};

/// Per-hook settings; anything left unset falls back to [`SyncConfig`].
#[derive(Debug, Clone, Default)]
pub struct HookOptions {
    pub filter: BookingFilter,
    /// Follow the push channel (when the context has one).
    pub live_updates: bool,
    pub optimistic_updates: Option<bool>,
    pub refresh_interval: Option<Duration>,
}

impl HookOptions {
    pub fn new(filter: BookingFilter) -> Self {
        Self {
            filter,
            live_updates: true,
            optimistic_updates: None,
            refresh_interval: None,
        }
    }

    pub fn without_live_updates(mut self) -> Self {
        self.live_updates = false;
        self
    }

    pub fn with_optimistic_updates(mut self, enabled: bool) -> Self {
        self.optimistic_updates = Some(enabled);
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }
}

struct HookInner {
    cache: Arc<dyn CacheProvider>,
    service: BookingService,
    config: SyncConfig,
    optimistic: bool,
    filter: RwLock<BookingFilter>,
    key: RwLock<String>,
    view: watch::Sender<BookingsView>,
    mutating: AtomicUsize,
}

/// Clears `is_mutating` when the last concurrent write finishes.
struct MutationGuard<'a>(&'a HookInner);

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        if self.0.mutating.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.view.send_modify(|v| v.is_mutating = false);
        }
    }
}

impl HookInner {
    fn key(&self) -> String {
        self.key.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn begin_mutation(&self) -> MutationGuard<'_> {
        if self.mutating.fetch_add(1, Ordering::SeqCst) == 0 {
            self.view.send_modify(|v| v.is_mutating = true);
        }
        MutationGuard(self)
    }

    fn set_loading(&self) {
        self.view.send_if_modified(|v| {
            let changed = v.status != HookStatus::Loading;
            v.status = HookStatus::Loading;
            changed
        });
    }

    /// Publish a settled read, unless the hook moved to another key meanwhile.
    fn apply(&self, key: &str, result: &Result<BookingPage, TransportError>) {
        if key != self.key() {
            return;
        }
        self.view.send_modify(|v| {
            match result {
                Ok(page) => {
                    v.bookings = page.data.clone();
                    v.pagination = page.pagination;
                    v.error = None;
                }
                Err(err) => v.error = Some(err.clone()),
            }
            v.status = HookStatus::Ready;
        });
    }

    /// Mirror whatever the cache holds for `key` into the view.
    fn sync_view(&self, key: &str) {
        if key != self.key() {
            return;
        }
        let page = self.cache.get(key).unwrap_or_default();
        self.view.send_if_modified(|v| {
            if v.bookings == page.data && v.pagination == page.pagination {
                return false;
            }
            v.bookings = page.data;
            v.pagination = page.pagination;
            true
        });
    }

    async fn load(&self) -> Result<BookingPage, TransportError> {
        let key = self.key();
        self.set_loading();
        let result = self.cache.fetch(&key).await;
        self.apply(&key, &result);
        result
    }

    /// Follow an invalidation of the current key, sharing the read that
    /// whoever invalidated it already started.
    async fn reload(&self) -> Result<BookingPage, TransportError> {
        let key = self.key();
        self.set_loading();
        let result = self.cache.fetch_current(&key).await;
        self.apply(&key, &result);
        result
    }

    async fn revalidate(&self) -> Result<BookingPage, TransportError> {
        let key = self.key();
        self.set_loading();
        let result = self.cache.revalidate(&key).await;
        self.revalidated(&key, &result);
        result
    }

    /// Revalidate after a push burst. Another hook on the same key may have
    /// refetched since the burst began; its read is reused.
    async fn catch_up(&self, burst: PushBurst) -> Result<BookingPage, TransportError> {
        let key = self.key();
        tracing::info!(key = %key, events = burst.events, "push events received, revalidating");
        self.set_loading();
        let result = self.cache.revalidate_since(&key, burst.first_seen).await;
        self.revalidated(&key, &result);
        result
    }

    fn revalidated(&self, key: &str, result: &Result<BookingPage, TransportError>) {
        if let Err(err) = result {
            tracing::error!(key, error = %err, "revalidation failed");
        }
        self.apply(key, result);
    }

    /// Apply a local write; returns the page it replaced.
    async fn optimistic_write(&self, key: &str, f: Mutator) -> Option<BookingPage> {
        let previous = self.cache.get(key);
        self.cache.mutate(key, f).await;
        self.sync_view(key);
        previous
    }

    /// Refetch after a write, whatever its outcome.
    ///
    /// A successful write has already invalidated the list keys through the
    /// service, so any read started since then is current; a failed one did
    /// not, so the key is invalidated here to drop any optimistic change. When
    /// that refetch fails too, `replaced` (the page from before the optimistic
    /// write) is put back.
    async fn reconcile(&self, key: &str, written: bool, replaced: Option<Option<BookingPage>>) {
        let result = if written {
            self.cache.fetch_current(key).await
        } else {
            self.cache.revalidate(key).await
        };
        if let Err(err) = &result {
            tracing::error!(key, error = %err, "reconciliation after write failed");
            if let (false, Some(previous)) = (written, replaced) {
                tracing::warn!(key, "rolling back optimistic write");
                self.cache.mutate(key, Box::new(move |_| previous)).await;
                self.sync_view(key);
            }
        }
        self.apply(key, &result);
    }
}

/// A mounted booking list.
///
/// Call [`unmount`](Self::unmount) for an orderly teardown; dropping the hook
/// aborts its background task instead. Either way the push subscription is
/// released.
pub struct BookingsHook {
    inner: Arc<HookInner>,
    shutdown: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl BookingsHook {
    /// Load the first page and start following changes.
    ///
    /// Must be called within a Tokio runtime. A failed first read does not
    /// fail the mount; it shows up as `view().error`.
    pub async fn mount(ctx: &SyncContext, options: HookOptions) -> Self {
        let key = options.filter.cache_key(ctx.config.default_take);
        let (view, _) = watch::channel(BookingsView::default());

        let inner = Arc::new(HookInner {
            cache: Arc::clone(&ctx.cache),
            service: ctx.service(),
            optimistic: options
                .optimistic_updates
                .unwrap_or(ctx.config.optimistic_updates),
            config: ctx.config.clone(),
            filter: RwLock::new(options.filter),
            key: RwLock::new(key.clone()),
            view,
            mutating: AtomicUsize::new(0),
        });

        let bridge = if options.live_updates {
            ctx.push
                .as_deref()
                .and_then(|channel| PushBridge::attach(channel, ctx.config.push_debounce))
        } else {
            None
        };
        let events = inner.cache.subscribe();
        let refresh = options.refresh_interval.or(ctx.config.refresh_interval);

        tracing::info!(key = %key, live = bridge.is_some(), "bookings hook mounted");
        if let Err(err) = inner.load().await {
            tracing::warn!(key = %key, error = %err, "initial booking read failed");
        }

        let shutdown = Arc::new(Notify::new());
        let task = tokio::spawn(run(
            Arc::clone(&inner),
            Arc::clone(&shutdown),
            bridge,
            events,
            refresh,
        ));

        Self {
            inner,
            shutdown,
            task: Some(task),
        }
    }

    /// Stop the background task and release the push subscription.
    pub async fn unmount(mut self) {
        self.shutdown.notify_one();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!("bookings hook task ended abnormally: {err}");
            }
        }
        tracing::info!(key = %self.inner.key(), "bookings hook unmounted");
    }

    pub fn view(&self) -> BookingsView {
        self.inner.view.borrow().clone()
    }

    /// Change feed of the view; the receiver outlives nothing but the hook.
    pub fn watch(&self) -> watch::Receiver<BookingsView> {
        self.inner.view.subscribe()
    }

    pub fn status(&self) -> HookStatus {
        self.inner.view.borrow().status
    }

    pub fn is_mutating(&self) -> bool {
        self.inner.view.borrow().is_mutating
    }

    /// Cache key currently read by this hook.
    pub fn request_key(&self) -> String {
        self.inner.key()
    }

    pub fn current_filter(&self) -> BookingFilter {
        self.inner
            .filter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Switch to another filter (and therefore another key) and load it.
    ///
    /// The old key's entry is left in the cache untouched.
    pub async fn set_filter(&self, filter: BookingFilter) -> SyncResult<BookingPage> {
        let key = filter.cache_key(self.inner.config.default_take);
        if key != self.inner.key() {
            tracing::debug!(key = %key, "bookings hook filter changed");
            *self.inner.filter.write().unwrap_or_else(PoisonError::into_inner) = filter;
            *self.inner.key.write().unwrap_or_else(PoisonError::into_inner) = key;
        }
        Ok(self.inner.load().await?)
    }

    /// Force a refetch of the current key.
    pub async fn refresh(&self) -> SyncResult<BookingPage> {
        Ok(self.inner.revalidate().await?)
    }

    /// Window-focus signal; revalidates only when enabled in the config.
    pub async fn on_focus(&self) -> bool {
        if !self.inner.config.revalidate_on_focus {
            return false;
        }
        let _ = self.inner.revalidate().await;
        true
    }

    /// Network-reconnect signal; revalidates only when enabled in the config.
    pub async fn on_reconnect(&self) -> bool {
        if !self.inner.config.revalidate_on_reconnect {
            return false;
        }
        let _ = self.inner.revalidate().await;
        true
    }

    pub async fn create(&self, dto: CreateBookingDto) -> SyncResult<Booking> {
        dto.validate()?;
        let _guard = self.inner.begin_mutation();
        let key = self.inner.key();

        let mut replaced = None;
        if self.inner.optimistic {
            let record = Booking::optimistic(&dto, Utc::now());
            tracing::debug!(id = %record.id, "optimistic create");
            let previous = self
                .inner
                .optimistic_write(
                    &key,
                    Box::new(move |page| {
                        let mut page = page.unwrap_or_default();
                        page.data.push(record);
                        Some(page)
                    }),
                )
                .await;
            replaced = Some(previous);
        }

        let result = self.inner.service.create_booking(&dto).await;
        self.inner.reconcile(&key, result.is_ok(), replaced).await;
        result
    }

    pub async fn update(&self, id: &BookingId, patch: UpdateBookingDto) -> SyncResult<Booking> {
        if id.is_empty() {
            return Err(ValidationError::missing("id").into());
        }
        patch.validate()?;
        let _guard = self.inner.begin_mutation();
        let key = self.inner.key();

        let mut replaced = None;
        if self.inner.optimistic {
            let target = id.clone();
            let local = patch.clone();
            let previous = self
                .inner
                .optimistic_write(
                    &key,
                    Box::new(move |page| {
                        page.map(|mut page| {
                            let now = Utc::now();
                            for booking in page.data.iter_mut().filter(|b| b.id == target) {
                                booking.apply_patch(&local, now);
                            }
                            page
                        })
                    }),
                )
                .await;
            replaced = Some(previous);
        }

        let result = self.inner.service.update_booking(id, &patch).await;
        self.inner.reconcile(&key, result.is_ok(), replaced).await;
        result
    }

    pub async fn delete(&self, id: &BookingId) -> SyncResult<()> {
        if id.is_empty() {
            return Err(ValidationError::missing("id").into());
        }
        let _guard = self.inner.begin_mutation();
        let key = self.inner.key();

        let mut replaced = None;
        if self.inner.optimistic {
            let target = id.clone();
            let previous = self
                .inner
                .optimistic_write(
                    &key,
                    Box::new(move |page| {
                        page.map(|mut page| {
                            page.data.retain(|b| b.id != target);
                            page
                        })
                    }),
                )
                .await;
            replaced = Some(previous);
        }

        let result = self.inner.service.delete_booking(id).await;
        self.inner.reconcile(&key, result.is_ok(), replaced).await;
        result
    }

    pub async fn bulk_delete(&self, ids: Vec<BookingId>) -> SyncResult<BulkOutcome> {
        if ids.is_empty() {
            return Err(ValidationError::empty_bulk("ids").into());
        }
        if ids.iter().any(BookingId::is_empty) {
            return Err(ValidationError::missing("id").into());
        }
        let _guard = self.inner.begin_mutation();
        let key = self.inner.key();

        let mut replaced = None;
        if self.inner.optimistic {
            let targets = ids.clone();
            let previous = self
                .inner
                .optimistic_write(
                    &key,
                    Box::new(move |page| {
                        page.map(|mut page| {
                            page.data.retain(|b| !targets.contains(&b.id));
                            page
                        })
                    }),
                )
                .await;
            replaced = Some(previous);
        }

        let result = self.inner.service.bulk_delete(&ids).await;
        self.inner.reconcile(&key, result.is_ok(), replaced).await;
        result
    }

    /// Undo of a bulk delete. Never applied optimistically.
    pub async fn bulk_restore(&self, bookings: Vec<Booking>) -> SyncResult<BulkOutcome> {
        if bookings.is_empty() {
            return Err(ValidationError::empty_bulk("bookings").into());
        }
        let _guard = self.inner.begin_mutation();
        let key = self.inner.key();

        let result = self.inner.service.bulk_restore(&bookings).await;
        self.inner.reconcile(&key, result.is_ok(), None).await;
        result
    }

    pub fn find_by_id(&self, id: &str) -> Option<Booking> {
        self.inner
            .view
            .borrow()
            .bookings
            .iter()
            .find(|b| b.id.as_str() == id)
            .cloned()
    }

    /// Bookings of the current view matching `predicate`.
    pub fn filter<P>(&self, predicate: P) -> Vec<Booking>
    where
        P: Fn(&Booking) -> bool,
    {
        self.inner
            .view
            .borrow()
            .bookings
            .iter()
            .filter(|b| predicate(b))
            .cloned()
            .collect()
    }

    /// Sorted copy of the current view; the view itself keeps server order.
    pub fn sorted_by<F>(&self, compare: F) -> Vec<Booking>
    where
        F: FnMut(&Booking, &Booking) -> CmpOrdering,
    {
        let mut bookings = self.inner.view.borrow().bookings.clone();
        bookings.sort_by(compare);
        bookings
    }
}

impl Drop for BookingsHook {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run(
    inner: Arc<HookInner>,
    shutdown: Arc<Notify>,
    mut bridge: Option<PushBridge>,
    mut events: broadcast::Receiver<CacheEvent>,
    refresh: Option<Duration>,
) {
    let mut poll = refresh.map(|period| {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    });

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            burst = next_burst(&mut bridge) => match burst {
                Some(burst) => {
                    let _ = inner.catch_up(burst).await;
                }
                None => {
                    tracing::debug!("push channel closed");
                    bridge = None;
                }
            },
            event = events.recv() => match event {
                Ok(CacheEvent::Updated(key)) => inner.sync_view(&key),
                Ok(CacheEvent::Invalidated(key)) if key == inner.key() => {
                    let _ = inner.reload().await;
                }
                Ok(CacheEvent::Invalidated(_)) => {}
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "cache events lagged, reloading");
                    let _ = inner.load().await;
                }
                Err(RecvError::Closed) => break,
            },
            _ = tick(&mut poll) => {
                tracing::debug!(key = %inner.key(), "polling");
                let _ = inner.revalidate().await;
            }
        }
    }
}

async fn next_burst(bridge: &mut Option<PushBridge>) -> Option<PushBurst> {
    match bridge {
        Some(bridge) => bridge.next_burst().await,
        None => std::future::pending().await,
    }
}

async fn tick(poll: &mut Option<Interval>) {
    match poll {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
