//! Explicit dependency bundle shared by services and hooks.

use std::sync::Arc;

use bookingsync_events::PushChannel;

use crate::cache::{CacheProvider, SwrCache};
use crate::config::SyncConfig;
use crate::service::BookingService;
use crate::transport::Transport;

/// Transport, cache, optional push channel and configuration.
///
/// Build one per application (the cache inside is the process-wide instance)
/// and clone it into every hook; clones share all handles. A missing push
/// channel is `None`, never probed for at runtime.
#[derive(Clone)]
pub struct SyncContext {
    pub transport: Arc<dyn Transport>,
    pub cache: Arc<dyn CacheProvider>,
    pub push: Option<Arc<dyn PushChannel>>,
    pub config: SyncConfig,
}

impl SyncContext {
    pub fn new(transport: Arc<dyn Transport>, config: SyncConfig) -> Self {
        let cache = Arc::new(SwrCache::from_config(Arc::clone(&transport), &config));
        Self {
            transport,
            cache,
            push: None,
            config,
        }
    }

    pub fn with_push(mut self, push: Arc<dyn PushChannel>) -> Self {
        self.push = Some(push);
        self
    }

    /// Replace the default cache (e.g. to share one across contexts).
    pub fn with_cache(mut self, cache: Arc<dyn CacheProvider>) -> Self {
        self.cache = cache;
        self
    }

    pub fn service(&self) -> BookingService {
        BookingService::new(Arc::clone(&self.transport), Arc::clone(&self.cache))
            .with_default_take(self.config.default_take)
    }
}
