//! Synchronization layer configuration.

use std::time::Duration;

/// Tunables shared by the cache, service and every hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Base URL prepended to API paths by the HTTP transport.
    pub api_base_url: String,
    /// Optional bearer token for the HTTP transport.
    pub auth_token: Option<String>,
    /// Identical reads within this window share one request.
    pub dedup_interval: Duration,
    /// Push events arriving within this window trigger a single revalidation.
    pub push_debounce: Duration,
    pub revalidate_on_focus: bool,
    pub revalidate_on_reconnect: bool,
    /// Background polling; `None` disables it.
    pub refresh_interval: Option<Duration>,
    pub optimistic_updates: bool,
    /// `take` sent with the month shorthand when the caller does not set one.
    pub default_take: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:4000".to_string(),
            auth_token: None,
            dedup_interval: Duration::from_secs(60),
            push_debounce: Duration::from_millis(250),
            revalidate_on_focus: false,
            revalidate_on_reconnect: false,
            refresh_interval: None,
            optimistic_updates: true,
            default_take: 1000,
        }
    }
}

impl SyncConfig {
    /// Read overrides from the process environment.
    ///
    /// - `BOOKINGS_API_URL`
    /// - `BOOKINGS_AUTH_TOKEN`
    /// - `BOOKINGS_DEDUP_MS`
    /// - `BOOKINGS_PUSH_DEBOUNCE_MS`
    /// - `BOOKINGS_REFRESH_MS` (0 disables polling)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("BOOKINGS_API_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(token) = lookup("BOOKINGS_AUTH_TOKEN").filter(|t| !t.is_empty()) {
            config.auth_token = Some(token);
        }
        if let Some(ms) = millis(&lookup, "BOOKINGS_DEDUP_MS") {
            config.dedup_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = millis(&lookup, "BOOKINGS_PUSH_DEBOUNCE_MS") {
            config.push_debounce = Duration::from_millis(ms);
        }
        if let Some(ms) = millis(&lookup, "BOOKINGS_REFRESH_MS") {
            config.refresh_interval = (ms > 0).then(|| Duration::from_millis(ms));
        }

        config
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_dedup_interval(mut self, interval: Duration) -> Self {
        self.dedup_interval = interval;
        self
    }

    pub fn with_push_debounce(mut self, window: Duration) -> Self {
        self.push_debounce = window;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    pub fn with_optimistic_updates(mut self, enabled: bool) -> Self {
        self.optimistic_updates = enabled;
        self
    }

    pub fn with_focus_revalidation(mut self, on_focus: bool, on_reconnect: bool) -> Self {
        self.revalidate_on_focus = on_focus;
        self.revalidate_on_reconnect = on_reconnect;
        self
    }
}

fn millis<F>(lookup: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(ms),
        Err(err) => {
            tracing::warn!(key, value = %raw, "ignoring malformed duration: {err}");
            None
        }
    }
}
