//! Rate Limiting Infrastructure
//!
//! Common rate limiting abstractions and implementations.

use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 200,
            window: Duration::from_secs(3600),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window.as_millis() as i64
    }
}

/// Rate limit check result
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at_ms: i64,
    /// Seconds until the window resets, rounded up
    pub retry_after_secs: u64,
}

/// Trait for rate limit storage backends
#[trait_variant::make(RateLimitStore: Send)]
pub trait LocalRateLimitStore {
    /// Check and increment rate limit counter
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, Box<dyn std::error::Error + Send + Sync>>;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at_ms: i64,
    count: u32,
}

/// Per-process fixed window counters
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    windows: DashMap<String, Window>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request for `key` at `now_ms`
    pub fn hit(&self, key: &str, config: &RateLimitConfig, now_ms: i64) -> RateLimitResult {
        let window_ms = config.window_ms();
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started_at_ms: now_ms,
            count: 0,
        });

        if now_ms - entry.started_at_ms >= window_ms {
            *entry = Window {
                started_at_ms: now_ms,
                count: 0,
            };
        }

        let allowed = entry.count < config.max_requests;
        if allowed {
            entry.count += 1;
        }

        let reset_at_ms = entry.started_at_ms + window_ms;
        let retry_after_ms = (reset_at_ms - now_ms).max(0) as u64;

        RateLimitResult {
            allowed,
            remaining: config.max_requests.saturating_sub(entry.count),
            reset_at_ms,
            retry_after_secs: retry_after_ms.div_ceil(1000),
        }
    }

    /// Drop windows that ended before `now_ms`. Returns how many were removed.
    pub fn purge_expired(&self, window: Duration, now_ms: i64) -> usize {
        let window_ms = window.as_millis() as i64;
        let before = self.windows.len();
        self.windows.retain(|_, w| now_ms - w.started_at_ms < window_ms);
        before - self.windows.len()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl RateLimitStore for InMemoryRateLimitStore {
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.hit(key, config, Utc::now().timestamp_millis()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit() {
        let store = InMemoryRateLimitStore::new();
        let config = RateLimitConfig::new(3, 60);

        for expected_remaining in [2, 1, 0] {
            let result = store.hit("ip:1.2.3.4", &config, 1_000);
            assert!(result.allowed);
            assert_eq!(result.remaining, expected_remaining);
        }

        let result = store.hit("ip:1.2.3.4", &config, 2_000);
        assert!(!result.allowed);
        assert_eq!(result.remaining, 0);
        assert_eq!(result.reset_at_ms, 61_000);
        assert_eq!(result.retry_after_secs, 59);
    }

    #[test]
    fn test_keys_are_independent() {
        let store = InMemoryRateLimitStore::new();
        let config = RateLimitConfig::new(1, 60);

        assert!(store.hit("user:1:user", &config, 0).allowed);
        assert!(!store.hit("user:1:user", &config, 10).allowed);
        assert!(store.hit("user:2:user", &config, 10).allowed);
    }

    #[test]
    fn test_window_resets() {
        let store = InMemoryRateLimitStore::new();
        let config = RateLimitConfig::new(1, 1);

        assert!(store.hit("k", &config, 0).allowed);
        assert!(!store.hit("k", &config, 999).allowed);
        assert!(store.hit("k", &config, 1_000).allowed);
    }

    #[test]
    fn test_purge_expired() {
        let store = InMemoryRateLimitStore::new();
        let config = RateLimitConfig::new(5, 10);

        store.hit("old", &config, 0);
        store.hit("new", &config, 9_000);

        assert_eq!(store.purge_expired(config.window, 12_000), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_default_quota() {
        let config = RateLimitConfig::default();
        assert_eq!(config.max_requests, 200);
        assert_eq!(config.window_ms(), 3_600_000);
    }

    #[tokio::test]
    async fn test_store_trait() {
        let store = InMemoryRateLimitStore::new();
        let config = RateLimitConfig::new(1, 60);
        let first = RateLimitStore::check_and_increment(&store, "k", &config)
            .await
            .unwrap();
        let second = RateLimitStore::check_and_increment(&store, "k", &config)
            .await
            .unwrap();
        assert!(first.allowed);
        assert!(!second.allowed);
    }
}
