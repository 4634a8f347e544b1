//! TTL Result Cache
//!
//! Shared key/value store with a per-entry time-to-live.
//! - Expired entries are never returned by `get`
//! - `sweep` drops expired entries; `spawn_sweeper` runs it periodically
//!
//! Time is read from `tokio::time::Instant` so paused-clock tests can advance it.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL applied when `set` receives none (default: 300s)
    pub default_ttl_secs: u64,
    /// Background sweep interval (default: 30s)
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 300,
            sweep_interval_secs: 30,
        }
    }
}

/// Cache entry with TTL tracking
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    pub fn is_valid(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
}

#[derive(Debug)]
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
}

/// Job-level result cache
pub type ResultCache = TtlCache<serde_json::Value>;

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.default_ttl_secs))
    }

    /// Value for `key` if present and not expired
    pub async fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .get(key)
            .filter(|entry| entry.is_valid(now))
            .map(|entry| entry.value.clone())
    }

    /// Insert `value`, expiring after `ttl` or the default TTL
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let expires_at = Instant::now() + ttl.unwrap_or(self.default_ttl);
        self.entries
            .write()
            .await
            .insert(key.into(), CacheEntry { value, expires_at });
    }

    /// Remove `key`, returning whether it was present
    pub async fn del(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    pub async fn flush(&self) {
        self.entries.write().await.clear();
    }

    /// Drop expired entries, returning how many were removed
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_valid(now));
        before - entries.len()
    }

    pub async fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.entries.read().await;
        let valid = entries.values().filter(|e| e.is_valid(now)).count();
        CacheStats {
            total_entries: entries.len(),
            valid_entries: valid,
            expired_entries: entries.len() - valid,
        }
    }

    /// Sweep every `interval` until the cache is dropped
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let removed = cache.sweep().await;
                if removed > 0 {
                    tracing::debug!(removed, "Swept expired cache entries");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_cache() -> TtlCache<String> {
        TtlCache::new(Duration::from_secs(300))
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = create_test_cache();
        cache
            .set("key", "value".to_string(), Some(Duration::from_millis(100)))
            .await;

        tokio::time::advance(Duration::from_millis(50)).await;
        assert_eq!(cache.get("key").await, Some("value".to_string()));

        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(cache.get("key").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl() {
        let cache = create_test_cache();
        cache.set("key", "value".to_string(), None).await;

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get("key").await.is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("key").await.is_none());
    }

    #[tokio::test]
    async fn test_del_and_flush() {
        let cache = create_test_cache();
        cache.set("a", "1".to_string(), None).await;
        cache.set("b", "2".to_string(), None).await;

        assert!(cache.del("a").await);
        assert!(!cache.del("a").await);
        assert_eq!(cache.get("b").await, Some("2".to_string()));

        cache.flush().await;
        assert_eq!(cache.stats().await.total_entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_expired() {
        let cache = create_test_cache();
        cache.set("short", "x".to_string(), Some(Duration::from_secs(1))).await;
        cache.set("long", "y".to_string(), Some(Duration::from_secs(60))).await;

        tokio::time::advance(Duration::from_secs(2)).await;
        let stats = cache.stats().await;
        assert_eq!(stats.expired_entries, 1);
        assert_eq!(stats.valid_entries, 1);

        assert_eq!(cache.sweep().await, 1);
        assert_eq!(cache.stats().await.total_entries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_sweeper() {
        let cache = Arc::new(create_test_cache());
        cache.set("short", "x".to_string(), Some(Duration::from_secs(1))).await;
        let handle = cache.spawn_sweeper(Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(cache.stats().await.total_entries, 0);

        drop(cache);
        tokio::time::sleep(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_json_result_cache() {
        let cache = ResultCache::from_config(&CacheConfig::default());
        cache.set("scraping_results_1", serde_json::json!([{"id": "pepe"}]), None).await;

        let value = cache.get("scraping_results_1").await.unwrap();
        assert_eq!(value[0]["id"], "pepe");
    }
}
