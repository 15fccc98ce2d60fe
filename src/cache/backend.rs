use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::AppResult;

/// Key-value store behind the recommendation cache
///
/// Mirrors the `GET` / `SETEX` subset of Redis. Errors are reported as
/// `CacheUnavailable` and the cache layer fails open on them.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> AppResult<()>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// A stored value with its expiry metadata
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: String,
    pub inserted_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) >= self.ttl
    }
}

/// Process-local backend with lazy expiry
#[derive(Clone, Default)]
pub struct MemoryCacheBackend {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drops every expired entry, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Purges expired entries every `every` until the runtime shuts down
    ///
    /// Lazy expiry only drops keys that are read again; this bounds memory
    /// for keys that never are.
    pub fn spawn_purge_task(&self, every: Duration) -> JoinHandle<()> {
        let backend = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = backend.purge_expired().await;
                if purged > 0 {
                    tracing::debug!(purged, "Purged expired cache entries");
                }
            }
        })
    }
}

#[async_trait::async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> AppResult<()> {
        let entry = CacheEntry {
            value,
            inserted_at: Instant::now(),
            ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
