//! Read-through cache with single-flight computation.
//!
//! A miss is computed by exactly one caller per key (the leader); callers that
//! arrive while the computation runs wait on the leader's outcome instead of
//! recomputing it. The in-flight marker is owned by a guard, so a leader that
//! is dropped (timeout, disconnected client) releases the key and one of the
//! waiters takes over.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::watch;

use crate::error::{AppError, AppResult};

pub mod backend;
pub mod key;

pub use backend::{CacheBackend, CacheEntry, MemoryCacheBackend};
pub use key::CacheKey;

/// Outcome a leader hands to its waiters; `None` until the computation ends
type FlightOutcome = Option<AppResult<String>>;

enum Flight {
    Leader(FlightGuard),
    Follower(watch::Receiver<FlightOutcome>),
}

/// Ownership of an in-flight marker
struct FlightGuard {
    key: String,
    registry: Arc<DashMap<String, watch::Receiver<FlightOutcome>>>,
    tx: watch::Sender<FlightOutcome>,
}

impl FlightGuard {
    fn complete(self, outcome: AppResult<String>) {
        // Waiters still hold receivers, a send error only means nobody waited
        let _ = self.tx.send(Some(outcome));
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        // Removing before `tx` drops lets woken waiters find the key free
        self.registry.remove(&self.key);
    }
}

/// Bound on a single backend call before it counts as unavailable
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_millis(250);

/// Cache handler in front of the recommendation algorithms
#[derive(Clone)]
pub struct RecommendationCache {
    backend: Arc<dyn CacheBackend>,
    backend_timeout: Duration,
    in_flight: Arc<DashMap<String, watch::Receiver<FlightOutcome>>>,
}

impl RecommendationCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            backend_timeout: DEFAULT_BACKEND_TIMEOUT,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Bounds every backend `get` and `set_ex`; a stalled backend then
    /// degrades to a miss or a skipped store instead of holding the request
    pub fn with_backend_timeout(mut self, backend_timeout: Duration) -> Self {
        self.backend_timeout = backend_timeout;
        self
    }

    /// Number of keys currently being computed
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Returns the cached value for `key`, computing and storing it on a miss
    ///
    /// Backend failures never fail the call: lookups degrade to misses and
    /// stores are logged and skipped. Errors returned by `compute` are shared
    /// with concurrent waiters and are not cached.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        compute: F,
    ) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let key = key.to_string();

        if let Some(value) = self.lookup(&key).await {
            tracing::debug!(key = %key, "Cache hit");
            return Ok(value);
        }

        let mut compute = Some(compute);
        loop {
            match self.join_flight(&key) {
                Flight::Leader(flight) => {
                    // A leader that finished between our lookup and now has stored its value
                    if let Some(raw) = self.lookup_raw(&key).await {
                        if let Ok(value) = serde_json::from_str::<T>(&raw) {
                            tracing::debug!(key = %key, "Cache hit after acquiring flight");
                            flight.complete(Ok(raw));
                            return Ok(value);
                        }
                    }

                    tracing::debug!(key = %key, "Cache miss, computing");
                    let compute = compute.take().ok_or_else(|| {
                        AppError::Internal(format!("computation for '{}' already consumed", key))
                    })?;

                    let result = compute().await.and_then(|value| {
                        let raw = serde_json::to_string(&value)?;
                        Ok((value, raw))
                    });

                    return match result {
                        Ok((value, raw)) => {
                            self.store(&key, &raw, ttl).await;
                            flight.complete(Ok(raw));
                            Ok(value)
                        }
                        Err(err) => {
                            flight.complete(Err(err.clone()));
                            Err(err)
                        }
                    };
                }
                Flight::Follower(mut rx) => {
                    tracing::debug!(key = %key, "Waiting on in-flight computation");
                    let outcome = match rx.wait_for(Option::is_some).await {
                        Ok(outcome) => outcome.clone(),
                        // Leader dropped without an outcome; race for the key again
                        Err(_) => continue,
                    };

                    match outcome {
                        Some(Ok(raw)) => return Ok(serde_json::from_str(&raw)?),
                        Some(Err(err)) => return Err(err),
                        None => continue,
                    }
                }
            }
        }
    }

    /// [`get_or_compute`](Self::get_or_compute) bounded by `timeout`
    ///
    /// On expiry the caller gets `ComputeTimeout` and, if it was the leader,
    /// its in-flight marker is released.
    pub async fn get_or_compute_within<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        timeout: Duration,
        compute: F,
    ) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        match tokio::time::timeout(timeout, self.get_or_compute(key, ttl, compute)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    key = %key,
                    timeout_ms = timeout.as_millis() as u64,
                    "Computation timed out"
                );
                Err(AppError::ComputeTimeout(key.to_string()))
            }
        }
    }

    /// Atomic check-and-insert on the in-flight registry
    fn join_flight(&self, key: &str) -> Flight {
        match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(entry) => Flight::Follower(entry.get().clone()),
            Entry::Vacant(entry) => {
                let (tx, rx) = watch::channel(None);
                entry.insert(rx);
                Flight::Leader(FlightGuard {
                    key: key.to_string(),
                    registry: Arc::clone(&self.in_flight),
                    tx,
                })
            }
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.lookup_raw(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    async fn lookup_raw(&self, key: &str) -> Option<String> {
        let lookup = tokio::time::timeout(self.backend_timeout, self.backend.get(key));
        match lookup.await.unwrap_or_else(|_| Err(self.stalled("get"))) {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!(
                    key = %key,
                    backend = self.backend.name(),
                    error = %e,
                    "Cache lookup failed, computing directly"
                );
                None
            }
        }
    }

    async fn store(&self, key: &str, raw: &str, ttl: Duration) {
        let write = tokio::time::timeout(
            self.backend_timeout,
            self.backend.set_ex(key, raw.to_string(), ttl),
        );
        if let Err(e) = write.await.unwrap_or_else(|_| Err(self.stalled("set_ex"))) {
            tracing::warn!(
                key = %key,
                backend = self.backend.name(),
                error = %e,
                "Cache store failed"
            );
        }
    }

    fn stalled(&self, operation: &str) -> AppError {
        AppError::CacheUnavailable(format!(
            "{} {} timed out after {}ms",
            self.backend.name(),
            operation,
            self.backend_timeout.as_millis()
        ))
    }
}
