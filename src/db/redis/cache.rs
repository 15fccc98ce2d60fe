use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use redis::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::cache::CacheBackend;
use crate::error::{AppError, AppResult};

/// Bound on establishing the shared connection
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Creates a Redis client for caching
///
/// Opening a client only validates the URL; the connection is established on
/// first use, so an unreachable server surfaces as `CacheUnavailable` at call
/// time rather than at startup.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Redis TTLs are whole seconds; round up so short TTLs never become zero
fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

/// Cache backend storing serialized rankings in Redis with `SETEX`
///
/// All operations share one reconnecting `ConnectionManager`. A failed
/// connect leaves the slot empty and the next call tries again.
#[derive(Clone)]
pub struct RedisCacheBackend {
    redis_client: Client,
    connection: Arc<OnceCell<ConnectionManager>>,
}

impl RedisCacheBackend {
    pub fn new(redis_client: Client) -> Self {
        Self {
            redis_client,
            connection: Arc::new(OnceCell::new()),
        }
    }

    async fn connection(&self) -> AppResult<ConnectionManager> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                let connect = ConnectionManager::new(self.redis_client.clone());
                tokio::time::timeout(CONNECT_TIMEOUT, connect)
                    .await
                    .map_err(|_| {
                        AppError::CacheUnavailable(format!(
                            "redis connect timed out after {}ms",
                            CONNECT_TIMEOUT.as_millis()
                        ))
                    })?
                    .map_err(AppError::from)
            })
            .await?;
        Ok(manager.clone())
    }
}

#[async_trait::async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.connection().await?;
        let cached: Option<String> = conn.get(key).await?;
        Ok(cached)
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> AppResult<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.set_ex(key, value, ttl_secs(ttl)).await?;
        tracing::debug!(key = %key, ttl = ttl_secs(ttl), "Cached ranking");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

// Round-trip tests need a live server; they run only when REDIS_URL is set.
