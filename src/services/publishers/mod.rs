use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::AppResult;

#[cfg(feature = "kafka")]
pub mod kafka;
pub mod redis_stream;

#[cfg(feature = "kafka")]
pub use kafka::KafkaPublisher;
pub use redis_stream::RedisStreamPublisher;

/// Trait for external event streams
///
/// Publishers deliver one already-serialized event to `topic`. They are only
/// called from the notifier's background task.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: &str) -> AppResult<()>;

    /// Publisher name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Writes events to the log; for running without a broker
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPublisher;

#[async_trait::async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> AppResult<()> {
        tracing::info!(topic = %topic, payload = %payload, "Response event");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Keeps published events in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryPublisher {
    events: Arc<Mutex<Vec<(String, String)>>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Published `(topic, payload)` pairs in publication order
    pub async fn events(&self) -> Vec<(String, String)> {
        self.events.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl EventPublisher for MemoryPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> AppResult<()> {
        self.events
            .lock()
            .await
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
