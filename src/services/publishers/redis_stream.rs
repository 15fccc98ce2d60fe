use redis::{AsyncCommands, Client};

use super::EventPublisher;
use crate::error::{AppError, AppResult};

/// Appends events to a Redis stream named after the topic (`XADD topic * payload <json>`)
#[derive(Clone)]
pub struct RedisStreamPublisher {
    redis_client: Client,
    /// Approximate cap on stream length, `None` keeps everything
    max_len: Option<usize>,
}

impl RedisStreamPublisher {
    pub fn new(redis_client: Client) -> Self {
        Self {
            redis_client,
            max_len: Some(100_000),
        }
    }

    pub fn with_max_len(mut self, max_len: Option<usize>) -> Self {
        self.max_len = max_len;
        self
    }
}

#[async_trait::async_trait]
impl EventPublisher for RedisStreamPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> AppResult<()> {
        let mut conn = self
            .redis_client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::NotifierFailure(e.to_string()))?;

        let items = [("payload", payload)];
        let result: redis::RedisResult<String> = match self.max_len {
            Some(max_len) => {
                conn.xadd_maxlen(
                    topic,
                    redis::streams::StreamMaxlen::Approx(max_len),
                    "*",
                    &items,
                )
                .await
            }
            None => conn.xadd(topic, "*", &items).await,
        };

        let id = result.map_err(|e| AppError::NotifierFailure(e.to_string()))?;
        tracing::debug!(topic = %topic, id = %id, "Published response event");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis_stream"
    }
}
