use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use std::sync::Arc;
use std::time::Duration;

use super::EventPublisher;
use crate::error::{AppError, AppResult};

/// Kafka producer wrapper for response events
#[derive(Clone)]
pub struct KafkaPublisher {
    inner: Arc<FutureProducer>,
    send_timeout: Duration,
}

impl KafkaPublisher {
    pub fn new(brokers: &str) -> anyhow::Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("acks", "1")
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(|e| {
                anyhow::anyhow!("Failed to create Kafka producer for '{}': {}", brokers, e)
            })?;

        Ok(Self {
            inner: Arc::new(producer),
            send_timeout: Duration::from_secs(10),
        })
    }
}

#[async_trait::async_trait]
impl EventPublisher for KafkaPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> AppResult<()> {
        let record: FutureRecord<'_, (), str> = FutureRecord::to(topic).payload(payload);

        self.inner
            .send(record, self.send_timeout)
            .await
            .map_err(|(err, _)| AppError::NotifierFailure(format!("Kafka send failed: {}", err)))?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "kafka"
    }
}
