use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{AppError, AppResult};
use crate::models::UserId;
use crate::services::publishers::EventPublisher;

/// Fire-and-forget publication of served responses
///
/// Events go into a bounded queue drained by a background task, so publish
/// latency and failures never reach the request path. Delivery is at most
/// once: a full queue drops the event.
#[derive(Clone)]
pub struct EventNotifier {
    topic: Arc<str>,
    queue_tx: mpsc::Sender<String>,
}

/// Handle for gracefully shutting down the notifier worker
pub struct NotifierHandle {
    shutdown_tx: mpsc::Sender<()>,
    worker: JoinHandle<()>,
}

impl NotifierHandle {
    /// Signals the worker and waits until every queued event has been handed
    /// to the publisher
    pub async fn shutdown(self) -> AppResult<()> {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Notifier shutdown signal sent");
        self.worker
            .await
            .map_err(|e| AppError::Internal(format!("notifier worker failed: {}", e)))
    }
}

impl EventNotifier {
    /// Creates a notifier and spawns its publishing worker
    pub fn new(
        publisher: Arc<dyn EventPublisher>,
        topic: impl Into<String>,
        capacity: usize,
    ) -> (Self, NotifierHandle) {
        let topic: Arc<str> = Arc::from(topic.into());
        let (queue_tx, queue_rx) = mpsc::channel(capacity.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let worker = tokio::spawn(Self::publish_task(
            publisher,
            Arc::clone(&topic),
            queue_rx,
            shutdown_rx,
        ));

        let notifier = Self { topic, queue_tx };
        let handle = NotifierHandle {
            shutdown_tx,
            worker,
        };

        (notifier, handle)
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Queues `body` for publication with the originating user id added
    ///
    /// Never blocks. Returns `NotifierFailure` when the event could not be
    /// queued; callers log and carry on.
    pub fn notify<T: Serialize>(&self, user_id: Option<&UserId>, body: &T) -> AppResult<()> {
        let payload = event_payload(user_id, body)
            .map_err(|e| AppError::NotifierFailure(format!("unserializable event: {}", e)))?;

        self.queue_tx.try_send(payload).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                AppError::NotifierFailure("event queue full, event dropped".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                AppError::NotifierFailure("notifier stopped, event dropped".to_string())
            }
        })
    }

    /// Background task that publishes queued events
    ///
    /// On shutdown the queue is closed and drained before the task exits.
    async fn publish_task(
        publisher: Arc<dyn EventPublisher>,
        topic: Arc<str>,
        mut queue_rx: mpsc::Receiver<String>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(publisher = publisher.name(), topic = %topic, "Notifier task started");

        loop {
            tokio::select! {
                Some(payload) = queue_rx.recv() => {
                    Self::publish_one(publisher.as_ref(), &topic, &payload).await;
                }
                _ = shutdown_rx.recv() => {
                    queue_rx.close();
                    let mut flushed = 0;
                    while let Some(payload) = queue_rx.recv().await {
                        Self::publish_one(publisher.as_ref(), &topic, &payload).await;
                        flushed += 1;
                    }
                    tracing::info!(flushed, "Notifier task stopped");
                    break;
                }
            }
        }
    }

    async fn publish_one(publisher: &dyn EventPublisher, topic: &str, payload: &str) {
        if let Err(e) = publisher.publish(topic, payload).await {
            tracing::error!(
                publisher = publisher.name(),
                topic = %topic,
                error = %e,
                "Failed to publish response event"
            );
        }
    }
}

/// The response body as a JSON object carrying the originating user id
pub fn event_payload<T: Serialize>(user_id: Option<&UserId>, body: &T) -> AppResult<String> {
    let mut value = serde_json::to_value(body)?;
    if let Value::Object(map) = &mut value {
        if !map.contains_key("user_id") {
            let user = match user_id {
                Some(id) => Value::String(id.to_string()),
                None => Value::Null,
            };
            map.insert("user_id".to_string(), user);
        }
    }
    Ok(serde_json::to_string(&value)?)
}
