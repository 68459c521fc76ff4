use async_trait::async_trait;
use mexivanza_core::events::{EventPublisher, TOPIC_SLOT_UPDATED};
use mexivanza_core::BoxError;
use mexivanza_shared::models::events::SlotUpdatedEvent;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Forwards every event to the inner publisher and fans slot updates out to
/// SSE subscribers of this process.
pub struct BroadcastingPublisher {
    inner: Arc<dyn EventPublisher>,
    sse_tx: broadcast::Sender<SlotUpdatedEvent>,
}

impl BroadcastingPublisher {
    pub fn new(inner: Arc<dyn EventPublisher>, sse_tx: broadcast::Sender<SlotUpdatedEvent>) -> Self {
        Self { inner, sse_tx }
    }
}

#[async_trait]
impl EventPublisher for BroadcastingPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), BoxError> {
        if topic == TOPIC_SLOT_UPDATED {
            match serde_json::from_str::<SlotUpdatedEvent>(payload) {
                // No subscribers is not an error
                Ok(event) => {
                    let _ = self.sse_tx.send(event);
                }
                Err(e) => tracing::warn!("Dropping malformed slot update for {}: {}", key, e),
            }
        }
        self.inner.publish(topic, key, payload).await
    }
}
