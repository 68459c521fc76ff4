use async_trait::async_trait;
use serde::Serialize;
use crate::BoxError;

pub const TOPIC_BOOKING_CREATED: &str = "booking.created";
pub const TOPIC_PAYMENT_STATUS: &str = "booking.payment_status";
pub const TOPIC_SLOT_UPDATED: &str = "availability.updated";

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), BoxError>;
}

/// Serializes `event` and publishes it. Failures are logged, never returned:
/// events are best effort.
pub async fn publish_json<E: Serialize + Sync>(publisher: &dyn EventPublisher, topic: &str, key: &str, event: &E) {
    match serde_json::to_string(event) {
        Ok(payload) => {
            if let Err(e) = publisher.publish(topic, key, &payload).await {
                tracing::warn!("Failed to publish {} event for {}: {}", topic, key, e);
            }
        }
        Err(e) => tracing::error!("Failed to serialize {} event: {}", topic, e),
    }
}
