//! State-change event publishing.
//!
//! Fire-and-forget: delivery is best-effort and never gates the store write
//! that produced the event.

use crate::models::Payment;
use async_trait::async_trait;
use service_core::error::AppError;
use std::sync::Mutex;

pub const PAYMENT_CONFIRMED_TOPIC: &str = "payment.confirmed";
pub const PAYMENT_FAILED_TOPIC: &str = "payment.failed";
pub const PAYMENT_REFUNDED_TOPIC: &str = "payment.refunded";

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), AppError>;
}

/// Serialize a payment and publish it to the given topic.
pub async fn publish_payment(
    publisher: &dyn EventPublisher,
    topic: &str,
    payment: &Payment,
) -> Result<(), AppError> {
    let payload =
        serde_json::to_vec(payment).map_err(|e| AppError::EventError(anyhow::Error::new(e)))?;
    publisher.publish(topic, &payload).await
}

/// Publishes events on Redis pub/sub channels.
pub struct RedisEventPublisher {
    client: redis::Client,
}

impl RedisEventPublisher {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventPublisher for RedisEventPublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), AppError> {
        let mut con = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::EventError(anyhow::Error::new(e)))?;
        let _: () = redis::cmd("PUBLISH")
            .arg(topic)
            .arg(payload)
            .query_async(&mut con)
            .await
            .map_err(|e| AppError::EventError(anyhow::Error::new(e)))?;
        Ok(())
    }
}

/// Records published events in memory. Test double.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, Vec<u8>)>>,
    fail: bool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose every publish fails, for best-effort path tests.
    pub fn failing() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn topics(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(topic, _)| topic.clone())
            .collect()
    }

    pub fn published_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::EventError(anyhow::anyhow!("event bus down")));
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.to_vec()));
        Ok(())
    }
}
