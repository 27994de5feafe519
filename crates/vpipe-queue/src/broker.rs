//! Broker port used by the queue consumer.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::QueueResult;

/// One message handed to a consumer.
///
/// The payload is kept raw so undecodable messages can still be logged and
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub message_id: String,
    pub payload: Vec<u8>,
}

impl Delivery {
    pub fn new(message_id: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            message_id: message_id.into(),
            payload: payload.into(),
        }
    }

    /// Payload as text for log lines.
    pub fn payload_lossy(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Durable queue with manual acknowledgement.
///
/// A delivered message stays pending until it is acked, rejected or
/// dead-lettered; pending messages idle for long enough are handed out
/// again by [`TaskBroker::claim_stale`].
#[async_trait]
pub trait TaskBroker: Send + Sync {
    /// Wait up to `block` for new messages.
    async fn receive(&self, consumer: &str, block: Duration, count: usize) -> QueueResult<Vec<Delivery>>;

    /// Take over pending messages idle for at least `min_idle`.
    async fn claim_stale(
        &self,
        consumer: &str,
        min_idle: Duration,
        count: usize,
    ) -> QueueResult<Vec<Delivery>>;

    /// Reset the idle time of a message this consumer is still working on,
    /// so [`TaskBroker::claim_stale`] does not hand it to another consumer.
    ///
    /// Returns `false` when the message is no longer pending.
    async fn touch(&self, consumer: &str, message_id: &str) -> QueueResult<bool>;

    /// Remove a message after successful processing.
    async fn ack(&self, message_id: &str) -> QueueResult<()>;

    /// Remove a message that can never be processed, without keeping a copy.
    async fn reject(&self, message_id: &str) -> QueueResult<()>;

    /// Move a message to the dead-letter stream with a reason, then remove it.
    async fn dead_letter(&self, delivery: &Delivery, reason: &str) -> QueueResult<()>;

    /// Count one more failed attempt; returns the total so far.
    async fn record_attempt(&self, message_id: &str) -> QueueResult<u32>;

    /// Failed attempts allowed before a retryable message is dead-lettered.
    fn max_retries(&self) -> u32;
}
