//! Task queue using Redis Streams.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamClaimReply, StreamId, StreamPendingCountReply, StreamReadReply};
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use vpipe_models::TranscodeTask;

use crate::broker::{Delivery, TaskBroker};
use crate::error::{QueueError, QueueResult};

/// Stream entry field holding the JSON task.
pub const PAYLOAD_FIELD: &str = "payload";
/// Stream entry field holding the payload's media type.
pub const CONTENT_TYPE_FIELD: &str = "content_type";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Retry counters expire after a day.
const RETRY_KEY_TTL_SECS: i64 = 86_400;

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream name for transcode tasks
    pub stream_name: String,
    /// Consumer group name
    pub consumer_group: String,
    /// Dead letter queue stream name
    pub dlq_stream_name: String,
    /// Failed attempts allowed before DLQ
    pub max_retries: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "vpipe:transcode".to_string(),
            consumer_group: "vpipe:workers".to_string(),
            dlq_stream_name: "vpipe:transcode:dlq".to_string(),
            max_retries: 3,
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            stream_name: std::env::var("QUEUE_STREAM").unwrap_or(defaults.stream_name),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or(defaults.consumer_group),
            dlq_stream_name: std::env::var("QUEUE_DLQ_STREAM").unwrap_or(defaults.dlq_stream_name),
            max_retries: std::env::var("QUEUE_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
        }
    }

    fn retry_key(&self, message_id: &str) -> String {
        format!("{}:retry:{}", self.stream_name, message_id)
    }
}

/// Redis Streams task queue client.
pub struct TaskQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl TaskQueue {
    /// Create a new task queue.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    async fn conn(&self) -> QueueResult<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::connection_failed(e.to_string()))
    }

    /// Initialize the queue (create consumer group if not exists).
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.conn().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(()) => info!("Created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("Consumer group already exists: {}", self.config.consumer_group);
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    /// Publish a transcode task.
    pub async fn publish(&self, task: &TranscodeTask) -> QueueResult<String> {
        let mut conn = self.conn().await?;
        let payload = task.to_json()?;

        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg(PAYLOAD_FIELD)
            .arg(&payload)
            .arg(CONTENT_TYPE_FIELD)
            .arg(JSON_CONTENT_TYPE)
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::publish_failed(e.to_string()))?;

        info!(
            video_id = task.video_id,
            "Published transcode task with message ID {}", message_id
        );
        Ok(message_id)
    }

    /// Append the commands that remove a settled message and its retry counter.
    fn push_settle(&self, pipe: &mut redis::Pipeline, message_id: &str) {
        pipe.cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .ignore()
            .cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(message_id)
            .ignore()
            .cmd("DEL")
            .arg(self.config.retry_key(message_id))
            .ignore();
    }

    /// DLQ copy and settlement in one MULTI/EXEC, so a retried call cannot
    /// leave a second copy behind.
    fn dead_letter_pipeline(&self, delivery: &Delivery, reason: &str) -> redis::Pipeline {
        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("XADD")
            .arg(&self.config.dlq_stream_name)
            .arg("*")
            .arg(PAYLOAD_FIELD)
            .arg(&delivery.payload)
            .arg("error")
            .arg(reason)
            .arg("original_id")
            .arg(&delivery.message_id)
            .ignore();
        self.push_settle(&mut pipe, &delivery.message_id);
        pipe
    }

    /// Get queue length.
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.conn().await?;
        let len: u64 = conn.xlen(&self.config.stream_name).await?;
        Ok(len)
    }

    /// Get DLQ length.
    pub async fn dlq_len(&self) -> QueueResult<u64> {
        let mut conn = self.conn().await?;
        let len: u64 = conn.xlen(&self.config.dlq_stream_name).await?;
        Ok(len)
    }
}

fn to_delivery(entry: StreamId) -> Delivery {
    let payload = match entry.map.get(PAYLOAD_FIELD) {
        Some(redis::Value::BulkString(bytes)) => bytes.clone(),
        Some(redis::Value::SimpleString(s)) => s.clone().into_bytes(),
        _ => Vec::new(),
    };
    Delivery::new(entry.id, payload)
}

#[async_trait]
impl TaskBroker for TaskQueue {
    async fn receive(&self, consumer: &str, block: Duration, count: usize) -> QueueResult<Vec<Delivery>> {
        let mut conn = self.conn().await?;

        let reply: Option<StreamReadReply> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block.as_millis() as u64)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        let deliveries: Vec<Delivery> = reply
            .map(|r| r.keys)
            .unwrap_or_default()
            .into_iter()
            .flat_map(|key| key.ids)
            .map(to_delivery)
            .collect();

        if !deliveries.is_empty() {
            debug!("Received {} messages from stream", deliveries.len());
        }
        Ok(deliveries)
    }

    async fn claim_stale(
        &self,
        consumer: &str,
        min_idle: Duration,
        count: usize,
    ) -> QueueResult<Vec<Delivery>> {
        let mut conn = self.conn().await?;
        let min_idle_ms = min_idle.as_millis() as u64;

        let pending: StreamPendingCountReply = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("IDLE")
            .arg(min_idle_ms)
            .arg("-")
            .arg("+")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        if pending.ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut cmd = redis::cmd("XCLAIM");
        cmd.arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer)
            .arg(min_idle_ms);
        for entry in &pending.ids {
            cmd.arg(&entry.id);
        }

        let claimed: StreamClaimReply = cmd.query_async(&mut conn).await?;
        let deliveries: Vec<Delivery> = claimed.ids.into_iter().map(to_delivery).collect();

        if !deliveries.is_empty() {
            info!("Claimed {} stale pending messages", deliveries.len());
        }
        Ok(deliveries)
    }

    async fn touch(&self, consumer: &str, message_id: &str) -> QueueResult<bool> {
        let mut conn = self.conn().await?;

        let claimed: Vec<String> = redis::cmd("XCLAIM")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer)
            .arg(0)
            .arg(message_id)
            .arg("JUSTID")
            .query_async(&mut conn)
            .await?;

        Ok(!claimed.is_empty())
    }

    async fn ack(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.conn().await?;

        let mut pipe = redis::pipe();
        self.push_settle(&mut pipe, message_id);
        pipe.query_async::<()>(&mut conn).await?;

        debug!("Acknowledged message: {}", message_id);
        Ok(())
    }

    async fn reject(&self, message_id: &str) -> QueueResult<()> {
        self.ack(message_id).await?;
        warn!("Rejected message {} without requeue", message_id);
        Ok(())
    }

    async fn dead_letter(&self, delivery: &Delivery, reason: &str) -> QueueResult<()> {
        let mut conn = self.conn().await?;

        self.dead_letter_pipeline(delivery, reason)
            .query_async::<()>(&mut conn)
            .await?;

        warn!("Moved message {} to DLQ: {}", delivery.message_id, reason);
        Ok(())
    }

    async fn record_attempt(&self, message_id: &str) -> QueueResult<u32> {
        let mut conn = self.conn().await?;

        let key = self.config.retry_key(message_id);
        let count: u32 = conn.incr(&key, 1).await?;
        conn.expire::<_, ()>(&key, RETRY_KEY_TTL_SECS).await?;
        Ok(count)
    }

    fn max_retries(&self) -> u32 {
        self.config.max_retries
    }
}
