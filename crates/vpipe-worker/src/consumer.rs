//! Queue consumer.
//!
//! Pulls transcode tasks from the broker one at a time, hands them to a
//! [`TaskHandler`] and settles each message according to the outcome.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use vpipe_db::VideoRepository;
use vpipe_media::Encoder;
use vpipe_models::TranscodeTask;
use vpipe_queue::{Delivery, QueueResult, TaskBroker};
use vpipe_storage::ArtifactStore;

use crate::config::WorkerConfig;
use crate::error::{TranscodeError, WorkerResult};
use crate::metrics;
use crate::orchestrator::TranscodeOrchestrator;
use crate::retry::{retry_async, FailureTracker, RetryPolicy, RetryResult};

/// Receive errors logged before the tracker goes quiet.
const MAX_LOGGED_RECEIVE_FAILURES: u32 = 5;
const RECEIVE_BACKOFF_BASE: Duration = Duration::from_millis(500);
const RECEIVE_BACKOFF_MAX: Duration = Duration::from_secs(30);
const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(10);

/// Work performed for one decoded task.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: TranscodeTask) -> Result<(), TranscodeError>;
}

#[async_trait]
impl<E, S, R> TaskHandler for TranscodeOrchestrator<E, S, R>
where
    E: Encoder,
    S: ArtifactStore,
    R: VideoRepository,
{
    async fn handle(&self, task: TranscodeTask) -> Result<(), TranscodeError> {
        self.transcode(task.video_id).await.map(|_| ())
    }
}

/// How a delivery was settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Handled and acknowledged.
    Completed,
    /// Undecodable payload, rejected without requeue.
    Dropped,
    /// Retryable failure; the message stays pending for redelivery.
    Retrying { attempt: u32 },
    /// Moved to the dead-letter stream.
    DeadLettered,
    /// Settling the message failed; it stays pending and will be claimed again.
    Unsettled,
}

#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    pub consumer_name: String,
    pub poll_block: Duration,
    pub batch_size: usize,
    pub claim_interval: Duration,
    pub claim_min_idle: Duration,
}

impl ConsumerSettings {
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            consumer_name: config.consumer_name.clone(),
            poll_block: config.poll_block,
            batch_size: config.batch_size,
            claim_interval: config.claim_interval,
            claim_min_idle: config.claim_min_idle,
        }
    }

    /// How often an in-flight message's idle time is reset: a third of
    /// `claim_min_idle`, so other consumers never see it as stale.
    pub fn heartbeat_interval(&self) -> Duration {
        (self.claim_min_idle / 3).max(MIN_HEARTBEAT_INTERVAL)
    }
}

/// Sequential consumer over a [`TaskBroker`].
pub struct QueueConsumer<B, H> {
    broker: Arc<B>,
    handler: Arc<H>,
    settings: ConsumerSettings,
}

impl<B, H> QueueConsumer<B, H>
where
    B: TaskBroker,
    H: TaskHandler,
{
    pub fn new(broker: Arc<B>, handler: Arc<H>, settings: ConsumerSettings) -> Self {
        Self {
            broker,
            handler,
            settings,
        }
    }

    /// Consume until `shutdown` becomes `true`.
    ///
    /// A job that has started always runs to completion; the signal is only
    /// observed between jobs and while waiting for messages.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> WorkerResult<()> {
        info!(
            "Starting queue consumer '{}' (claim every {:?}, min idle {:?})",
            self.settings.consumer_name, self.settings.claim_interval, self.settings.claim_min_idle
        );

        let mut receive_failures = FailureTracker::new(MAX_LOGGED_RECEIVE_FAILURES);
        let mut next_claim = Instant::now();

        loop {
            if *shutdown.borrow() {
                break;
            }

            if Instant::now() >= next_claim {
                if let Err(e) = self.claim_stale().await {
                    warn!("Failed to claim stale messages: {}", e);
                }
                next_claim = Instant::now() + self.settings.claim_interval;
                continue;
            }

            let received = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown signal received, stopping consumer");
                        break;
                    }
                    continue;
                }
                result = self.broker.receive(
                    &self.settings.consumer_name,
                    self.settings.poll_block,
                    self.settings.batch_size,
                ) => result,
            };

            match received {
                Ok(deliveries) => {
                    receive_failures.record_success();
                    for delivery in &deliveries {
                        self.process_delivery(delivery).await;
                    }
                }
                Err(e) => {
                    if receive_failures.record_failure() {
                        error!("Error receiving tasks: {}", e);
                    }
                    let backoff = receive_failures.backoff(RECEIVE_BACKOFF_BASE, RECEIVE_BACKOFF_MAX);
                    tokio::select! {
                        _ = shutdown.changed() => {}
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }

        info!("Queue consumer stopped");
        Ok(())
    }

    /// Receive one batch and process it; returns how many messages arrived.
    pub async fn poll_once(&self) -> QueueResult<usize> {
        let deliveries = self
            .broker
            .receive(
                &self.settings.consumer_name,
                self.settings.poll_block,
                self.settings.batch_size,
            )
            .await?;

        for delivery in &deliveries {
            self.process_delivery(delivery).await;
        }
        Ok(deliveries.len())
    }

    /// Take over and process messages left pending by failed attempts or
    /// crashed consumers.
    pub async fn claim_stale(&self) -> QueueResult<usize> {
        let deliveries = self
            .broker
            .claim_stale(
                &self.settings.consumer_name,
                self.settings.claim_min_idle,
                self.settings.batch_size,
            )
            .await?;

        for delivery in &deliveries {
            self.process_delivery(delivery).await;
        }
        Ok(deliveries.len())
    }

    /// Decode, handle and settle one message.
    pub async fn process_delivery(&self, delivery: &Delivery) -> DeliveryOutcome {
        let message_id = delivery.message_id.as_str();

        let task = match TranscodeTask::from_slice(&delivery.payload) {
            Ok(task) => task,
            Err(e) => {
                warn!(
                    message_id,
                    payload = %delivery.payload_lossy(),
                    "Dropping malformed task: {}", e
                );
                metrics::record_dropped();
                return if self.settle("reject", || self.broker.reject(message_id)).await {
                    DeliveryOutcome::Dropped
                } else {
                    DeliveryOutcome::Unsettled
                };
            }
        };

        debug!(message_id, video_id = task.video_id, "Handling transcode task");

        let err = match self.handle_leased(message_id, task).await {
            Ok(()) => {
                return if self.settle("ack", || self.broker.ack(message_id)).await {
                    DeliveryOutcome::Completed
                } else {
                    DeliveryOutcome::Unsettled
                };
            }
            Err(err) => err,
        };

        let retryable = err.is_retryable();
        metrics::record_failed(err.kind(), retryable);

        if !retryable {
            warn!(message_id, video_id = task.video_id, "Terminal failure: {}", err);
            return self.dead_letter(delivery, &err.to_string()).await;
        }

        match self.broker.record_attempt(message_id).await {
            Ok(attempt) if attempt >= self.broker.max_retries() => {
                warn!(
                    message_id,
                    video_id = task.video_id,
                    "Task exceeded max retries ({}), moving to DLQ: {}",
                    self.broker.max_retries(),
                    err
                );
                self.dead_letter(delivery, &format!("gave up after {} attempts: {}", attempt, err))
                    .await
            }
            Ok(attempt) => {
                info!(
                    message_id,
                    video_id = task.video_id,
                    "Task will be retried (attempt {}/{}): {}",
                    attempt,
                    self.broker.max_retries(),
                    err
                );
                DeliveryOutcome::Retrying { attempt }
            }
            Err(e) => {
                error!(message_id, "Failed to record attempt, leaving message pending: {}", e);
                DeliveryOutcome::Unsettled
            }
        }
    }

    /// Run the handler, touching the message on every heartbeat until it returns.
    async fn handle_leased(&self, message_id: &str, task: TranscodeTask) -> Result<(), TranscodeError> {
        let period = self.settings.heartbeat_interval();
        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let handling = self.handler.handle(task);
        tokio::pin!(handling);

        loop {
            tokio::select! {
                result = &mut handling => return result,
                _ = heartbeat.tick() => {
                    match self.broker.touch(&self.settings.consumer_name, message_id).await {
                        Ok(true) => debug!(message_id, "Extended task lease"),
                        Ok(false) => warn!(message_id, "Task is no longer pending, lease not extended"),
                        Err(e) => warn!(message_id, "Failed to extend task lease: {}", e),
                    }
                }
            }
        }
    }

    async fn dead_letter(&self, delivery: &Delivery, reason: &str) -> DeliveryOutcome {
        if self
            .settle("dead_letter", || self.broker.dead_letter(delivery, reason))
            .await
        {
            metrics::record_dead_lettered();
            DeliveryOutcome::DeadLettered
        } else {
            DeliveryOutcome::Unsettled
        }
    }

    async fn settle<F, Fut>(&self, operation: &'static str, f: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = QueueResult<()>>,
    {
        match retry_async(&RetryPolicy::new(operation), f).await {
            RetryResult::Success(()) => true,
            RetryResult::Failed { error, attempts } => {
                error!("{} failed after {} attempts: {}", operation, attempts, error);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use vpipe_queue::MemoryBroker;
    use vpipe_storage::StorageError;

    fn settings() -> ConsumerSettings {
        ConsumerSettings {
            consumer_name: "test-consumer".to_string(),
            poll_block: Duration::from_millis(10),
            batch_size: 10,
            claim_interval: Duration::from_millis(10),
            claim_min_idle: Duration::ZERO,
        }
    }

    fn consumer(
        broker: &Arc<MemoryBroker>,
        handler: MockTaskHandler,
    ) -> QueueConsumer<MemoryBroker, MockTaskHandler> {
        QueueConsumer::new(Arc::clone(broker), Arc::new(handler), settings())
    }

    fn upload_error() -> TranscodeError {
        TranscodeError::Upload {
            key: "processed/1/hls_360p/3600.ts".to_string(),
            source: StorageError::upload_failed("503 Slow Down"),
        }
    }

    async fn receive_one(broker: &MemoryBroker) -> Delivery {
        broker
            .receive("test-consumer", Duration::from_millis(1), 1)
            .await
            .unwrap()
            .remove(0)
    }

    #[tokio::test]
    async fn test_success_acks() {
        let broker = Arc::new(MemoryBroker::default());
        let id = broker.push_task(&TranscodeTask::new(7));

        let mut handler = MockTaskHandler::new();
        handler
            .expect_handle()
            .withf(|task| task.video_id == 7)
            .times(1)
            .returning(|_| Ok(()));

        let consumer = consumer(&broker, handler);
        let delivery = receive_one(&broker).await;

        assert_eq!(consumer.process_delivery(&delivery).await, DeliveryOutcome::Completed);
        assert_eq!(broker.acked(), vec![id]);
        assert!(broker.pending_ids().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_never_reaches_handler() {
        let broker = Arc::new(MemoryBroker::default());
        let payloads: [&[u8]; 4] = [b"not json", br#"{"video_id":"7"}"#, b"{}", b""];
        let ids: Vec<String> = payloads
            .iter()
            .map(|p| broker.push(p.to_vec()))
            .collect();

        let mut handler = MockTaskHandler::new();
        handler.expect_handle().never();

        let consumer = consumer(&broker, handler);
        assert_eq!(consumer.poll_once().await.unwrap(), 4);

        assert_eq!(broker.rejected(), ids);
        assert!(broker.pending_ids().is_empty());
        assert!(broker.dead_lettered().is_empty());
    }

    #[tokio::test]
    async fn test_terminal_failure_is_dead_lettered() {
        let broker = Arc::new(MemoryBroker::default());
        broker.push_task(&TranscodeTask::new(9));

        let mut handler = MockTaskHandler::new();
        handler
            .expect_handle()
            .times(1)
            .returning(|_| Err(TranscodeError::NotFound(9)));

        let consumer = consumer(&broker, handler);
        let delivery = receive_one(&broker).await;

        assert_eq!(
            consumer.process_delivery(&delivery).await,
            DeliveryOutcome::DeadLettered
        );
        let dead = broker.dead_lettered();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].0, delivery);
        assert!(dead[0].1.contains("not found"));
        assert_eq!(broker.attempts(&delivery.message_id), 0);
    }

    #[tokio::test]
    async fn test_retryable_failure_stays_pending_until_limit() {
        let broker = Arc::new(MemoryBroker::new(2));
        let id = broker.push_task(&TranscodeTask::new(3));

        let mut handler = MockTaskHandler::new();
        handler
            .expect_handle()
            .times(2)
            .returning(|_| Err(upload_error()));

        let consumer = consumer(&broker, handler);
        let delivery = receive_one(&broker).await;

        assert_eq!(
            consumer.process_delivery(&delivery).await,
            DeliveryOutcome::Retrying { attempt: 1 }
        );
        assert_eq!(broker.pending_ids(), vec![id.clone()]);
        assert!(broker.acked().is_empty());

        // Redelivered through the stale claim
        assert_eq!(consumer.claim_stale().await.unwrap(), 1);
        assert!(broker.pending_ids().is_empty());
        let dead = broker.dead_lettered();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].0.message_id, id);
        assert!(dead[0].1.starts_with("gave up after 2 attempts"));
    }

    struct SlowHandler {
        delay: Duration,
    }

    #[async_trait]
    impl TaskHandler for SlowHandler {
        async fn handle(&self, _task: TranscodeTask) -> Result<(), TranscodeError> {
            tokio::time::sleep(self.delay).await;
            Ok(())
        }
    }

    #[test]
    fn test_heartbeat_interval() {
        let mut s = settings();
        s.claim_min_idle = Duration::from_secs(300);
        assert_eq!(s.heartbeat_interval(), Duration::from_secs(100));
        s.claim_min_idle = Duration::ZERO;
        assert_eq!(s.heartbeat_interval(), MIN_HEARTBEAT_INTERVAL);
    }

    #[tokio::test]
    async fn test_long_job_is_not_claimed_by_other_consumers() {
        let broker = Arc::new(MemoryBroker::default());
        let id = broker.push_task(&TranscodeTask::new(5));

        let mut s = settings();
        s.claim_min_idle = Duration::from_millis(60);
        let consumer = Arc::new(QueueConsumer::new(
            Arc::clone(&broker),
            Arc::new(SlowHandler {
                delay: Duration::from_millis(200),
            }),
            s,
        ));

        let delivery = receive_one(&broker).await;
        let running = {
            let consumer = Arc::clone(&consumer);
            tokio::spawn(async move { consumer.process_delivery(&delivery).await })
        };

        for _ in 0..8 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let stolen = broker
                .claim_stale("other-consumer", Duration::from_millis(60), 10)
                .await
                .unwrap();
            assert!(stolen.is_empty(), "in-flight message was claimed");
        }

        assert_eq!(running.await.unwrap(), DeliveryOutcome::Completed);
        assert!(broker.touches(&id) >= 3);
        assert_eq!(broker.acked(), vec![id]);
    }

    #[tokio::test]
    async fn test_run_retries_then_stops_on_shutdown() {
        let broker = Arc::new(MemoryBroker::default());
        let id = broker.push_task(&TranscodeTask::new(11));

        let calls = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&calls);
        let mut handler = MockTaskHandler::new();
        handler.expect_handle().returning(move |_| {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(upload_error())
            } else {
                Ok(())
            }
        });

        let consumer = Arc::new(consumer(&broker, handler));
        let (tx, rx) = watch::channel(false);
        let running = {
            let consumer = Arc::clone(&consumer);
            tokio::spawn(async move { consumer.run(rx).await })
        };

        let deadline = Instant::now() + Duration::from_secs(5);
        while broker.acked().is_empty() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(broker.acked(), vec![id]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .expect("consumer did not stop")
            .unwrap()
            .unwrap();
    }
}
