//! Redis Streams round trip.
//!
//! Run with: cargo test -p vpipe-queue --test redis_stream -- --ignored
//! Requires REDIS_URL to point at a disposable Redis.

use std::time::Duration;

use vpipe_models::TranscodeTask;
use vpipe_queue::{QueueConfig, TaskBroker, TaskQueue};

fn test_queue() -> TaskQueue {
    dotenvy::dotenv().ok();
    let suffix = std::process::id();
    let config = QueueConfig {
        stream_name: format!("vpipe:test:{}", suffix),
        consumer_group: format!("vpipe:test:group:{}", suffix),
        dlq_stream_name: format!("vpipe:test:dlq:{}", suffix),
        max_retries: 1,
        ..QueueConfig::from_env()
    };
    TaskQueue::new(config).expect("valid redis url")
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_publish_receive_ack() {
    let queue = test_queue();
    queue.init().await.unwrap();
    // Second init hits BUSYGROUP and is still fine
    queue.init().await.unwrap();

    let id = queue.publish(&TranscodeTask::new(77)).await.unwrap();
    assert_eq!(queue.len().await.unwrap(), 1);

    let deliveries = queue
        .receive("it-consumer", Duration::from_millis(500), 10)
        .await
        .unwrap();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].message_id, id);
    let task = TranscodeTask::from_slice(&deliveries[0].payload).unwrap();
    assert_eq!(task.video_id, 77);

    queue.ack(&id).await.unwrap();
    assert_eq!(queue.len().await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_claim_and_dead_letter() {
    let queue = test_queue();
    queue.init().await.unwrap();

    queue.publish(&TranscodeTask::new(78)).await.unwrap();
    let first = queue
        .receive("it-a", Duration::from_millis(500), 1)
        .await
        .unwrap()
        .remove(0);

    assert_eq!(queue.record_attempt(&first.message_id).await.unwrap(), 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(queue.touch("it-a", &first.message_id).await.unwrap());
    let fresh = queue
        .claim_stale("it-b", Duration::from_secs(5), 10)
        .await
        .unwrap();
    assert!(fresh.is_empty());

    tokio::time::sleep(Duration::from_millis(50)).await;
    let claimed = queue
        .claim_stale("it-b", Duration::from_millis(10), 10)
        .await
        .unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].message_id, first.message_id);
    assert_eq!(claimed[0].payload, first.payload);

    queue.dead_letter(&claimed[0], "gave up").await.unwrap();
    assert_eq!(queue.len().await.unwrap(), 0);
    assert_eq!(queue.dlq_len().await.unwrap(), 1);
    assert!(!queue.touch("it-b", &first.message_id).await.unwrap());
}
