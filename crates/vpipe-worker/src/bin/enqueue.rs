//! Publish transcode tasks for existing videos.
//!
//! Usage: vpipe-enqueue <video_id>...

use vpipe_models::TranscodeTask;
use vpipe_queue::TaskQueue;

fn parse_ids(args: &[String]) -> anyhow::Result<Vec<u64>> {
    if args.is_empty() {
        anyhow::bail!("usage: vpipe-enqueue <video_id>...");
    }
    args.iter()
        .map(|a| {
            a.parse::<u64>()
                .map_err(|e| anyhow::anyhow!("invalid video id '{}': {}", a, e))
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let ids = parse_ids(&args)?;

    let queue = TaskQueue::from_env()?;
    queue.init().await?;

    for id in ids {
        let message_id = queue.publish(&TranscodeTask::new(id)).await?;
        println!("vpipe-enqueue: video {} -> {}", id, message_id);
    }

    println!("vpipe-enqueue: queue length {}", queue.len().await?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ids() {
        let args = vec!["1".to_string(), "42".to_string()];
        assert_eq!(parse_ids(&args).unwrap(), vec![1, 42]);
        assert!(parse_ids(&[]).is_err());
        assert!(parse_ids(&["-3".to_string()]).is_err());
    }
}
