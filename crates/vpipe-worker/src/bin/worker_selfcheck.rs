use std::path::Path;

use vpipe_media::{check_ffmpeg, check_ffprobe};
use vpipe_queue::TaskQueue;
use vpipe_storage::S3Client;
use vpipe_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;
    dotenvy::dotenv().ok();

    let config = WorkerConfig::from_env()?;

    println!(
        "worker-selfcheck: starting with work_dir={} profiles={}",
        config.work_dir.display(),
        config
            .profiles
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(",")
    );
    ensure_workdir(&config.work_dir).await?;
    ensure_tools()?;
    ensure_env_present(&["REDIS_URL", "S3_BUCKET_NAME", "DATABASE_URL"])?;
    ensure_storage().await?;
    ensure_queue().await?;

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    let probe = tempfile::tempfile_in(path)
        .map_err(|e| anyhow::anyhow!("work dir {} is not writable: {}", path.display(), e))?;
    drop(probe);
    Ok(())
}

fn ensure_tools() -> anyhow::Result<()> {
    let ffmpeg = check_ffmpeg().map_err(|e| anyhow::anyhow!("{}", e))?;
    let ffprobe = check_ffprobe().map_err(|e| anyhow::anyhow!("{}", e))?;
    println!(
        "worker-selfcheck: ffmpeg={} ffprobe={}",
        ffmpeg.display(),
        ffprobe.display()
    );
    Ok(())
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    for var in vars {
        if std::env::var(var).is_err() {
            return Err(anyhow::anyhow!("missing required env var {}", var));
        }
    }
    Ok(())
}

async fn ensure_storage() -> anyhow::Result<()> {
    let client = S3Client::from_env()?;
    client
        .check_connectivity()
        .await
        .map_err(|e| anyhow::anyhow!("bucket {} unreachable: {}", client.bucket(), e))?;
    Ok(())
}

async fn ensure_queue() -> anyhow::Result<()> {
    let queue = TaskQueue::from_env()?;
    let pending = queue.len().await?;
    let dead = queue.dlq_len().await?;
    println!("worker-selfcheck: queue length={} dlq length={}", pending, dead);
    Ok(())
}
