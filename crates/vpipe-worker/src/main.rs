//! Transcode worker binary.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vpipe_db::{init_pool, run_migrations, DbConfig, SqliteVideoRepository};
use vpipe_media::{check_ffmpeg, check_ffprobe, FfmpegEncoder};
use vpipe_queue::TaskQueue;
use vpipe_storage::S3Client;
use vpipe_worker::{
    metrics, ConsumerSettings, QueueConsumer, TranscodeOrchestrator, TranscodeSettings, WorkerConfig,
};

fn init_tracing() -> anyhow::Result<()> {
    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("vpipe=info"))?;

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // rediss:// connections need a process-wide crypto provider
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();
    init_tracing()?;

    info!("Starting vpipe-worker");

    let config = WorkerConfig::from_env()?;
    info!("Worker config: {:?}", config);

    if let Some(port) = config.metrics_port {
        metrics::install_exporter(port)?;
        info!("Serving Prometheus metrics on port {}", port);
    }

    check_ffmpeg().context("ffmpeg is required")?;
    check_ffprobe().context("ffprobe is required")?;

    let pool = init_pool(&DbConfig::from_env()).await?;
    run_migrations(&pool).await?;
    let repo = Arc::new(SqliteVideoRepository::new(pool));

    let store = Arc::new(S3Client::from_env()?);
    let encoder = Arc::new(FfmpegEncoder::new().with_timeout(config.encoder_timeout));

    let queue = TaskQueue::from_env()?;
    queue.init().await?;

    let orchestrator = TranscodeOrchestrator::new(
        encoder,
        store,
        repo,
        TranscodeSettings::from_config(&config),
    );
    let consumer = QueueConsumer::new(
        Arc::new(queue),
        Arc::new(orchestrator),
        ConsumerSettings::from_config(&config),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Received shutdown signal, finishing current job");
        let _ = shutdown_tx.send(true);
    });

    consumer.run(shutdown_rx).await?;

    info!("Worker shutdown complete");
    Ok(())
}
