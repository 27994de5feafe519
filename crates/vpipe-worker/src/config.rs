//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use uuid::Uuid;

use vpipe_models::{default_profiles, validate_profiles, Profile};

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Parent directory for per-job scratch directories
    pub work_dir: PathBuf,
    /// Renditions produced for every video, in encode order
    pub profiles: Vec<Profile>,
    /// Per-invocation limit for ffmpeg/ffprobe; `None` waits forever
    pub encoder_timeout: Option<Duration>,
    /// Delete already-uploaded renditions when a job fails
    pub cleanup_orphans: bool,
    /// Consumer name inside the consumer group
    pub consumer_name: String,
    /// How long one receive call blocks waiting for messages
    pub poll_block: Duration,
    /// Messages taken per receive call
    pub batch_size: usize,
    /// How often the worker should scan for stale pending messages
    pub claim_interval: Duration,
    /// Minimum idle time before a pending message can be claimed
    pub claim_min_idle: Duration,
    /// Prometheus listener port; metrics are not exported when unset
    pub metrics_port: Option<u16>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("vpipe"),
            profiles: default_profiles(),
            encoder_timeout: None,
            cleanup_orphans: true,
            consumer_name: format!("worker-{}", Uuid::new_v4()),
            poll_block: Duration::from_secs(1),
            batch_size: 1,
            claim_interval: Duration::from_secs(30),
            claim_min_idle: Duration::from_secs(300), // 5 minutes
            metrics_port: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// Parse a JSON array of `{name, resolution}` objects and validate it.
pub fn profiles_from_json(json: &str) -> WorkerResult<Vec<Profile>> {
    let profiles: Vec<Profile> = serde_json::from_str(json)
        .map_err(|e| WorkerError::config_error(format!("invalid profile JSON: {}", e)))?;
    validate_profiles(&profiles).map_err(|e| WorkerError::config_error(e.to_string()))?;
    Ok(profiles)
}

fn profiles_from_env() -> WorkerResult<Vec<Profile>> {
    if let Ok(json) = std::env::var("TRANSCODE_PROFILES") {
        return profiles_from_json(&json);
    }
    if let Ok(path) = std::env::var("TRANSCODE_PROFILES_FILE") {
        let json = std::fs::read_to_string(&path).map_err(|e| {
            WorkerError::config_error(format!("cannot read profile file {}: {}", path, e))
        })?;
        return profiles_from_json(&json);
    }
    Ok(default_profiles())
}

impl WorkerConfig {
    /// Create config from environment variables.
    ///
    /// Profiles are read once here; an invalid profile list is a startup error.
    pub fn from_env() -> WorkerResult<Self> {
        let defaults = Self::default();

        Ok(Self {
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            profiles: profiles_from_env()?,
            encoder_timeout: env_parse::<u64>("ENCODER_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            cleanup_orphans: env_flag("WORKER_CLEANUP_ORPHANS", defaults.cleanup_orphans),
            consumer_name: std::env::var("WORKER_CONSUMER_NAME").unwrap_or(defaults.consumer_name),
            poll_block: env_parse::<u64>("WORKER_POLL_BLOCK_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_block),
            batch_size: env_parse::<usize>("WORKER_BATCH_SIZE")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.batch_size),
            claim_interval: env_parse::<u64>("WORKER_CLAIM_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.claim_interval),
            claim_min_idle: env_parse::<u64>("WORKER_CLAIM_MIN_IDLE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.claim_min_idle),
            metrics_port: env_parse("METRICS_PORT"),
        })
    }
}
