//! Worker metrics.
//!
//! Recorded through the `metrics` facade; nothing is exported unless
//! [`install_exporter`] was called.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{WorkerError, WorkerResult};

/// Metric name constants for consistency.
pub mod names {
    pub const JOBS_COMPLETED_TOTAL: &str = "vpipe_jobs_completed_total";
    /// Labelled by error kind and whether the task will be retried.
    pub const JOBS_FAILED_TOTAL: &str = "vpipe_jobs_failed_total";
    /// Malformed messages rejected without processing.
    pub const MESSAGES_DROPPED_TOTAL: &str = "vpipe_messages_dropped_total";
    pub const MESSAGES_DEAD_LETTERED_TOTAL: &str = "vpipe_messages_dead_lettered_total";
    pub const STAGE_DURATION_SECONDS: &str = "vpipe_stage_duration_seconds";
    pub const JOB_DURATION_SECONDS: &str = "vpipe_job_duration_seconds";
    pub const UPLOADED_BYTES_TOTAL: &str = "vpipe_uploaded_bytes_total";
}

/// Serve Prometheus metrics on `0.0.0.0:{port}`.
pub fn install_exporter(port: u16) -> WorkerResult<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::config_error(format!("metrics exporter: {}", e)))
}

pub fn record_completed(duration: Duration) {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
    histogram!(names::JOB_DURATION_SECONDS).record(duration.as_secs_f64());
}

pub fn record_failed(kind: &'static str, retryable: bool) {
    counter!(
        names::JOBS_FAILED_TOTAL,
        "kind" => kind,
        "retryable" => if retryable { "true" } else { "false" }
    )
    .increment(1);
}

pub fn record_dropped() {
    counter!(names::MESSAGES_DROPPED_TOTAL).increment(1);
}

pub fn record_dead_lettered() {
    counter!(names::MESSAGES_DEAD_LETTERED_TOTAL).increment(1);
}

pub fn record_stage(stage: &'static str, duration: Duration) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage).record(duration.as_secs_f64());
}

pub fn record_uploaded_bytes(bytes: u64) {
    counter!(names::UPLOADED_BYTES_TOTAL).increment(bytes);
}
