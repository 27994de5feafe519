//! Structured job logging utilities.
//!
//! Provides consistent, structured logging for transcode jobs with
//! tracing spans and contextual information.

use std::time::Instant;

use tracing::{error, info, warn, Span};

/// Job logger for structured logging with consistent formatting.
///
/// Every event carries the video ID and the operation name, plus the time
/// elapsed since the logger was created.
#[derive(Debug, Clone)]
pub struct JobLogger {
    video_id: u64,
    operation: String,
    started: Instant,
}

impl JobLogger {
    /// Create a new job logger for a video and operation.
    ///
    /// # Arguments
    /// * `video_id` - The video being processed
    /// * `operation` - The type of operation (e.g., "transcode")
    pub fn new(video_id: u64, operation: &str) -> Self {
        Self {
            video_id,
            operation: operation.to_string(),
            started: Instant::now(),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Log the start of a job operation.
    pub fn log_start(&self, message: &str) {
        info!(
            video_id = self.video_id,
            operation = %self.operation,
            "Job started: {}", message
        );
    }

    /// Log a progress update during job execution.
    pub fn log_progress(&self, message: &str) {
        info!(
            video_id = self.video_id,
            operation = %self.operation,
            elapsed_ms = self.elapsed_ms(),
            "Job progress: {}", message
        );
    }

    /// Log a warning during job execution.
    pub fn log_warning(&self, message: &str) {
        warn!(
            video_id = self.video_id,
            operation = %self.operation,
            "Job warning: {}", message
        );
    }

    /// Log an error during job execution.
    pub fn log_error(&self, message: &str) {
        error!(
            video_id = self.video_id,
            operation = %self.operation,
            elapsed_ms = self.elapsed_ms(),
            "Job error: {}", message
        );
    }

    /// Log the completion of a job operation.
    pub fn log_completion(&self, message: &str) {
        info!(
            video_id = self.video_id,
            operation = %self.operation,
            elapsed_ms = self.elapsed_ms(),
            "Job completed: {}", message
        );
    }

    pub fn video_id(&self) -> u64 {
        self.video_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Create a tracing span for this job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            video_id = self.video_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_creation() {
        let logger = JobLogger::new(42, "transcode");

        assert_eq!(logger.video_id(), 42);
        assert_eq!(logger.operation(), "transcode");
    }
}
