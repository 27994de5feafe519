//! Worker error types.

use thiserror::Error;

use vpipe_db::DbError;
use vpipe_media::MediaError;
use vpipe_models::VideoStatus;
use vpipe_storage::StorageError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Errors raised while starting or running the worker process.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Queue error: {0}")]
    Queue(#[from] vpipe_queue::QueueError),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

/// Why one transcode job failed.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("video {0} not found")]
    NotFound(u64),

    #[error("video {video_id} is {status}, not processable")]
    InvalidState { video_id: u64, status: VideoStatus },

    #[error("cannot prepare workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("download of {key} failed: {source}")]
    Download {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("probe failed: {0}")]
    Probe(#[source] MediaError),

    #[error("encoding profile {profile} failed: {source}")]
    Encode {
        profile: String,
        #[source]
        source: MediaError,
    },

    #[error("upload of {key} failed: {source}")]
    Upload {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("commit failed: {0}")]
    Commit(#[source] DbError),

    #[error("database error: {0}")]
    Database(#[from] DbError),
}

impl TranscodeError {
    /// Whether redelivering the same task can succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TranscodeError::NotFound(_) | TranscodeError::InvalidState { .. } => false,
            TranscodeError::Download { source, .. } => !source.is_not_found(),
            TranscodeError::Probe(source) | TranscodeError::Encode { source, .. } => {
                source.is_transient()
            }
            TranscodeError::Workspace(_)
            | TranscodeError::Upload { .. }
            | TranscodeError::Commit(_)
            | TranscodeError::Database(_) => true,
        }
    }

    /// Whether the video row is set to `failed` for this error.
    ///
    /// Only stages after the row was fetched and the workspace prepared
    /// touch the status; a rolled-back commit leaves it as it was.
    pub fn marks_failed(&self) -> bool {
        matches!(
            self,
            TranscodeError::Download { .. }
                | TranscodeError::Probe(_)
                | TranscodeError::Encode { .. }
                | TranscodeError::Upload { .. }
        )
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TranscodeError::NotFound(_) => "not_found",
            TranscodeError::InvalidState { .. } => "invalid_state",
            TranscodeError::Workspace(_) => "workspace",
            TranscodeError::Download { .. } => "download",
            TranscodeError::Probe(_) => "probe",
            TranscodeError::Encode { .. } => "encode",
            TranscodeError::Upload { .. } => "upload",
            TranscodeError::Commit(_) => "commit",
            TranscodeError::Database(_) => "database",
        }
    }
}
