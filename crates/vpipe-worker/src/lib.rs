//! HLS transcode worker.
//!
//! This crate provides:
//! - The transcode orchestrator (download, probe, cover, encode, upload, commit)
//! - The queue consumer with retry and DLQ handling
//! - Graceful shutdown
//! - Worker configuration, logging and metrics

pub mod config;
pub mod consumer;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod retry;

pub use config::WorkerConfig;
pub use consumer::{ConsumerSettings, DeliveryOutcome, QueueConsumer, TaskHandler};
pub use error::{TranscodeError, WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use orchestrator::{RenditionOutcome, TranscodeOrchestrator, TranscodeOutcome, TranscodeSettings};
