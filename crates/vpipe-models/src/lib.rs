//! Shared data models for the vpipe transcode pipeline.
//!
//! This crate provides:
//! - Video and rendition records
//! - Transcode profiles
//! - The queue task payload
//! - Object storage key layout
//! - Encoding constants

pub mod encoding;
pub mod error;
pub mod keys;
pub mod profile;
pub mod task;
pub mod video;

pub use error::{ModelError, ModelResult};
pub use profile::{default_profiles, validate_profiles, Profile};
pub use task::TranscodeTask;
pub use video::{Video, VideoSource, VideoStatus};
