//! S3-compatible artifact storage.
//!
//! This crate provides:
//! - Streaming download of raw uploads
//! - Upload of covers and HLS renditions
//! - Batch deletion for cleaning up partial output
//! - Presigned GET/PUT URLs

pub mod client;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod store;

pub use client::{S3Client, S3Config};
pub use error::{StorageError, StorageResult};
#[cfg(any(test, feature = "test-util"))]
pub use memory::{MemoryStore, StoredObject};
pub use store::ArtifactStore;
