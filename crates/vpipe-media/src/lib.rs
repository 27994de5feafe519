//! FFmpeg CLI wrapper for HLS transcoding.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Timeouts for external processes
//! - Probe, cover extraction and segmented HLS output
//! - The `Encoder` trait the pipeline depends on

pub mod command;
pub mod cover;
pub mod encoder;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod fake;
pub mod hls;
pub mod probe;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use encoder::{Encoder, FfmpegEncoder};
pub use error::{MediaError, MediaResult};
#[cfg(any(test, feature = "test-util"))]
pub use fake::FakeEncoder;
pub use hls::{list_produced_files, total_size, ProducedFile};
pub use probe::{probe_media, ProbeInfo};
