//! Encoder port used by the transcode pipeline.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::command::FfmpegRunner;
use crate::cover::{extract_cover, format_position};
use crate::error::MediaResult;
use crate::hls::{transcode_hls, ProducedFile};
use crate::probe::{probe_media, ProbeInfo};

/// The three media operations the pipeline needs.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Read the duration and basic stream facts of a file.
    async fn probe(&self, input: &Path) -> MediaResult<ProbeInfo>;

    /// Write a single JPEG frame taken `at_secs` into the source.
    async fn extract_cover(&self, input: &Path, output: &Path, at_secs: f64) -> MediaResult<()>;

    /// Encode one HLS rendition into `output_dir`.
    ///
    /// Returns every file in `output_dir` afterwards, playlist included.
    async fn transcode_hls(
        &self,
        input: &Path,
        resolution: &str,
        output_dir: &Path,
        playlist_name: &str,
    ) -> MediaResult<Vec<ProducedFile>>;
}

/// Encoder backed by the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoder {
    timeout: Option<Duration>,
}

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every external invocation; `None` disables the limit.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn runner(&self) -> FfmpegRunner {
        FfmpegRunner::new().with_timeout(self.timeout)
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn probe(&self, input: &Path) -> MediaResult<ProbeInfo> {
        let info = probe_media(input, self.timeout).await?;
        debug!(
            duration_secs = info.duration_secs,
            width = ?info.width,
            height = ?info.height,
            "Probed {}",
            input.display()
        );
        Ok(info)
    }

    async fn extract_cover(&self, input: &Path, output: &Path, at_secs: f64) -> MediaResult<()> {
        extract_cover(&self.runner(), input, output, &format_position(at_secs)).await
    }

    async fn transcode_hls(
        &self,
        input: &Path,
        resolution: &str,
        output_dir: &Path,
        playlist_name: &str,
    ) -> MediaResult<Vec<ProducedFile>> {
        transcode_hls(&self.runner(), input, resolution, output_dir, playlist_name).await
    }
}
