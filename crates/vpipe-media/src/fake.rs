//! In-memory encoder for pipeline tests.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::encoder::Encoder;
use crate::error::{MediaError, MediaResult};
use crate::hls::{list_produced_files, ProducedFile};
use crate::probe::ProbeInfo;

/// Encoder that writes small placeholder files instead of running FFmpeg.
///
/// Each rendition gets a playlist plus `segments` segment files named
/// `{stem}{n}.ts`, mirroring FFmpeg's default HLS naming.
#[derive(Debug)]
pub struct FakeEncoder {
    duration_secs: f64,
    segments: usize,
    fail_probe: bool,
    fail_cover: bool,
    failing_renditions: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl Default for FakeEncoder {
    fn default() -> Self {
        Self {
            duration_secs: 12.8,
            segments: 2,
            fail_probe: false,
            fail_cover: false,
            failing_renditions: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = secs;
        self
    }

    pub fn with_segments(mut self, segments: usize) -> Self {
        self.segments = segments;
        self
    }

    pub fn failing_probe(mut self) -> Self {
        self.fail_probe = true;
        self
    }

    pub fn failing_cover(mut self) -> Self {
        self.fail_cover = true;
        self
    }

    /// Make the rendition whose playlist stem is `name` exit non-zero.
    pub fn failing_rendition(mut self, name: impl Into<String>) -> Self {
        self.failing_renditions.insert(name.into());
        self
    }

    /// Operations performed so far, e.g. `probe`, `cover`, `hls:720p`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: impl Into<String>) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.into());
        }
    }
}

fn ensure_input(input: &Path) -> MediaResult<()> {
    if input.exists() {
        Ok(())
    } else {
        Err(MediaError::FileNotFound(input.to_path_buf()))
    }
}

#[async_trait]
impl Encoder for FakeEncoder {
    async fn probe(&self, input: &Path) -> MediaResult<ProbeInfo> {
        self.record("probe");
        ensure_input(input)?;

        if self.fail_probe {
            return Err(MediaError::InvalidVideo("no readable duration".to_string()));
        }
        Ok(ProbeInfo {
            duration_secs: self.duration_secs,
            width: Some(1280),
            height: Some(720),
            video_codec: Some("h264".to_string()),
        })
    }

    async fn extract_cover(&self, input: &Path, output: &Path, _at_secs: f64) -> MediaResult<()> {
        self.record("cover");
        ensure_input(input)?;

        if self.fail_cover {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some("Output file is empty, nothing was encoded".to_string()),
                Some(1),
            ));
        }
        tokio::fs::write(output, b"\xFF\xD8\xFF\xE0fake-jpeg").await?;
        Ok(())
    }

    async fn transcode_hls(
        &self,
        input: &Path,
        resolution: &str,
        output_dir: &Path,
        playlist_name: &str,
    ) -> MediaResult<Vec<ProducedFile>> {
        let stem = playlist_name
            .strip_suffix(".m3u8")
            .unwrap_or(playlist_name)
            .to_string();
        self.record(format!("hls:{}", stem));
        ensure_input(input)?;

        if self.failing_renditions.contains(&stem) {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(format!("Invalid scale expression '{}'", resolution)),
                Some(1),
            ));
        }

        let mut playlist = String::from("#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:10\n");
        for n in 0..self.segments {
            let segment = format!("{}{}.ts", stem, n);
            tokio::fs::write(output_dir.join(&segment), vec![0x47u8; 188 * (n + 1)]).await?;
            playlist.push_str(&format!("#EXTINF:10.0,\n{}\n", segment));
        }
        playlist.push_str("#EXT-X-ENDLIST\n");
        tokio::fs::write(output_dir.join(playlist_name), playlist).await?;

        list_produced_files(output_dir).await
    }
}
