//! Segmented HLS renditions.

use std::path::{Path, PathBuf};

use vpipe_models::encoding::{AUDIO_CODEC, HLS_LIST_SIZE, HLS_SEGMENT_SECONDS, VIDEO_CODEC};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// A file written by an encoder run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducedFile {
    /// Bare file name inside the output directory
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Build the HLS command for one rendition.
pub fn hls_command(
    input: impl AsRef<Path>,
    resolution: &str,
    output_dir: impl AsRef<Path>,
    playlist_name: &str,
) -> FfmpegCommand {
    FfmpegCommand::new(input, output_dir.as_ref().join(playlist_name))
        .video_codec(VIDEO_CODEC)
        .audio_codec(AUDIO_CODEC)
        .video_filter(format!("scale={}", resolution))
        .output_args([
            "-hls_time".to_string(),
            HLS_SEGMENT_SECONDS.to_string(),
            "-hls_list_size".to_string(),
            HLS_LIST_SIZE.to_string(),
        ])
        .format("hls")
}

/// Encode one rendition and return every file it produced.
pub async fn transcode_hls(
    runner: &FfmpegRunner,
    input: impl AsRef<Path>,
    resolution: &str,
    output_dir: impl AsRef<Path>,
    playlist_name: &str,
) -> MediaResult<Vec<ProducedFile>> {
    let output_dir = output_dir.as_ref();
    let cmd = hls_command(input, resolution, output_dir, playlist_name);

    runner.run(&cmd).await?;

    let files = list_produced_files(output_dir).await?;
    if !files.iter().any(|f| f.name == playlist_name) {
        return Err(MediaError::FileNotFound(output_dir.join(playlist_name)));
    }
    Ok(files)
}

/// List regular files in `dir`, sorted by name.
pub async fn list_produced_files(dir: impl AsRef<Path>) -> MediaResult<Vec<ProducedFile>> {
    let mut entries = tokio::fs::read_dir(dir.as_ref()).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        files.push(ProducedFile {
            name: entry.file_name().to_string_lossy().to_string(),
            path: entry.path(),
            size_bytes: metadata.len(),
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Total bytes across a rendition's files.
pub fn total_size(files: &[ProducedFile]) -> u64 {
    files.iter().map(|f| f.size_bytes).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_hls_command() {
        let args = hls_command("src.mp4", "-2:720", "/work/hls_720p", "720p.m3u8").build_args();

        assert!(args.windows(2).any(|w| w == ["-c:v", "libx264"]));
        assert!(args.windows(2).any(|w| w == ["-c:a", "aac"]));
        assert!(args.windows(2).any(|w| w == ["-vf", "scale=-2:720"]));
        assert!(args.windows(2).any(|w| w == ["-hls_time", "10"]));
        assert!(args.windows(2).any(|w| w == ["-hls_list_size", "0"]));
        assert!(args.windows(2).any(|w| w == ["-f", "hls"]));
        assert_eq!(
            args.last().map(String::as_str),
            Some("/work/hls_720p/720p.m3u8")
        );
    }

    #[tokio::test]
    async fn test_list_produced_files() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("720p1.ts"), vec![0u8; 300]).await.unwrap();
        tokio::fs::write(dir.path().join("720p.m3u8"), b"#EXTM3U\n").await.unwrap();
        tokio::fs::write(dir.path().join("720p0.ts"), vec![0u8; 200]).await.unwrap();
        tokio::fs::create_dir(dir.path().join("nested")).await.unwrap();

        let files = list_produced_files(dir.path()).await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();

        assert_eq!(names, vec!["720p.m3u8", "720p0.ts", "720p1.ts"]);
        assert_eq!(total_size(&files), 8 + 200 + 300);
    }
}
