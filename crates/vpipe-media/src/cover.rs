//! Cover frame extraction.

use std::path::Path;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Build the single-frame JPEG command for a cover at `position`.
pub fn cover_command(
    video_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    position: &str,
) -> FfmpegCommand {
    FfmpegCommand::new(video_path, output_path)
        .seek(position)
        .single_frame()
        .log_level("error")
}

/// Extract one frame as a JPEG.
///
/// Sources shorter than `position` make FFmpeg exit cleanly without
/// writing anything, which is reported as a missing file.
pub async fn extract_cover(
    runner: &FfmpegRunner,
    video_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    position: &str,
) -> MediaResult<()> {
    let output_path = output_path.as_ref();
    let cmd = cover_command(video_path, output_path, position);

    runner.run(&cmd).await?;

    if !output_path.exists() {
        return Err(MediaError::FileNotFound(output_path.to_path_buf()));
    }
    Ok(())
}

/// Format seconds as the `HH:MM:SS.mmm` position FFmpeg expects.
pub fn format_position(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60,
        ms
    )
}
