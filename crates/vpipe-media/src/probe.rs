//! FFprobe media information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// Facts about a source file the pipeline cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeInfo {
    /// Duration in seconds
    pub duration_secs: f64,
    /// Width of the first video stream, if any
    pub width: Option<u32>,
    /// Height of the first video stream, if any
    pub height: Option<u32>,
    /// Codec of the first video stream, if any
    pub video_codec: Option<String>,
}

impl ProbeInfo {
    /// Duration truncated to whole seconds.
    pub fn whole_seconds(&self) -> u64 {
        if self.duration_secs.is_finite() && self.duration_secs > 0.0 {
            self.duration_secs.trunc() as u64
        } else {
            0
        }
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Probe a media file.
pub async fn probe_media(path: impl AsRef<Path>, timeout: Option<Duration>) -> MediaResult<ProbeInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let ffprobe = check_ffprobe()?;

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match timeout {
        Some(timeout) => tokio::time::timeout(timeout, output)
            .await
            .map_err(|_| MediaError::Timeout(timeout.as_secs()))??,
        None => output.await?,
    };

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("FFprobe exited with {}", output.status),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    parse_probe_output(&output.stdout)
}

fn parse_probe_output(stdout: &[u8]) -> MediaResult<ProbeInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let duration_secs = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| MediaError::InvalidVideo("no readable duration".to_string()))?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));

    Ok(ProbeInfo {
        duration_secs,
        width: video_stream.and_then(|s| s.width),
        height: video_stream.and_then(|s| s.height),
        video_codec: video_stream.and_then(|s| s.codec_name.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{
            "streams": [
                {"codec_type": "audio", "codec_name": "aac"},
                {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080}
            ],
            "format": {"duration": "12.840000", "format_name": "mov,mp4,m4a,3gp,3g2,mj2"}
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert!((info.duration_secs - 12.84).abs() < 1e-9);
        assert_eq!(info.whole_seconds(), 12);
        assert_eq!(info.width, Some(1920));
        assert_eq!(info.video_codec.as_deref(), Some("h264"));
    }

    #[test]
    fn test_audio_only_is_accepted() {
        let info = parse_probe_output(br#"{"format": {"duration": "3.5"}}"#).unwrap();
        assert_eq!(info.whole_seconds(), 3);
        assert_eq!(info.width, None);
    }

    #[test]
    fn test_missing_duration_is_invalid() {
        let err = parse_probe_output(br#"{"format": {}, "streams": []}"#).unwrap_err();
        assert!(matches!(err, MediaError::InvalidVideo(_)));

        let err = parse_probe_output(br#"{"format": {"duration": "N/A"}}"#).unwrap_err();
        assert!(matches!(err, MediaError::InvalidVideo(_)));

        assert!(matches!(
            parse_probe_output(b"garbage"),
            Err(MediaError::JsonParse(_))
        ));
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let err = probe_media("/definitely/not/here.mp4", None).await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
