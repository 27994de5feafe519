//! Video and rendition records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::encoding::SOURCE_FORMAT_HLS;
use crate::error::ModelError;

/// Lifecycle status of a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Source object is still being uploaded
    #[default]
    Uploading,
    /// Upload finished, waiting for or inside the transcode pipeline
    Transcoding,
    /// Renditions available for playback
    Online,
    /// Pipeline gave up on this video
    Failed,
    /// Hidden by the owner
    Private,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Uploading => "uploading",
            VideoStatus::Transcoding => "transcoding",
            VideoStatus::Online => "online",
            VideoStatus::Failed => "failed",
            VideoStatus::Private => "private",
        }
    }

    /// Whether the pipeline may (re)process a video in this state.
    ///
    /// `failed` and `online` are accepted so a redelivered or manually
    /// re-enqueued task can converge on the same end state.
    pub fn is_transcodable(&self) -> bool {
        matches!(
            self,
            VideoStatus::Transcoding | VideoStatus::Failed | VideoStatus::Online
        )
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VideoStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploading" => Ok(VideoStatus::Uploading),
            "transcoding" => Ok(VideoStatus::Transcoding),
            "online" => Ok(VideoStatus::Online),
            "failed" => Ok(VideoStatus::Failed),
            "private" => Ok(VideoStatus::Private),
            other => Err(ModelError::UnknownStatus(other.to_string())),
        }
    }
}

/// A media asset record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: u64,
    pub user_id: u64,
    pub title: String,
    pub description: String,
    /// Name of the uploaded source object under `raw/{id}/`
    pub original_file_name: String,
    pub status: VideoStatus,
    /// Whole seconds
    pub duration: u64,
    /// Object key of the cover image, when one was produced
    pub cover_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One playable rendition of a video.
///
/// Unique on (`video_id`, `quality`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSource {
    pub video_id: u64,
    /// Profile name, e.g. "720p"
    pub quality: String,
    pub format: String,
    /// Object key of the playlist
    pub url: String,
    /// Sum of bytes of every file produced for the rendition
    pub file_size: u64,
    pub created_at: DateTime<Utc>,
}

impl VideoSource {
    /// Build an HLS rendition record.
    pub fn hls(
        video_id: u64,
        quality: impl Into<String>,
        url: impl Into<String>,
        file_size: u64,
    ) -> Self {
        Self {
            video_id,
            quality: quality.into(),
            format: SOURCE_FORMAT_HLS.to_string(),
            url: url.into(),
            file_size,
            created_at: Utc::now(),
        }
    }
}
