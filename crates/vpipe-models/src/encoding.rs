//! Encoding constants shared by the encoder and the orchestrator.

/// Video codec for every rendition (H.264)
pub const VIDEO_CODEC: &str = "libx264";
/// Audio codec for every rendition
pub const AUDIO_CODEC: &str = "aac";

/// Target HLS segment length in seconds
pub const HLS_SEGMENT_SECONDS: u32 = 10;
/// Playlist entry limit; 0 keeps every segment (VOD playlist)
pub const HLS_LIST_SIZE: u32 = 0;
/// Format label persisted on every rendition
pub const SOURCE_FORMAT_HLS: &str = "HLS";

/// Cover frame position
pub const COVER_TIMESTAMP: &str = "00:00:01.000";
pub const COVER_OFFSET_SECS: f64 = 1.0;
pub const COVER_FILE_NAME: &str = "cover.jpg";

pub const PLAYLIST_EXTENSION: &str = "m3u8";

/// Content types used when uploading artifacts.
pub mod content_type {
    pub const HLS_PLAYLIST: &str = "application/vnd.apple.mpegurl";
    pub const MPEG_TS: &str = "video/mp2t";
    pub const JPEG: &str = "image/jpeg";
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Pick the upload content type from a file name.
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "m3u8" => content_type::HLS_PLAYLIST,
        "ts" => content_type::MPEG_TS,
        "jpg" | "jpeg" => content_type::JPEG,
        _ => content_type::OCTET_STREAM,
    }
}
