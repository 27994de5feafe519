//! Object storage key layout.
//!
//! ```text
//! raw/{video_id}/{original_file_name}
//! processed/{video_id}/cover.jpg
//! processed/{video_id}/hls_{profile}/{profile}.m3u8
//! processed/{video_id}/hls_{profile}/{segment}.ts
//! ```

use crate::encoding::COVER_FILE_NAME;

/// Key of the uploaded source object.
pub fn raw_object(video_id: u64, original_file_name: &str) -> String {
    format!("raw/{}/{}", video_id, original_file_name)
}

/// Prefix shared by every processed artifact of a video.
pub fn processed_prefix(video_id: u64) -> String {
    format!("processed/{}/", video_id)
}

pub fn cover_object(video_id: u64) -> String {
    format!("processed/{}/{}", video_id, COVER_FILE_NAME)
}

/// Prefix of one rendition's files.
pub fn rendition_prefix(video_id: u64, profile: &str) -> String {
    format!("processed/{}/hls_{}/", video_id, profile)
}

pub fn rendition_object(video_id: u64, profile: &str, file_name: &str) -> String {
    format!("{}{}", rendition_prefix(video_id, profile), file_name)
}

/// Key of a rendition's playlist; this is what gets stored as the source URL.
pub fn playlist_object(video_id: u64, profile: &str) -> String {
    rendition_object(video_id, profile, &format!("{}.m3u8", profile))
}
