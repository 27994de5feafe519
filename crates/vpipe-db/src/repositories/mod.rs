//! Repositories.

pub mod video;
pub mod video_tx;

pub use video::{NewVideo, SqliteVideoRepository, TranscodeCommit, VideoRepository};
pub use video_tx::VideoTxOps;
