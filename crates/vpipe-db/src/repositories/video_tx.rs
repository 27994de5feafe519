//! Transactional operations for videos and their renditions.
//!
//! These methods operate within an existing transaction and do NOT commit.
//! The caller is responsible for committing or rolling back the transaction.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use vpipe_models::{VideoSource, VideoStatus};

use crate::error::{to_db_int, DbError, DbResult};

pub struct VideoTxOps;

impl VideoTxOps {
    /// Mark a video online with its probed duration.
    ///
    /// A `None` cover keeps whatever cover the row already has.
    pub async fn mark_online(
        tx: &mut SqliteConnection,
        video_id: u64,
        duration_secs: u64,
        cover_url: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE videos
            SET status = ?, duration = ?, cover_url = COALESCE(?, cover_url), updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(VideoStatus::Online.as_str())
        .bind(to_db_int("duration", duration_secs)?)
        .bind(cover_url)
        .bind(now.timestamp_millis())
        .bind(to_db_int("id", video_id)?)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::VideoNotFound(video_id));
        }
        Ok(())
    }

    /// Insert a rendition, or refresh the existing row for the same quality.
    pub async fn upsert_source(tx: &mut SqliteConnection, source: &VideoSource) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO video_sources (video_id, quality, format, url, file_size, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (video_id, quality) DO UPDATE SET
                format = excluded.format,
                url = excluded.url,
                file_size = excluded.file_size
            "#,
        )
        .bind(to_db_int("video_id", source.video_id)?)
        .bind(&source.quality)
        .bind(&source.format)
        .bind(&source.url)
        .bind(to_db_int("file_size", source.file_size)?)
        .bind(source.created_at.timestamp_millis())
        .execute(&mut *tx)
        .await?;

        Ok(())
    }
}
