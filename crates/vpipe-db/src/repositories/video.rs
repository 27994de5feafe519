//! Video repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use vpipe_models::{Video, VideoSource, VideoStatus};

use crate::error::{from_db_int, to_db_int, DbError, DbResult};
use crate::repositories::video_tx::VideoTxOps;

/// Everything a successful pipeline run writes, applied atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeCommit {
    pub video_id: u64,
    pub duration_secs: u64,
    pub cover_url: Option<String>,
    pub sources: Vec<VideoSource>,
}

/// Fields for creating a video row.
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub user_id: u64,
    pub title: String,
    pub description: String,
    pub original_file_name: String,
    pub status: VideoStatus,
}

impl NewVideo {
    pub fn new(original_file_name: impl Into<String>, status: VideoStatus) -> Self {
        let original_file_name = original_file_name.into();
        Self {
            user_id: 0,
            title: original_file_name.clone(),
            description: String::new(),
            original_file_name,
            status,
        }
    }
}

/// Video repository trait.
#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn get_video(&self, id: u64) -> DbResult<Option<Video>>;
    async fn update_status(&self, id: u64, status: VideoStatus) -> DbResult<()>;
    /// Set `failed` unless the row is already `online`.
    ///
    /// Returns `false` when nothing changed: the video is online or missing.
    async fn mark_failed(&self, id: u64) -> DbResult<bool>;
    /// Mark the video online and upsert its renditions in one transaction.
    async fn commit_transcode(&self, commit: &TranscodeCommit) -> DbResult<()>;
    async fn list_sources(&self, video_id: u64) -> DbResult<Vec<VideoSource>>;
}

#[derive(Debug, FromRow)]
struct VideoRow {
    id: i64,
    user_id: i64,
    title: String,
    description: String,
    original_file_name: String,
    status: String,
    duration: i64,
    cover_url: Option<String>,
    created_at: i64,
    updated_at: i64,
}

#[derive(Debug, FromRow)]
struct SourceRow {
    video_id: i64,
    quality: String,
    format: String,
    url: String,
    file_size: i64,
    created_at: i64,
}

fn from_millis(column: &str, ms: i64) -> DbResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| DbError::invalid_row(format!("{} out of range: {}", column, ms)))
}

impl TryFrom<VideoRow> for Video {
    type Error = DbError;

    fn try_from(row: VideoRow) -> DbResult<Self> {
        Ok(Video {
            id: from_db_int("id", row.id)?,
            user_id: from_db_int("user_id", row.user_id)?,
            title: row.title,
            description: row.description,
            original_file_name: row.original_file_name,
            status: row
                .status
                .parse()
                .map_err(|e: vpipe_models::ModelError| DbError::invalid_row(e.to_string()))?,
            duration: from_db_int("duration", row.duration)?,
            cover_url: row.cover_url.filter(|c| !c.is_empty()),
            created_at: from_millis("created_at", row.created_at)?,
            updated_at: from_millis("updated_at", row.updated_at)?,
        })
    }
}

impl TryFrom<SourceRow> for VideoSource {
    type Error = DbError;

    fn try_from(row: SourceRow) -> DbResult<Self> {
        Ok(VideoSource {
            video_id: from_db_int("video_id", row.video_id)?,
            quality: row.quality,
            format: row.format,
            url: row.url,
            file_size: from_db_int("file_size", row.file_size)?,
            created_at: from_millis("created_at", row.created_at)?,
        })
    }
}

/// SQLx implementation of VideoRepository.
#[derive(Clone)]
pub struct SqliteVideoRepository {
    pool: SqlitePool,
}

impl SqliteVideoRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create a video row and return it.
    pub async fn insert_video(&self, video: &NewVideo) -> DbResult<Video> {
        let now = Utc::now().timestamp_millis();
        let result = sqlx::query(
            r#"
            INSERT INTO videos (user_id, title, description, original_file_name, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(to_db_int("user_id", video.user_id)?)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.original_file_name)
        .bind(video.status.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = from_db_int("id", result.last_insert_rowid())?;
        self.get_video(id)
            .await?
            .ok_or(DbError::VideoNotFound(id))
    }
}

#[async_trait]
impl VideoRepository for SqliteVideoRepository {
    async fn get_video(&self, id: u64) -> DbResult<Option<Video>> {
        // No row can hold an id beyond i64
        let Ok(db_id) = to_db_int("id", id) else {
            return Ok(None);
        };
        sqlx::query_as::<_, VideoRow>("SELECT * FROM videos WHERE id = ?")
            .bind(db_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Video::try_from)
            .transpose()
    }

    async fn update_status(&self, id: u64, status: VideoStatus) -> DbResult<()> {
        let result = sqlx::query("UPDATE videos SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now().timestamp_millis())
            .bind(to_db_int("id", id)?)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::VideoNotFound(id));
        }
        Ok(())
    }

    async fn mark_failed(&self, id: u64) -> DbResult<bool> {
        let Ok(db_id) = to_db_int("id", id) else {
            return Ok(false);
        };
        let result = sqlx::query(
            "UPDATE videos SET status = ?, updated_at = ? WHERE id = ? AND status != ?",
        )
        .bind(VideoStatus::Failed.as_str())
        .bind(Utc::now().timestamp_millis())
        .bind(db_id)
        .bind(VideoStatus::Online.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit_transcode(&self, commit: &TranscodeCommit) -> DbResult<()> {
        // Dropping the transaction on an early return rolls it back
        let mut tx = self.pool.begin().await?;

        VideoTxOps::mark_online(
            &mut *tx,
            commit.video_id,
            commit.duration_secs,
            commit.cover_url.as_deref(),
            Utc::now(),
        )
        .await?;

        for source in &commit.sources {
            VideoTxOps::upsert_source(&mut *tx, source).await?;
        }

        tx.commit().await?;

        tracing::debug!(
            video_id = commit.video_id,
            sources = commit.sources.len(),
            "Committed transcode result"
        );
        Ok(())
    }

    async fn list_sources(&self, video_id: u64) -> DbResult<Vec<VideoSource>> {
        sqlx::query_as::<_, SourceRow>(
            "SELECT video_id, quality, format, url, file_size, created_at FROM video_sources WHERE video_id = ? ORDER BY id",
        )
        .bind(to_db_int("video_id", video_id)?)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(VideoSource::try_from)
        .collect()
    }
}
