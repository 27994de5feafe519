//! Transcode pipeline for one video.
//!
//! ```text
//! fetch -> workspace -> download -> probe -> cover? -> encode+upload per profile -> commit
//! ```
//!
//! Every stage after the download marks the video `failed` when it aborts the
//! job. The scratch directory is a [`tempfile::TempDir`], so it is removed on
//! every exit path.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tempfile::TempDir;
use tracing::Instrument;

use vpipe_db::{TranscodeCommit, VideoRepository};
use vpipe_media::{total_size, Encoder};
use vpipe_models::encoding::{content_type, content_type_for, COVER_FILE_NAME, COVER_OFFSET_SECS};
use vpipe_models::{keys, Profile, Video, VideoSource, VideoStatus};
use vpipe_storage::ArtifactStore;

use crate::config::WorkerConfig;
use crate::error::TranscodeError;
use crate::logging::JobLogger;
use crate::metrics;

/// Local name used when the uploaded file name has no usable final component.
const FALLBACK_SOURCE_NAME: &str = "source";

/// Pipeline settings shared by every job.
#[derive(Debug, Clone)]
pub struct TranscodeSettings {
    pub profiles: Vec<Profile>,
    pub work_dir: PathBuf,
    pub cleanup_orphans: bool,
}

impl TranscodeSettings {
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            profiles: config.profiles.clone(),
            work_dir: config.work_dir.clone(),
            cleanup_orphans: config.cleanup_orphans,
        }
    }
}

/// One rendition written by a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionOutcome {
    pub profile: String,
    pub playlist_key: String,
    pub files: usize,
    pub bytes: u64,
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeOutcome {
    pub video_id: u64,
    pub duration_secs: u64,
    pub cover_url: Option<String>,
    pub renditions: Vec<RenditionOutcome>,
}

/// Runs the transcode pipeline against injected encoder, store and repository.
pub struct TranscodeOrchestrator<E, S, R> {
    encoder: Arc<E>,
    store: Arc<S>,
    repo: Arc<R>,
    settings: TranscodeSettings,
}

/// Keys uploaded during one run, for orphan cleanup.
#[derive(Debug, Default)]
struct UploadLedger {
    keys: Vec<String>,
}

impl<E, S, R> TranscodeOrchestrator<E, S, R>
where
    E: Encoder,
    S: ArtifactStore,
    R: VideoRepository,
{
    pub fn new(encoder: Arc<E>, store: Arc<S>, repo: Arc<R>, settings: TranscodeSettings) -> Self {
        Self {
            encoder,
            store,
            repo,
            settings,
        }
    }

    pub fn settings(&self) -> &TranscodeSettings {
        &self.settings
    }

    /// Transcode one video into every configured HLS profile.
    pub async fn transcode(&self, video_id: u64) -> Result<TranscodeOutcome, TranscodeError> {
        let logger = JobLogger::new(video_id, "transcode");
        let span = logger.create_span();
        self.run(video_id, &logger).instrument(span).await
    }

    async fn run(&self, video_id: u64, logger: &JobLogger) -> Result<TranscodeOutcome, TranscodeError> {
        let started = Instant::now();

        let video = self
            .repo
            .get_video(video_id)
            .await?
            .ok_or(TranscodeError::NotFound(video_id))?;

        if !video.status.is_transcodable() {
            return Err(TranscodeError::InvalidState {
                video_id,
                status: video.status,
            });
        }
        logger.log_start(&format!(
            "{} ({}), {} profile(s)",
            video.original_file_name,
            video.status,
            self.settings.profiles.len()
        ));

        let workspace = self.create_workspace(video_id).await?;
        let mut ledger = UploadLedger::default();

        match self.execute(&video, workspace.path(), &mut ledger, logger).await {
            Ok(outcome) => {
                metrics::record_completed(started.elapsed());
                logger.log_completion(&format!(
                    "{} rendition(s), duration {}s",
                    outcome.renditions.len(),
                    outcome.duration_secs
                ));
                Ok(outcome)
            }
            Err(err) => {
                logger.log_error(&err.to_string());
                if err.marks_failed() {
                    match self.repo.mark_failed(video_id).await {
                        Ok(true) => {}
                        Ok(false) => logger.log_warning("video is online, status left unchanged"),
                        Err(e) => logger.log_error(&format!("could not mark video failed: {}", e)),
                    }
                }
                // Online rows reference the same keys this run wrote, whether
                // they were online before the job or committed by another
                // delivery of the same task while it ran.
                if self.settings.cleanup_orphans
                    && video.status != VideoStatus::Online
                    && !self.is_serving(video_id, logger).await
                {
                    self.cleanup_orphans(&ledger, logger).await;
                }
                Err(err)
            }
        }
    }

    /// Whether the row is online now. An unreadable row counts as serving.
    async fn is_serving(&self, video_id: u64, logger: &JobLogger) -> bool {
        match self.repo.get_video(video_id).await {
            Ok(Some(current)) => current.status == VideoStatus::Online,
            Ok(None) => false,
            Err(e) => {
                logger.log_warning(&format!("cannot re-read video, keeping uploads: {}", e));
                true
            }
        }
    }

    async fn create_workspace(&self, video_id: u64) -> Result<TempDir, TranscodeError> {
        tokio::fs::create_dir_all(&self.settings.work_dir)
            .await
            .map_err(TranscodeError::Workspace)?;

        tempfile::Builder::new()
            .prefix(&format!("video-{}-", video_id))
            .tempdir_in(&self.settings.work_dir)
            .map_err(TranscodeError::Workspace)
    }

    async fn execute(
        &self,
        video: &Video,
        workspace: &Path,
        ledger: &mut UploadLedger,
        logger: &JobLogger,
    ) -> Result<TranscodeOutcome, TranscodeError> {
        let video_id = video.id;

        // Download
        let stage = Instant::now();
        let raw_key = keys::raw_object(video_id, &video.original_file_name);
        let local_source = workspace.join(local_source_name(&video.original_file_name));
        let bytes = self
            .store
            .download_file(&raw_key, &local_source)
            .await
            .map_err(|source| TranscodeError::Download {
                key: raw_key.clone(),
                source,
            })?;
        metrics::record_stage("download", stage.elapsed());
        logger.log_progress(&format!("downloaded {} ({} bytes)", raw_key, bytes));

        // Probe
        let stage = Instant::now();
        let probe = self
            .encoder
            .probe(&local_source)
            .await
            .map_err(TranscodeError::Probe)?;
        let duration_secs = probe.whole_seconds();
        metrics::record_stage("probe", stage.elapsed());
        logger.log_progress(&format!("probed duration {:.3}s", probe.duration_secs));

        let cover_url = self
            .cover(video_id, &local_source, workspace, ledger, logger)
            .await;

        let mut sources = Vec::with_capacity(self.settings.profiles.len());
        let mut renditions = Vec::with_capacity(self.settings.profiles.len());
        for profile in &self.settings.profiles {
            let rendition = self
                .encode_profile(video_id, profile, &local_source, workspace, ledger, logger)
                .await?;
            sources.push(VideoSource::hls(
                video_id,
                &profile.name,
                &rendition.playlist_key,
                rendition.bytes,
            ));
            renditions.push(rendition);
        }

        // Commit
        let stage = Instant::now();
        let commit = TranscodeCommit {
            video_id,
            duration_secs,
            cover_url: cover_url.clone(),
            sources,
        };
        self.repo
            .commit_transcode(&commit)
            .await
            .map_err(TranscodeError::Commit)?;
        metrics::record_stage("commit", stage.elapsed());

        Ok(TranscodeOutcome {
            video_id,
            duration_secs,
            cover_url,
            renditions,
        })
    }

    /// Extract and upload the cover. Failures are logged and yield `None`.
    async fn cover(
        &self,
        video_id: u64,
        local_source: &Path,
        workspace: &Path,
        ledger: &mut UploadLedger,
        logger: &JobLogger,
    ) -> Option<String> {
        let stage = Instant::now();
        let cover_path = workspace.join(COVER_FILE_NAME);

        if let Err(e) = self
            .encoder
            .extract_cover(local_source, &cover_path, COVER_OFFSET_SECS)
            .await
        {
            logger.log_warning(&format!("cover extraction failed: {}", e));
            return None;
        }

        let key = keys::cover_object(video_id);
        if let Err(e) = self
            .store
            .upload_file(&cover_path, &key, content_type::JPEG)
            .await
        {
            logger.log_warning(&format!("cover upload to {} failed: {}", key, e));
            return None;
        }
        ledger.keys.push(key.clone());
        metrics::record_stage("cover", stage.elapsed());

        Some(key)
    }

    async fn encode_profile(
        &self,
        video_id: u64,
        profile: &Profile,
        local_source: &Path,
        workspace: &Path,
        ledger: &mut UploadLedger,
        logger: &JobLogger,
    ) -> Result<RenditionOutcome, TranscodeError> {
        let stage = Instant::now();
        let output_dir = workspace.join(profile.output_dir_name());
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(TranscodeError::Workspace)?;

        let files = self
            .encoder
            .transcode_hls(
                local_source,
                &profile.resolution,
                &output_dir,
                &profile.playlist_name(),
            )
            .await
            .map_err(|source| TranscodeError::Encode {
                profile: profile.name.clone(),
                source,
            })?;
        metrics::record_stage("encode", stage.elapsed());

        let stage = Instant::now();
        let bytes = total_size(&files);
        for file in &files {
            let key = keys::rendition_object(video_id, &profile.name, &file.name);
            self.store
                .upload_file(&file.path, &key, content_type_for(&file.name))
                .await
                .map_err(|source| TranscodeError::Upload {
                    key: key.clone(),
                    source,
                })?;
            ledger.keys.push(key);
        }
        metrics::record_stage("upload", stage.elapsed());
        metrics::record_uploaded_bytes(bytes);

        logger.log_progress(&format!(
            "profile {}: {} file(s), {} bytes",
            profile.name,
            files.len(),
            bytes
        ));

        Ok(RenditionOutcome {
            profile: profile.name.clone(),
            playlist_key: keys::playlist_object(video_id, &profile.name),
            files: files.len(),
            bytes,
        })
    }

    async fn cleanup_orphans(&self, ledger: &UploadLedger, logger: &JobLogger) {
        if ledger.keys.is_empty() {
            return;
        }
        match self.store.delete_objects(&ledger.keys).await {
            Ok(deleted) => logger.log_progress(&format!("removed {} orphaned object(s)", deleted)),
            Err(e) => logger.log_warning(&format!(
                "orphan cleanup of {} object(s) failed: {}",
                ledger.keys.len(),
                e
            )),
        }
    }
}

/// File name for the downloaded source inside the workspace.
///
/// Only the final path component of the stored name is used.
fn local_source_name(original_file_name: &str) -> String {
    Path::new(original_file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or(FALLBACK_SOURCE_NAME)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use vpipe_db::{init_memory_pool, NewVideo, SqliteVideoRepository};
    use vpipe_media::FakeEncoder;
    use vpipe_models::default_profiles;
    use vpipe_storage::{MemoryStore, StorageError, StorageResult};

    type TestOrchestrator = TranscodeOrchestrator<FakeEncoder, MemoryStore, SqliteVideoRepository>;

    struct Harness {
        store: Arc<MemoryStore>,
        repo: Arc<SqliteVideoRepository>,
        work: TempDir,
    }

    impl Harness {
        async fn new() -> Self {
            Self {
                store: Arc::new(MemoryStore::new()),
                repo: Arc::new(SqliteVideoRepository::new(init_memory_pool().await.unwrap())),
                work: TempDir::new().unwrap(),
            }
        }

        async fn seed(&self, status: VideoStatus) -> Video {
            let video = self
                .repo
                .insert_video(&NewVideo::new("clip.mp4", status))
                .await
                .unwrap();
            self.store.put(
                keys::raw_object(video.id, "clip.mp4"),
                b"raw-bytes".to_vec(),
                "video/mp4",
            );
            video
        }

        fn settings(&self) -> TranscodeSettings {
            TranscodeSettings {
                profiles: default_profiles(),
                work_dir: self.work.path().to_path_buf(),
                cleanup_orphans: true,
            }
        }

        fn orchestrator(&self, encoder: FakeEncoder) -> TestOrchestrator {
            TranscodeOrchestrator::new(
                Arc::new(encoder),
                Arc::clone(&self.store),
                Arc::clone(&self.repo),
                self.settings(),
            )
        }

        async fn video(&self, id: u64) -> Video {
            self.repo.get_video(id).await.unwrap().unwrap()
        }

        fn stored_size(&self, prefix: &str) -> u64 {
            self.store
                .keys_with_prefix(prefix)
                .iter()
                .filter_map(|k| self.store.get(k))
                .map(|o| o.bytes.len() as u64)
                .sum()
        }

        fn workspace_is_empty(&self) -> bool {
            std::fs::read_dir(self.work.path()).unwrap().next().is_none()
        }
    }

    /// Runs a second delivery of the same task to completion in the middle
    /// of one upload, then fails that upload.
    struct InterleavedStore {
        inner: Arc<MemoryStore>,
        trigger_suffix: &'static str,
        rival: Mutex<Option<(TestOrchestrator, u64)>>,
    }

    #[async_trait::async_trait]
    impl ArtifactStore for InterleavedStore {
        async fn download_file(&self, key: &str, path: &Path) -> StorageResult<u64> {
            self.inner.download_file(key, path).await
        }

        async fn upload_file(&self, path: &Path, key: &str, content_type: &str) -> StorageResult<()> {
            if key.ends_with(self.trigger_suffix) {
                let rival = self.rival.lock().unwrap().take();
                if let Some((rival, video_id)) = rival {
                    rival.transcode(video_id).await.unwrap();
                    return Err(StorageError::upload_failed("connection reset"));
                }
            }
            self.inner.upload_file(path, key, content_type).await
        }

        async fn delete_objects(&self, keys: &[String]) -> StorageResult<u32> {
            self.inner.delete_objects(keys).await
        }
    }

    #[test]
    fn test_local_source_name() {
        assert_eq!(local_source_name("clip.mp4"), "clip.mp4");
        assert_eq!(local_source_name("../../etc/passwd"), "passwd");
        assert_eq!(local_source_name("nested/dir/movie.mov"), "movie.mov");
        assert_eq!(local_source_name(""), "source");
        assert_eq!(local_source_name(".."), "source");
    }

    #[tokio::test]
    async fn test_transcode_success() {
        let h = Harness::new().await;
        let video = h.seed(VideoStatus::Transcoding).await;

        let outcome = h
            .orchestrator(FakeEncoder::new().with_duration(12.8))
            .transcode(video.id)
            .await
            .unwrap();

        assert_eq!(outcome.duration_secs, 12);
        assert_eq!(outcome.renditions.len(), 2);

        let stored = h.video(video.id).await;
        assert_eq!(stored.status, VideoStatus::Online);
        assert_eq!(stored.duration, 12);
        assert_eq!(stored.cover_url, Some(keys::cover_object(video.id)));
        assert!(h.store.get(&keys::cover_object(video.id)).is_some());

        let sources = h.repo.list_sources(video.id).await.unwrap();
        assert_eq!(sources.len(), 2);
        for (source, profile) in sources.iter().zip(default_profiles()) {
            assert_eq!(source.quality, profile.name);
            assert_eq!(source.format, "HLS");
            assert!(source.url.ends_with(".m3u8"));
            assert_eq!(source.url, keys::playlist_object(video.id, &profile.name));
            assert_eq!(
                source.file_size,
                h.stored_size(&keys::rendition_prefix(video.id, &profile.name))
            );
        }

        let playlist = h
            .store
            .get(&keys::playlist_object(video.id, "720p"))
            .unwrap();
        assert_eq!(playlist.content_type, "application/vnd.apple.mpegurl");
        let segment = h
            .store
            .get(&keys::rendition_object(video.id, "720p", "720p0.ts"))
            .unwrap();
        assert_eq!(segment.content_type, "video/mp2t");

        assert!(h.workspace_is_empty());
    }

    #[tokio::test]
    async fn test_encode_failure_marks_failed_and_cleans_up() {
        let h = Harness::new().await;
        let video = h.seed(VideoStatus::Transcoding).await;
        let encoder = FakeEncoder::new().failing_rendition("720p");
        let orchestrator = h.orchestrator(encoder);

        let err = orchestrator.transcode(video.id).await.unwrap_err();
        match &err {
            TranscodeError::Encode { profile, .. } => assert_eq!(profile, "720p"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!err.is_retryable());

        assert_eq!(h.video(video.id).await.status, VideoStatus::Failed);
        assert!(h.repo.list_sources(video.id).await.unwrap().is_empty());
        // 360p segments and the cover were uploaded, then removed
        assert!(h
            .store
            .keys_with_prefix(&keys::processed_prefix(video.id))
            .is_empty());
        assert!(h.workspace_is_empty());
    }

    #[tokio::test]
    async fn test_probe_failure_marks_failed() {
        let h = Harness::new().await;
        let video = h.seed(VideoStatus::Transcoding).await;
        let orchestrator = h.orchestrator(FakeEncoder::new().failing_probe());

        let err = orchestrator.transcode(video.id).await.unwrap_err();
        assert!(matches!(err, TranscodeError::Probe(_)));
        assert!(!err.is_retryable());
        assert_eq!(h.video(video.id).await.status, VideoStatus::Failed);
    }

    #[tokio::test]
    async fn test_missing_raw_object_is_terminal() {
        let h = Harness::new().await;
        let video = h
            .repo
            .insert_video(&NewVideo::new("gone.mp4", VideoStatus::Transcoding))
            .await
            .unwrap();

        let err = h
            .orchestrator(FakeEncoder::new())
            .transcode(video.id)
            .await
            .unwrap_err();
        match &err {
            TranscodeError::Download { key, source } => {
                assert_eq!(key, &keys::raw_object(video.id, "gone.mp4"));
                assert!(source.is_not_found());
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!err.is_retryable());
        assert_eq!(h.video(video.id).await.status, VideoStatus::Failed);
    }

    #[tokio::test]
    async fn test_download_outage_is_retryable() {
        let h = Harness::new().await;
        let video = h.seed(VideoStatus::Transcoding).await;
        h.store.set_download_outage(true);
        let encoder = FakeEncoder::new();
        let orchestrator = h.orchestrator(encoder);

        let err = orchestrator.transcode(video.id).await.unwrap_err();
        assert!(matches!(err, TranscodeError::Download { .. }));
        assert!(err.is_retryable());
        assert_eq!(h.video(video.id).await.status, VideoStatus::Failed);
    }

    #[tokio::test]
    async fn test_upload_failure_is_retryable() {
        let h = Harness::new().await;
        let video = h.seed(VideoStatus::Transcoding).await;
        h.store.fail_uploads_ending_with("720p.m3u8");

        let err = h
            .orchestrator(FakeEncoder::new())
            .transcode(video.id)
            .await
            .unwrap_err();
        match &err {
            TranscodeError::Upload { key, .. } => {
                assert_eq!(key, &keys::playlist_object(video.id, "720p"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.is_retryable());
        assert_eq!(h.video(video.id).await.status, VideoStatus::Failed);
        assert!(h
            .store
            .keys_with_prefix(&keys::processed_prefix(video.id))
            .is_empty());
    }

    #[tokio::test]
    async fn test_commit_failure_leaves_row_unchanged() {
        let h = Harness::new().await;
        let video = h.seed(VideoStatus::Transcoding).await;

        sqlx::query(
            r#"
            CREATE TRIGGER reject_sources BEFORE INSERT ON video_sources
            BEGIN
                SELECT RAISE(ABORT, 'rejected');
            END
            "#,
        )
        .execute(h.repo.pool())
        .await
        .unwrap();

        let err = h
            .orchestrator(FakeEncoder::new())
            .transcode(video.id)
            .await
            .unwrap_err();
        assert!(matches!(err, TranscodeError::Commit(_)));
        assert!(err.is_retryable());

        let stored = h.video(video.id).await;
        assert_eq!(stored.status, VideoStatus::Transcoding);
        assert_eq!(stored.duration, 0);
        assert!(h.repo.list_sources(video.id).await.unwrap().is_empty());
        assert!(h
            .store
            .keys_with_prefix(&keys::processed_prefix(video.id))
            .is_empty());
    }

    #[tokio::test]
    async fn test_reprocess_is_idempotent() {
        let h = Harness::new().await;
        let video = h.seed(VideoStatus::Transcoding).await;
        let orchestrator = h.orchestrator(FakeEncoder::new());

        let first = orchestrator.transcode(video.id).await.unwrap();
        let second = orchestrator.transcode(video.id).await.unwrap();
        assert_eq!(first, second);

        let stored = h.video(video.id).await;
        assert_eq!(stored.status, VideoStatus::Online);
        assert_eq!(h.repo.list_sources(video.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_reprocess_of_online_video_keeps_serving() {
        let h = Harness::new().await;
        let video = h.seed(VideoStatus::Transcoding).await;
        h.orchestrator(FakeEncoder::new())
            .transcode(video.id)
            .await
            .unwrap();
        let before = h.store.keys_with_prefix(&keys::processed_prefix(video.id));

        let err = h
            .orchestrator(FakeEncoder::new().failing_rendition("720p"))
            .transcode(video.id)
            .await
            .unwrap_err();
        assert!(matches!(err, TranscodeError::Encode { .. }));

        assert_eq!(h.video(video.id).await.status, VideoStatus::Online);
        assert_eq!(h.repo.list_sources(video.id).await.unwrap().len(), 2);
        assert_eq!(
            h.store.keys_with_prefix(&keys::processed_prefix(video.id)),
            before
        );
    }

    #[tokio::test]
    async fn test_overlapping_deliveries_converge_on_committed_run() {
        let h = Harness::new().await;
        let video = h.seed(VideoStatus::Transcoding).await;

        let store = InterleavedStore {
            inner: Arc::clone(&h.store),
            trigger_suffix: "720p.m3u8",
            rival: Mutex::new(Some((h.orchestrator(FakeEncoder::new()), video.id))),
        };
        let losing = TranscodeOrchestrator::new(
            Arc::new(FakeEncoder::new()),
            Arc::new(store),
            Arc::clone(&h.repo),
            h.settings(),
        );

        let err = losing.transcode(video.id).await.unwrap_err();
        assert!(matches!(err, TranscodeError::Upload { .. }));

        let stored = h.video(video.id).await;
        assert_eq!(stored.status, VideoStatus::Online);
        assert_eq!(stored.cover_url, Some(keys::cover_object(video.id)));
        assert!(h.store.get(&keys::cover_object(video.id)).is_some());

        let sources = h.repo.list_sources(video.id).await.unwrap();
        assert_eq!(sources.len(), 2);
        for source in &sources {
            assert!(h.store.get(&source.url).is_some(), "{} was deleted", source.url);
            assert!(!h
                .store
                .keys_with_prefix(&keys::rendition_prefix(video.id, &source.quality))
                .is_empty());
        }
        assert!(h.workspace_is_empty());
    }

    #[tokio::test]
    async fn test_invalid_state_is_untouched() {
        let h = Harness::new().await;
        let video = h.seed(VideoStatus::Uploading).await;
        let orchestrator = h.orchestrator(FakeEncoder::new());

        let err = orchestrator.transcode(video.id).await.unwrap_err();
        assert!(matches!(
            err,
            TranscodeError::InvalidState {
                status: VideoStatus::Uploading,
                ..
            }
        ));
        assert!(!err.is_retryable());
        assert_eq!(h.video(video.id).await.status, VideoStatus::Uploading);
        assert!(orchestrator.encoder.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_video() {
        let h = Harness::new().await;
        let err = h
            .orchestrator(FakeEncoder::new())
            .transcode(404)
            .await
            .unwrap_err();
        assert!(matches!(err, TranscodeError::NotFound(404)));
        assert!(h.workspace_is_empty());
    }

    #[tokio::test]
    async fn test_id_beyond_row_range_is_not_found() {
        let h = Harness::new().await;
        let err = h
            .orchestrator(FakeEncoder::new())
            .transcode(u64::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, TranscodeError::NotFound(u64::MAX)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_cover_failure_is_not_fatal() {
        let h = Harness::new().await;
        let video = h.seed(VideoStatus::Failed).await;
        let orchestrator = h.orchestrator(FakeEncoder::new().failing_cover());

        let outcome = orchestrator.transcode(video.id).await.unwrap();
        assert_eq!(outcome.cover_url, None);

        let stored = h.video(video.id).await;
        assert_eq!(stored.status, VideoStatus::Online);
        assert_eq!(stored.cover_url, None);
        assert_eq!(
            orchestrator.encoder.calls(),
            vec!["probe", "cover", "hls:360p", "hls:720p"]
        );
    }
}
