//! Artifact store port used by the transcode pipeline.

use std::path::Path;

use async_trait::async_trait;

use crate::client::S3Client;
use crate::error::StorageResult;

/// Object operations the pipeline performs against the bucket.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Fetch `key` into `path`, returning the number of bytes written.
    async fn download_file(&self, key: &str, path: &Path) -> StorageResult<u64>;

    /// Put the file at `path` under `key`, overwriting any existing object.
    async fn upload_file(&self, path: &Path, key: &str, content_type: &str) -> StorageResult<()>;

    /// Remove objects; missing keys are not an error.
    async fn delete_objects(&self, keys: &[String]) -> StorageResult<u32>;
}

#[async_trait]
impl ArtifactStore for S3Client {
    async fn download_file(&self, key: &str, path: &Path) -> StorageResult<u64> {
        S3Client::download_file(self, key, path).await
    }

    async fn upload_file(&self, path: &Path, key: &str, content_type: &str) -> StorageResult<()> {
        S3Client::upload_file(self, path, key, content_type).await
    }

    async fn delete_objects(&self, keys: &[String]) -> StorageResult<u32> {
        S3Client::delete_objects(self, keys).await
    }
}
