//! In-memory artifact store for pipeline tests.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};
use crate::store::ArtifactStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Bucket held in a map, with injectable failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    failing_uploads: Mutex<HashSet<String>>,
    download_outage: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object.
    pub fn put(&self, key: impl Into<String>, bytes: impl Into<Vec<u8>>, content_type: &str) {
        if let Ok(mut objects) = self.objects.lock() {
            objects.insert(
                key.into(),
                StoredObject {
                    bytes: bytes.into(),
                    content_type: content_type.to_string(),
                },
            );
        }
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().ok()?.get(key).cloned()
    }

    /// Keys currently stored, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Keys under `prefix`, sorted.
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.keys()
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect()
    }

    /// Make uploads to keys ending with `suffix` fail.
    pub fn fail_uploads_ending_with(&self, suffix: impl Into<String>) {
        if let Ok(mut failing) = self.failing_uploads.lock() {
            failing.insert(suffix.into());
        }
    }

    /// Make every download fail with a non-NotFound error.
    pub fn set_download_outage(&self, outage: bool) {
        if let Ok(mut flag) = self.download_outage.lock() {
            *flag = outage;
        }
    }

    fn upload_should_fail(&self, key: &str) -> bool {
        self.failing_uploads
            .lock()
            .map(|f| f.iter().any(|suffix| key.ends_with(suffix.as_str())))
            .unwrap_or(false)
    }

    fn lock_error() -> StorageError {
        StorageError::AwsSdk("memory store lock poisoned".to_string())
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn download_file(&self, key: &str, path: &Path) -> StorageResult<u64> {
        if self.download_outage.lock().map(|f| *f).unwrap_or(false) {
            return Err(StorageError::download_failed("connection reset by peer"));
        }

        let object = self.get(key).ok_or_else(|| StorageError::not_found(key))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &object.bytes).await?;
        Ok(object.bytes.len() as u64)
    }

    async fn upload_file(&self, path: &Path, key: &str, content_type: &str) -> StorageResult<()> {
        if self.upload_should_fail(key) {
            return Err(StorageError::upload_failed(format!("injected failure for {}", key)));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;
        self.put(key, bytes, content_type);
        Ok(())
    }

    async fn delete_objects(&self, keys: &[String]) -> StorageResult<u32> {
        let mut objects = self.objects.lock().map_err(|_| Self::lock_error())?;
        for key in keys {
            objects.remove(key);
        }
        Ok(keys.len() as u32)
    }
}
