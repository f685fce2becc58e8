use super::store::{ObjectStore, StoreError};
use super::PublishedArtifact;
use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Object store laid out on local disk as `<root>/<bucket>/<key>`.
///
/// Object metadata is not persisted; only bodies are written.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves a bucket/key pair, rejecting keys that escape the bucket
    pub fn object_path(&self, bucket: &str, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if bucket.is_empty() || key.is_empty() || escapes || bucket.contains('/') {
            return None;
        }
        Some(self.root.join(bucket).join(relative))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        let not_found = || StoreError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        };
        let path = self.object_path(bucket, key).ok_or_else(not_found)?;

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(not_found()),
            Err(e) => Err(StoreError::Read {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    async fn put_object(&self, bucket: &str, artifact: &PublishedArtifact) -> Result<(), StoreError> {
        let write_error = |message: String| StoreError::Write {
            bucket: bucket.to_string(),
            key: artifact.key.clone(),
            message,
        };
        let path = self
            .object_path(bucket, &artifact.key)
            .ok_or_else(|| write_error("invalid bucket or key".to_string()))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| write_error(e.to_string()))?;
        }
        tokio::fs::write(&path, &artifact.body)
            .await
            .map_err(|e| write_error(e.to_string()))
    }
}
