use super::PublishedArtifact;
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Object s3://{bucket}/{key} not found")]
    NotFound { bucket: String, key: String },

    #[error("Failed to read s3://{bucket}/{key}: {message}")]
    Read {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("Failed to write s3://{bucket}/{key}: {message}")]
    Write {
        bucket: String,
        key: String,
        message: String,
    },
}

/// Object storage holding uploaded archives and served assets
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError>;

    /// Writes an artifact, replacing any object already stored under its key
    async fn put_object(&self, bucket: &str, artifact: &PublishedArtifact) -> Result<(), StoreError>;
}
