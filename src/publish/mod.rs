//! Publishing build output to the serving bucket
//!
//! Only the top level of the output directory is published. Nested
//! directories are skipped, so a build has to emit a flat layout. Every
//! object is written with `Cache-Control: no-store` because the whole site is
//! re-published on each run.

pub mod content_type;
pub mod fs_store;
pub mod memory;
pub mod s3;
pub mod store;

pub use content_type::content_type_for;
pub use fs_store::FsObjectStore;
pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;
pub use store::{ObjectStore, StoreError};

use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

pub const CACHE_CONTROL_NO_STORE: &str = "no-store";

pub const DEFAULT_MAX_CONCURRENT_UPLOADS: usize = 8;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to read build output {path}: {source}")]
    ReadOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{failed} of {total} uploads failed ({succeeded} already published); first failure: {first}")]
    UploadFailed {
        failed: usize,
        succeeded: usize,
        total: usize,
        first: StoreError,
    },
}

/// One file of build output, ready to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedArtifact {
    pub key: String,
    pub body: Bytes,
    pub content_type: &'static str,
    pub cache_control: String,
}

impl PublishedArtifact {
    pub fn new(key: impl Into<String>, body: Bytes) -> Self {
        let key = key.into();
        let content_type = content_type_for(Path::new(&key));
        Self {
            key,
            body,
            content_type,
            cache_control: CACHE_CONTROL_NO_STORE.to_string(),
        }
    }
}

/// What a successful publish wrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub keys: Vec<String>,
    pub bytes: u64,
}

impl PublishReport {
    pub fn published(&self) -> usize {
        self.keys.len()
    }
}

/// Reads the top-level files of `output_dir`, sorted by name
pub fn collect_artifacts(output_dir: &Path) -> Result<Vec<PublishedArtifact>, PublishError> {
    let read_error = |path: &Path, source: io::Error| PublishError::ReadOutput {
        path: path.to_path_buf(),
        source,
    };

    let mut artifacts = Vec::new();
    for entry in std::fs::read_dir(output_dir).map_err(|e| read_error(output_dir, e))? {
        let entry = entry.map_err(|e| read_error(output_dir, e))?;
        let path = entry.path();

        // Follows symlinks, so a link to a directory is skipped too
        let metadata = std::fs::metadata(&path).map_err(|e| read_error(&path, e))?;
        if metadata.is_dir() {
            debug!(path = %path.display(), "Skipping directory in build output");
            continue;
        }

        let Some(key) = entry.file_name().to_str().map(str::to_string) else {
            return Err(read_error(
                &path,
                io::Error::new(io::ErrorKind::InvalidData, "file name is not valid UTF-8"),
            ));
        };

        let body = std::fs::read(&path).map_err(|e| read_error(&path, e))?;
        artifacts.push(PublishedArtifact::new(key, Bytes::from(body)));
    }

    artifacts.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(artifacts)
}

pub struct ArtifactPublisher {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    max_concurrent_uploads: usize,
}

impl ArtifactPublisher {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            max_concurrent_uploads: DEFAULT_MAX_CONCURRENT_UPLOADS,
        }
    }

    pub fn with_max_concurrent_uploads(mut self, max: usize) -> Self {
        self.max_concurrent_uploads = max.max(1);
        self
    }

    /// Uploads every top-level file of `output_dir`.
    ///
    /// All uploads are allowed to settle before a failure is reported, so
    /// objects that did upload stay published.
    pub async fn publish(&self, output_dir: &Path) -> Result<PublishReport, PublishError> {
        let artifacts = collect_artifacts(output_dir)?;
        let total = artifacts.len();
        info!(
            bucket = %self.bucket,
            files = total,
            "Uploading build output"
        );

        let results: Vec<(PublishedArtifact, Result<(), StoreError>)> = stream::iter(artifacts)
            .map(|artifact| async move {
                let result = self.store.put_object(&self.bucket, &artifact).await;
                (artifact, result)
            })
            .buffer_unordered(self.max_concurrent_uploads)
            .collect()
            .await;

        let mut report = PublishReport::default();
        let mut failures = Vec::new();
        for (artifact, result) in results {
            match result {
                Ok(()) => {
                    info!(
                        key = %artifact.key,
                        content_type = artifact.content_type,
                        bytes = artifact.body.len(),
                        "Uploaded"
                    );
                    report.bytes += artifact.body.len() as u64;
                    report.keys.push(artifact.key);
                }
                Err(e) => {
                    error!(key = %artifact.key, error = %e, "Upload failed");
                    failures.push(e);
                }
            }
        }
        report.keys.sort();

        let failed = failures.len();
        if let Some(first) = failures.into_iter().next() {
            return Err(PublishError::UploadFailed {
                failed,
                succeeded: report.published(),
                total,
                first,
            });
        }

        Ok(report)
    }
}
