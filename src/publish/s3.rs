use super::store::{ObjectStore, StoreError};
use super::PublishedArtifact;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

/// Object store backed by S3 (or an S3-compatible endpoint)
#[derive(Clone, Debug)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Loads credentials and region from the environment.
    ///
    /// `endpoint_url` points the client at a local emulator and switches to
    /// path-style addressing.
    pub async fn from_env(endpoint_url: Option<&str>) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = endpoint_url {
            debug!(endpoint, "Using S3 endpoint override");
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Self::new(Client::from_conf(builder.build()))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let not_found = e
                    .as_service_error()
                    .map(|service| service.is_no_such_key())
                    .unwrap_or(false);
                if not_found {
                    StoreError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    StoreError::Read {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                        message: DisplayErrorContext(&e).to_string(),
                    }
                }
            })?;

        let body = response.body.collect().await.map_err(|e| StoreError::Read {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: e.to_string(),
        })?;

        Ok(body.into_bytes())
    }

    async fn put_object(&self, bucket: &str, artifact: &PublishedArtifact) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(&artifact.key)
            .body(ByteStream::from(artifact.body.clone()))
            .content_type(artifact.content_type)
            .cache_control(&artifact.cache_control)
            .send()
            .await
            .map_err(|e| StoreError::Write {
                bucket: bucket.to_string(),
                key: artifact.key.clone(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(())
    }
}
