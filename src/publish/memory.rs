use super::store::{ObjectStore, StoreError};
use super::PublishedArtifact;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory object store that records every write
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), Bytes>>,
    puts: Mutex<Vec<(String, PublishedArtifact)>>,
    failing_keys: Mutex<HashSet<String>>,
    put_attempts: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an object, as if it had been uploaded
    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Bytes>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), body.into());
    }

    /// Makes every later write to `key` fail
    pub fn fail_on(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    /// Successful writes, in completion order
    pub fn puts(&self) -> Vec<(String, PublishedArtifact)> {
        self.puts.lock().unwrap().clone()
    }

    /// Every write attempted, including failed ones
    pub fn put_attempts(&self) -> usize {
        self.put_attempts.load(Ordering::SeqCst)
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        self.object(bucket, key).ok_or_else(|| StoreError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    async fn put_object(&self, bucket: &str, artifact: &PublishedArtifact) -> Result<(), StoreError> {
        self.put_attempts.fetch_add(1, Ordering::SeqCst);

        if self.failing_keys.lock().unwrap().contains(&artifact.key) {
            return Err(StoreError::Write {
                bucket: bucket.to_string(),
                key: artifact.key.clone(),
                message: "injected failure".to_string(),
            });
        }

        self.insert(bucket, &artifact.key, artifact.body.clone());
        self.puts
            .lock()
            .unwrap()
            .push((bucket.to_string(), artifact.clone()));
        Ok(())
    }
}
