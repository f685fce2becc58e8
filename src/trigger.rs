//! Object-created notifications and the invocations derived from them
//!
//! The archive store delivers an event carrying one or more records, each
//! naming a bucket and a URL-encoded object key. Every record becomes one
//! [`BuildInvocation`].

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while turning a notification into invocations
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("Event contains no records")]
    NoRecords,

    #[error("Record {index} is missing the {field}")]
    MissingField { index: usize, field: &'static str },

    #[error("Object key '{key}' is not valid percent-encoded UTF-8: {message}")]
    InvalidKey { key: String, message: String },
}

/// Notification payload as delivered by the archive store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<TriggerRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRecord {
    #[serde(default)]
    pub event_name: Option<String>,
    pub s3: StorageEntity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageEntity {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketRef {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRef {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub size: Option<u64>,
}

impl TriggerEvent {
    /// Builds a single-record event, mostly useful for local runs
    pub fn single(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            records: vec![TriggerRecord {
                event_name: Some("ObjectCreated:Put".to_string()),
                s3: StorageEntity {
                    bucket: BucketRef {
                        name: bucket.into(),
                    },
                    object: ObjectRef {
                        key: key.into(),
                        size: None,
                    },
                },
            }],
        }
    }

    /// One invocation per record, in delivery order
    pub fn invocations(&self) -> Result<Vec<BuildInvocation>, TriggerError> {
        if self.records.is_empty() {
            return Err(TriggerError::NoRecords);
        }

        self.records
            .iter()
            .enumerate()
            .map(|(index, record)| BuildInvocation::from_record(index, record))
            .collect()
    }
}

/// Decodes an object key as it appears in notifications.
///
/// Spaces arrive as `+`, everything else is percent-encoded.
pub fn decode_object_key(raw: &str) -> Result<String, TriggerError> {
    let plus_decoded = raw.replace('+', " ");
    urlencoding::decode(&plus_decoded)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| TriggerError::InvalidKey {
            key: raw.to_string(),
            message: e.to_string(),
        })
}

/// Site name carried by the first path segment of a decoded key
pub fn site_name_from_key(key: &str) -> &str {
    key.split('/').next().unwrap_or(key)
}

/// One trigger of the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInvocation {
    pub invocation_id: Uuid,
    pub bucket: String,
    pub key: String,
    pub site_name: String,
}

impl BuildInvocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        let key = key.into();
        let site_name = site_name_from_key(&key).to_string();
        Self {
            invocation_id: Uuid::new_v4(),
            bucket: bucket.into(),
            key,
            site_name,
        }
    }

    fn from_record(index: usize, record: &TriggerRecord) -> Result<Self, TriggerError> {
        let bucket = record.s3.bucket.name.trim();
        if bucket.is_empty() {
            return Err(TriggerError::MissingField {
                index,
                field: "bucket name",
            });
        }

        let key = decode_object_key(&record.s3.object.key)?;
        if key.is_empty() {
            return Err(TriggerError::MissingField {
                index,
                field: "object key",
            });
        }

        Ok(Self::new(bucket, key))
    }
}
