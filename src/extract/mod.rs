//! Archive extraction into a fresh working tree
//!
//! Two interchangeable strategies unpack the same archive into the same
//! tree: [`InProcessExtractor`] decompresses inside the process, while
//! [`ShellExtractor`] hands a temporary copy of the archive to `unzip` or
//! `tar`. The destination directory must not exist beforehand.

pub mod in_process;
pub mod shell;

pub use in_process::InProcessExtractor;
pub use shell::ShellExtractor;

use crate::process::ProcessRunner;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Archive is empty (0 bytes)")]
    EmptyArchive,

    #[error("Unrecognized archive format (leading bytes: {leading})")]
    UnsupportedFormat { leading: String },

    #[error("Destination already exists: {0}")]
    DestinationExists(PathBuf),

    #[error("Corrupt {format} archive: {message}")]
    Corrupt {
        format: ArchiveFormat,
        message: String,
    },

    #[error("'{command}' exited with status {exit_code:?}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("I/O error during extraction: {0}")]
    Io(#[from] io::Error),
}

/// Container formats the extractors understand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    /// Sniffs the format from the leading magic bytes
    pub fn detect(data: &[u8]) -> Result<Self, ExtractError> {
        if data.is_empty() {
            return Err(ExtractError::EmptyArchive);
        }

        if data.starts_with(b"PK\x03\x04") || data.starts_with(b"PK\x05\x06") {
            return Ok(Self::Zip);
        }
        if data.starts_with(&[0x1f, 0x8b]) {
            return Ok(Self::TarGz);
        }

        Err(ExtractError::UnsupportedFormat {
            leading: hex::encode(&data[..data.len().min(4)]),
        })
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveFormat::Zip => write!(f, "zip"),
            ArchiveFormat::TarGz => write!(f, "tar.gz"),
        }
    }
}

#[async_trait]
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Unpacks `archive` into `destination`, which this call creates
    async fn extract(&self, archive: Bytes, destination: &Path) -> Result<(), ExtractError>;
}

/// Creates the destination, refusing to merge into an existing directory
pub(crate) fn prepare_destination(destination: &Path) -> Result<(), ExtractError> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    match fs::create_dir(destination) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Err(ExtractError::DestinationExists(destination.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Which extractor a deployment uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractorStrategy {
    #[default]
    InProcess,
    Shell,
}

impl FromStr for ExtractorStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in-process" | "inprocess" | "library" => Ok(Self::InProcess),
            "shell" | "binary" => Ok(Self::Shell),
            other => Err(format!(
                "unknown extractor '{}', expected 'in-process' or 'shell'",
                other
            )),
        }
    }
}

impl fmt::Display for ExtractorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractorStrategy::InProcess => write!(f, "in-process"),
            ExtractorStrategy::Shell => write!(f, "shell"),
        }
    }
}

pub fn build_extractor(
    strategy: ExtractorStrategy,
    runner: Arc<dyn ProcessRunner>,
) -> Arc<dyn Extractor> {
    match strategy {
        ExtractorStrategy::InProcess => Arc::new(InProcessExtractor::new()),
        ExtractorStrategy::Shell => Arc::new(ShellExtractor::new(runner)),
    }
}
