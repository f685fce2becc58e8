use super::{prepare_destination, ArchiveFormat, ExtractError, Extractor};
use async_trait::async_trait;
use bytes::Bytes;
use flate2::read::GzDecoder;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Decompresses archives without leaving the process
#[derive(Debug, Default, Clone, Copy)]
pub struct InProcessExtractor;

impl InProcessExtractor {
    pub fn new() -> Self {
        Self
    }

    fn unpack(archive: &Bytes, destination: &Path) -> Result<(), ExtractError> {
        let format = ArchiveFormat::detect(archive)?;
        prepare_destination(destination)?;
        debug!(%format, dest = %destination.display(), "Unpacking in process");

        match format {
            ArchiveFormat::Zip => {
                let mut zip = zip::ZipArchive::new(Cursor::new(archive.clone())).map_err(|e| {
                    ExtractError::Corrupt {
                        format,
                        message: e.to_string(),
                    }
                })?;
                zip.extract(destination).map_err(|e| ExtractError::Corrupt {
                    format,
                    message: e.to_string(),
                })
            }
            ArchiveFormat::TarGz => {
                let mut tar = tar::Archive::new(GzDecoder::new(&archive[..]));
                tar.unpack(destination).map_err(|e| ExtractError::Corrupt {
                    format,
                    message: e.to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl Extractor for InProcessExtractor {
    fn name(&self) -> &'static str {
        "in-process"
    }

    async fn extract(&self, archive: Bytes, destination: &Path) -> Result<(), ExtractError> {
        let destination: PathBuf = destination.to_path_buf();
        tokio::task::spawn_blocking(move || Self::unpack(&archive, &destination))
            .await
            .map_err(|e| ExtractError::Io(io::Error::other(e)))?
    }
}
