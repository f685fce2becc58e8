use super::{prepare_destination, ArchiveFormat, ExtractError, Extractor};
use crate::process::{CommandSpec, ProcessRunner};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// `unzip` exit status for "warnings, processing completed"
const UNZIP_WARNING_EXIT: i32 = 1;

/// Extracts by handing a temporary copy of the archive to `unzip` or `tar`
pub struct ShellExtractor {
    runner: Arc<dyn ProcessRunner>,
}

impl ShellExtractor {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    /// Command that unpacks `archive_path` into `destination`
    pub fn command_for(format: ArchiveFormat, archive_path: &Path, destination: &Path) -> CommandSpec {
        match format {
            ArchiveFormat::Zip => CommandSpec::new("unzip").args([
                "-q".to_string(),
                "-o".to_string(),
                archive_path.display().to_string(),
                "-d".to_string(),
                destination.display().to_string(),
            ]),
            ArchiveFormat::TarGz => CommandSpec::new("tar").args([
                "-xzf".to_string(),
                archive_path.display().to_string(),
                "-C".to_string(),
                destination.display().to_string(),
            ]),
        }
    }
}

#[async_trait]
impl Extractor for ShellExtractor {
    fn name(&self) -> &'static str {
        "shell"
    }

    async fn extract(&self, archive: Bytes, destination: &Path) -> Result<(), ExtractError> {
        let format = ArchiveFormat::detect(&archive)?;
        prepare_destination(destination)?;

        // Staged next to the destination so it stays inside the scratch area
        let working_dir = destination.parent().unwrap_or(destination);
        let mut staged = tempfile::Builder::new()
            .prefix("archive-")
            .tempfile_in(working_dir)?;
        staged.write_all(&archive)?;
        staged.flush()?;

        let command = Self::command_for(format, staged.path(), destination);
        debug!(%format, command = %command, "Unpacking with external binary");

        let output = self.runner.invoke(&command, working_dir).await?;

        match (format, output.exit_code) {
            (_, Some(0)) => Ok(()),
            (ArchiveFormat::Zip, Some(UNZIP_WARNING_EXIT)) => {
                warn!(
                    command = %command,
                    stderr = output.diagnostics(),
                    "unzip completed with warnings"
                );
                Ok(())
            }
            _ => Err(ExtractError::CommandFailed {
                command: command.to_string(),
                exit_code: output.exit_code,
                stderr: output.diagnostics().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{ScriptedProcessRunner, ScriptedResponse};
    use tempfile::TempDir;

    const ZIP_MAGIC: &[u8] = b"PK\x03\x04 not really a zip";

    #[test]
    fn test_command_for_zip() {
        let cmd = ShellExtractor::command_for(
            ArchiveFormat::Zip,
            Path::new("/tmp/a.zip"),
            Path::new("/tmp/source"),
        );
        assert_eq!(cmd.to_string(), "unzip -q -o /tmp/a.zip -d /tmp/source");
    }

    #[test]
    fn test_command_for_tar_gz() {
        let cmd = ShellExtractor::command_for(
            ArchiveFormat::TarGz,
            Path::new("/tmp/a.tgz"),
            Path::new("/tmp/source"),
        );
        assert_eq!(cmd.to_string(), "tar -xzf /tmp/a.tgz -C /tmp/source");
    }

    #[tokio::test]
    async fn test_non_zero_exit_surfaces_stderr() {
        let runner = Arc::new(ScriptedProcessRunner::with_responses([
            ScriptedResponse::failure(9, "End-of-central-directory signature not found."),
        ]));
        let extractor = ShellExtractor::new(runner.clone());
        let temp_dir = TempDir::new().unwrap();

        let result = extractor
            .extract(Bytes::from_static(ZIP_MAGIC), &temp_dir.path().join("source"))
            .await;

        match result {
            Err(ExtractError::CommandFailed {
                command,
                exit_code,
                stderr,
            }) => {
                assert!(command.starts_with("unzip -q -o "));
                assert_eq!(exit_code, Some(9));
                assert!(stderr.contains("End-of-central-directory"));
            }
            other => panic!("Expected CommandFailed, got {:?}", other),
        }
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unzip_warning_exit_is_success() {
        let runner = Arc::new(ScriptedProcessRunner::with_responses([
            ScriptedResponse::failure(1, "warning [archive.zip]:  zipfile is empty"),
        ]));
        let extractor = ShellExtractor::new(runner.clone());
        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("source");

        let result = extractor
            .extract(Bytes::from_static(ZIP_MAGIC), &destination)
            .await;

        assert!(result.is_ok(), "{:?}", result);
        assert!(destination.is_dir());
    }

    #[tokio::test]
    async fn test_tar_exit_one_is_failure() {
        let runner = Arc::new(ScriptedProcessRunner::with_responses([
            ScriptedResponse::failure(1, "tar: Unexpected EOF in archive"),
        ]));
        let extractor = ShellExtractor::new(runner);
        let temp_dir = TempDir::new().unwrap();

        let result = extractor
            .extract(
                Bytes::from_static(b"\x1f\x8b not really gzip"),
                &temp_dir.path().join("source"),
            )
            .await;

        assert!(matches!(
            result,
            Err(ExtractError::CommandFailed {
                exit_code: Some(1),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_archive_is_staged_beside_destination() {
        let runner = Arc::new(ScriptedProcessRunner::with_responses([
            ScriptedResponse::success(),
        ]));
        let extractor = ShellExtractor::new(runner.clone());
        let temp_dir = TempDir::new().unwrap();
        let scratch = temp_dir.path().join("invocation-1");

        extractor
            .extract(Bytes::from_static(ZIP_MAGIC), &scratch.join("source"))
            .await
            .unwrap();

        let calls = runner.calls();
        let staged = std::path::PathBuf::from(&calls[0].command.args[2]);
        assert_eq!(staged.parent(), Some(scratch.as_path()));
        assert_eq!(calls[0].working_dir, scratch);
        assert!(!staged.exists());
    }

    #[tokio::test]
    async fn test_empty_archive_never_runs_command() {
        let runner = Arc::new(ScriptedProcessRunner::new());
        let extractor = ShellExtractor::new(runner.clone());
        let temp_dir = TempDir::new().unwrap();

        let result = extractor
            .extract(Bytes::new(), &temp_dir.path().join("source"))
            .await;

        assert!(matches!(result, Err(ExtractError::EmptyArchive)));
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_existing_destination_never_runs_command() {
        let runner = Arc::new(ScriptedProcessRunner::new());
        let extractor = ShellExtractor::new(runner.clone());
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("source");
        std::fs::create_dir(&dest).unwrap();

        let result = extractor.extract(Bytes::from_static(ZIP_MAGIC), &dest).await;

        assert!(matches!(result, Err(ExtractError::DestinationExists(_))));
        assert_eq!(runner.call_count(), 0);
    }
}
