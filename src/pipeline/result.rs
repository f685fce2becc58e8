use crate::build::BuildError;
use crate::extract::ExtractError;
use crate::publish::{PublishError, PublishReport, StoreError};
use crate::trigger::TriggerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use thiserror::Error;

pub const SUCCESS_MESSAGE: &str = "Build and deploy successful";

/// Pipeline stages, in execution order after `Prepare`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Event decoding and scratch allocation
    Prepare,
    Download,
    Extract,
    Configure,
    Build,
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Prepare => "prepare",
            Stage::Download => "download",
            Stage::Extract => "extract",
            Stage::Configure => "configure",
            Stage::Build => "build",
            Stage::Publish => "publish",
        };
        write!(f, "{}", name)
    }
}

/// Terminal failure of an invocation; wraps the stage's own error untouched
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("prepare stage failed: invalid trigger event: {0}")]
    Trigger(#[from] TriggerError),

    #[error("prepare stage failed: scratch area unavailable: {0}")]
    Scratch(#[source] io::Error),

    #[error("download stage failed: {0}")]
    Download(#[from] StoreError),

    #[error("extract stage failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("configure stage failed: {0}")]
    Configure(#[source] io::Error),

    #[error("build stage failed: {0}")]
    Build(#[from] BuildError),

    #[error("publish stage failed: {0}")]
    Publish(#[from] PublishError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Trigger(_) | PipelineError::Scratch(_) => Stage::Prepare,
            PipelineError::Download(_) => Stage::Download,
            PipelineError::Extract(_) => Stage::Extract,
            PipelineError::Configure(_) => Stage::Configure,
            PipelineError::Build(_) => Stage::Build,
            PipelineError::Publish(_) => Stage::Publish,
        }
    }
}

/// Outcome of one invocation
#[derive(Debug)]
pub enum PipelineResult {
    Success(PublishReport),
    Failure(PipelineError),
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineResult::Success(_))
    }

    /// Objects published; zero for a failed run
    pub fn published(&self) -> usize {
        match self {
            PipelineResult::Success(report) => report.published(),
            PipelineResult::Failure(_) => 0,
        }
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            PipelineResult::Success(_) => None,
            PipelineResult::Failure(e) => Some(e),
        }
    }

    pub fn into_result(self) -> Result<PublishReport, PipelineError> {
        match self {
            PipelineResult::Success(report) => Ok(report),
            PipelineResult::Failure(e) => Err(e),
        }
    }
}

/// Payload handed back to the invoking platform on success
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResponse {
    pub status_code: u16,
    pub body: ResponseBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseBody {
    pub message: String,
    pub published: usize,
}

impl PipelineResponse {
    pub fn success(published: usize) -> Self {
        Self {
            status_code: 200,
            body: ResponseBody {
                message: SUCCESS_MESSAGE.to_string(),
                published,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildStep;

    #[test]
    fn test_response_serialization() {
        let json = serde_json::to_string(&PipelineResponse::success(4)).unwrap();
        assert_eq!(
            json,
            r#"{"statusCode":200,"body":{"message":"Build and deploy successful","published":4}}"#
        );
    }

    #[test]
    fn test_error_keeps_stage_and_cause() {
        let err = PipelineError::from(BuildError::CommandFailed {
            step: BuildStep::Compile,
            command: "npm run build".to_string(),
            exit_code: Some(1),
            stdout: String::new(),
            stderr: "boom\n".to_string(),
            diagnostics: "boom".to_string(),
        });

        assert_eq!(err.stage(), Stage::Build);
        assert_eq!(
            err.to_string(),
            "build stage failed: compile command 'npm run build' exited with status 1: boom"
        );
    }

    #[test]
    fn test_stage_mapping() {
        assert_eq!(
            PipelineError::from(ExtractError::EmptyArchive).stage(),
            Stage::Extract
        );
        assert_eq!(
            PipelineError::from(TriggerError::NoRecords).stage(),
            Stage::Prepare
        );
        assert_eq!(
            PipelineError::Configure(io::Error::other("disk full")).stage(),
            Stage::Configure
        );
    }

    #[test]
    fn test_result_accessors() {
        let ok = PipelineResult::Success(PublishReport {
            keys: vec!["index.html".to_string()],
            bytes: 10,
        });
        assert!(ok.is_success());
        assert_eq!(ok.published(), 1);
        assert!(ok.error().is_none());

        let failed = PipelineResult::Failure(PipelineError::from(ExtractError::EmptyArchive));
        assert!(!failed.is_success());
        assert_eq!(failed.published(), 0);
        assert!(failed.into_result().is_err());
    }
}
