//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{error, info};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started {
                invocation_id,
                bucket,
                key,
            } => {
                info!(invocation = %invocation_id, bucket = %bucket, key = %key, "Starting build");
            }
            ProgressEvent::StageStarted { stage } => {
                info!(stage = %stage, "Stage started");
            }
            ProgressEvent::StageComplete { stage, duration } => {
                info!(
                    stage = %stage,
                    duration_ms = duration.as_millis() as u64,
                    "Stage complete"
                );
            }
            ProgressEvent::Completed {
                published,
                total_time,
            } => {
                info!(
                    published,
                    total_time_ms = total_time.as_millis() as u64,
                    "Build and deploy successful"
                );
            }
            ProgressEvent::Failed { stage, error } => {
                error!(stage = %stage, error = %error, "Build and deploy failed");
            }
        }
    }
}
