//! Progress handler trait and events

use crate::pipeline::Stage;
use std::time::Duration;

/// Events emitted while an invocation runs
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Invocation accepted
    Started {
        invocation_id: String,
        bucket: String,
        key: String,
    },

    StageStarted { stage: Stage },

    StageComplete { stage: Stage, duration: Duration },

    /// Every stage succeeded
    Completed {
        published: usize,
        total_time: Duration,
    },

    /// A stage failed and the rest were abandoned
    Failed { stage: Stage, error: String },
}

/// Trait for handling progress events during a run
pub trait ProgressHandler: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
