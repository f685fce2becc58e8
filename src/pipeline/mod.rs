//! The build-and-publish pipeline
//!
//! One invocation runs download → extract → configure → build → publish
//! strictly in order inside its own scratch area. The first failing stage
//! aborts the run; nothing is retried here.

pub mod orchestrator;
pub mod result;
pub mod scratch;

pub use orchestrator::PipelineController;
pub use result::{PipelineError, PipelineResponse, PipelineResult, ResponseBody, Stage};
pub use scratch::{ScratchArea, WorkingTree};
