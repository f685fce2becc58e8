//! site-pipeline - build-and-publish pipeline for tenant static sites
//!
//! An upload of a source archive to the archive store triggers one run of
//! the pipeline. The archive is downloaded and unpacked into a scratch area,
//! the deployment's site configuration is written into the tree, the site is
//! compiled by an external toolchain, and the top-level build artifacts are
//! published to the serving bucket.
//!
//! # Core Concepts
//!
//! - **Trigger**: the object-created notification, one [`BuildInvocation`]
//!   per record
//! - **Process Runner**: the only seam to external programs, scripted in
//!   tests
//! - **Object Store**: the only seam to storage, backed by S3, a local
//!   directory or memory
//! - **Scratch Area**: a fresh directory per invocation, removed on every
//!   exit path
//!
//! # Example Usage
//!
//! ```no_run
//! use site_pipeline::{PipelineConfig, S3ObjectStore, TokioProcessRunner, TriggerEvent};
//! use std::sync::Arc;
//!
//! # async fn run(event: TriggerEvent) -> anyhow::Result<()> {
//! let config = PipelineConfig::from_env()?;
//! let store = Arc::new(S3ObjectStore::from_env(config.s3_endpoint_url.as_deref()).await);
//! let controller = config.create_controller(store, Arc::new(TokioProcessRunner::new()));
//!
//! let response = controller.handle_event(&event).await?;
//! println!("{}", serde_json::to_string(&response)?);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`trigger`]: notification model and key decoding
//! - [`extract`]: in-process and shell archive extraction
//! - [`site_config`]: configuration rendering and injection
//! - [`build`]: install and compile steps
//! - [`publish`]: artifact collection, content types and object stores
//! - [`pipeline`]: the controller tying the stages together

pub mod build;
pub mod cli;
pub mod config;
pub mod extract;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod publish;
pub mod site_config;
pub mod trigger;
pub mod util;

pub use build::{BuildCommands, BuildError, BuildExecutor};
pub use config::{ConfigError, PipelineConfig};
pub use extract::{ExtractError, Extractor, ExtractorStrategy};
pub use pipeline::{PipelineController, PipelineError, PipelineResponse, PipelineResult, Stage};
pub use process::{CommandSpec, ProcessOutput, ProcessRunner, TokioProcessRunner};
pub use publish::{
    ArtifactPublisher, FsObjectStore, ObjectStore, PublishError, S3ObjectStore, StoreError,
};
pub use site_config::{ConfigInjector, SiteConfiguration};
pub use trigger::{BuildInvocation, TriggerError, TriggerEvent};
pub use util::{config_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
