//! Deployment-time configuration for the pipeline
//!
//! Everything is read from environment variables once, when the function
//! instance starts. The site configuration is fixed for the lifetime of a
//! deployment and is not re-read per invocation.
//!
//! # Environment Variables
//!
//! ## Targets
//! - `BUCKET_NAME`: serving bucket the built site is published to - **required**
//! - `SITE_PIPELINE_S3_ENDPOINT`: endpoint override for S3-compatible emulators
//!
//! ## Site configuration
//! - `SITE_CONFIG`: the whole configuration as a JSON object, taking precedence over:
//! - `SITE_PRODUCTION`: `true`/`false` - default: `false`
//! - `SITE_CLIENT_ID`, `SITE_ISSUER`, `SITE_WELL_KNOWN_ENDPOINT_URL`: optional
//! - `SITE_API_URL`: API base URL - **required**
//!
//! ## Pipeline
//! - `SITE_PIPELINE_EXTRACTOR`: `in-process` | `shell` - default: `in-process`
//! - `SITE_PIPELINE_INSTALL_COMMAND`: default `npm install --force`, empty to skip
//! - `SITE_PIPELINE_BUILD_COMMAND`: default `npm run build`
//! - `SITE_PIPELINE_OUTPUT_DIR`: default `dist`
//! - `SITE_PIPELINE_SCRATCH_DIR`: default system temp dir
//! - `SITE_PIPELINE_MAX_UPLOADS`: concurrent uploads - default: `8`
//!
//! # Example
//!
//! ```no_run
//! use site_pipeline::PipelineConfig;
//!
//! let config = PipelineConfig::from_env().expect("invalid configuration");
//! println!("{}", config);
//! ```

use crate::build::{
    BuildCommands, BuildExecutor, DEFAULT_BUILD_COMMAND, DEFAULT_INSTALL_COMMAND,
    DEFAULT_OUTPUT_DIR,
};
use crate::extract::{build_extractor, ExtractorStrategy};
use crate::pipeline::PipelineController;
use crate::process::{CommandSpec, ProcessRunner};
use crate::progress::LoggingHandler;
use crate::publish::{ArtifactPublisher, ObjectStore, DEFAULT_MAX_CONCURRENT_UPLOADS};
use crate::site_config::{ConfigInjector, SiteConfiguration};
use std::env;
use std::fmt;
use std::path::{Component, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: &'static str, error: String },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub destination_bucket: String,
    pub site: SiteConfiguration,
    pub extractor: ExtractorStrategy,
    pub build: BuildCommands,
    pub scratch_root: PathBuf,
    pub max_concurrent_uploads: usize,
    pub s3_endpoint_url: Option<String>,
}

impl PipelineConfig {
    /// Loads and validates configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` when `BUCKET_NAME` or the API URL is
    /// absent, `ConfigError::ParseError` for malformed values and
    /// `ConfigError::ValidationFailed` when [`validate`](Self::validate) fails
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup
    ///
    /// Empty values are treated as unset, except for
    /// `SITE_PIPELINE_INSTALL_COMMAND` where an empty value skips the step.
    ///
    /// # Arguments
    ///
    /// * `lookup` - Returns the raw value for a variable name, if any
    ///
    /// # Example
    ///
    /// ```
    /// use site_pipeline::PipelineConfig;
    /// use std::collections::HashMap;
    ///
    /// let vars = HashMap::from([
    ///     ("BUCKET_NAME", "site-bucket".to_string()),
    ///     ("SITE_API_URL", "https://api.example.com".to_string()),
    /// ]);
    /// let config = PipelineConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();
    /// assert_eq!(config.destination_bucket, "site-bucket");
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let destination_bucket = non_empty("BUCKET_NAME").ok_or(ConfigError::Missing("BUCKET_NAME"))?;

        let site = site_configuration_from_lookup(&lookup)?;

        let extractor = match non_empty("SITE_PIPELINE_EXTRACTOR") {
            Some(v) => v.parse().map_err(|error| ConfigError::ParseError {
                field: "SITE_PIPELINE_EXTRACTOR",
                error,
            })?,
            None => ExtractorStrategy::default(),
        };

        // An explicitly empty install command disables the install step
        let install = match lookup("SITE_PIPELINE_INSTALL_COMMAND") {
            Some(line) => CommandSpec::parse(&line),
            None => CommandSpec::parse(DEFAULT_INSTALL_COMMAND),
        };
        let build_line =
            non_empty("SITE_PIPELINE_BUILD_COMMAND").unwrap_or_else(|| DEFAULT_BUILD_COMMAND.to_string());
        let compile = CommandSpec::parse(&build_line).ok_or(ConfigError::Missing("SITE_PIPELINE_BUILD_COMMAND"))?;
        let output_dir =
            non_empty("SITE_PIPELINE_OUTPUT_DIR").unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string());

        let scratch_root = non_empty("SITE_PIPELINE_SCRATCH_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);

        let max_concurrent_uploads = match non_empty("SITE_PIPELINE_MAX_UPLOADS") {
            Some(v) => v.trim().parse::<usize>().map_err(|e| ConfigError::ParseError {
                field: "SITE_PIPELINE_MAX_UPLOADS",
                error: e.to_string(),
            })?,
            None => DEFAULT_MAX_CONCURRENT_UPLOADS,
        };

        let config = Self {
            destination_bucket,
            site,
            extractor,
            build: BuildCommands::new(install, compile).with_output_dir(output_dir),
            scratch_root,
            max_concurrent_uploads,
            s3_endpoint_url: non_empty("SITE_PIPELINE_S3_ENDPOINT"),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that:
    /// - at least one upload may run at a time
    /// - the output directory stays inside the working tree
    /// - the API URL is present
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` naming the first check that fails
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_uploads == 0 {
            return Err(ConfigError::ValidationFailed(
                "SITE_PIPELINE_MAX_UPLOADS must be at least 1".to_string(),
            ));
        }

        let escapes = self.build.output_dir.as_os_str().is_empty()
            || self
                .build
                .output_dir
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(ConfigError::ValidationFailed(format!(
                "Output directory must be relative to the working tree: {}",
                self.build.output_dir.display()
            )));
        }

        if self.site.api_url.trim().is_empty() {
            return Err(ConfigError::Missing("SITE_API_URL"));
        }

        Ok(())
    }

    /// Wires a controller from this configuration
    ///
    /// # Arguments
    ///
    /// * `store` - Serves the source archive and receives the published files
    /// * `runner` - Runs the build toolchain, and the extraction binaries
    ///   under the shell strategy
    ///
    /// # Returns
    ///
    /// A controller that reports stage boundaries through the log
    pub fn create_controller(
        &self,
        store: Arc<dyn ObjectStore>,
        runner: Arc<dyn ProcessRunner>,
    ) -> PipelineController {
        let extractor = build_extractor(self.extractor, runner.clone());
        let publisher = ArtifactPublisher::new(store.clone(), self.destination_bucket.clone())
            .with_max_concurrent_uploads(self.max_concurrent_uploads);

        PipelineController::new(
            store,
            extractor,
            ConfigInjector::new(self.site.clone()),
            BuildExecutor::new(runner, self.build.clone()),
            publisher,
            self.scratch_root.clone(),
        )
        .with_progress_handler(Arc::new(LoggingHandler))
    }
}

/// Reads the site configuration alone, without the deployment targets
///
/// Used by `render-config`, which has no bucket to publish to.
///
/// # Errors
///
/// Returns `ConfigError::Missing("SITE_API_URL")` when no API URL is set
pub fn site_configuration_from_env() -> Result<SiteConfiguration, ConfigError> {
    site_configuration_from_lookup(&|key: &str| env::var(key).ok())
}

/// Builds the site configuration through an arbitrary key lookup
///
/// `SITE_CONFIG` as a JSON object wins over the individual `SITE_*` fields.
///
/// # Arguments
///
/// * `lookup` - Returns the raw value for a variable name, if any
///
/// # Example
///
/// ```
/// use site_pipeline::config::site_configuration_from_lookup;
///
/// let site = site_configuration_from_lookup(&|key: &str| match key {
///     "SITE_CONFIG" => Some(r#"{"production":true,"apiUrl":"https://api"}"#.to_string()),
///     _ => None,
/// })
/// .unwrap();
/// assert!(site.production);
/// ```
pub fn site_configuration_from_lookup<F>(lookup: &F) -> Result<SiteConfiguration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(json) = non_empty("SITE_CONFIG") {
        return serde_json::from_str(&json).map_err(|e| ConfigError::ParseError {
            field: "SITE_CONFIG",
            error: e.to_string(),
        });
    }

    let production = match non_empty("SITE_PRODUCTION") {
        Some(v) => v.trim().parse::<bool>().map_err(|e| ConfigError::ParseError {
            field: "SITE_PRODUCTION",
            error: e.to_string(),
        })?,
        None => false,
    };

    Ok(SiteConfiguration {
        production,
        client_id: non_empty("SITE_CLIENT_ID"),
        issuer: non_empty("SITE_ISSUER"),
        api_url: non_empty("SITE_API_URL").ok_or(ConfigError::Missing("SITE_API_URL"))?,
        well_known_endpoint_url: non_empty("SITE_WELL_KNOWN_ENDPOINT_URL"),
    })
}

impl fmt::Display for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pipeline Configuration:")?;
        writeln!(f, "  Destination Bucket: {}", self.destination_bucket)?;
        writeln!(f, "  Production: {}", self.site.production)?;
        writeln!(f, "  API URL: {}", self.site.api_url)?;
        writeln!(f, "  Authentication: {}", self.site.has_authentication())?;
        writeln!(f, "  Extractor: {}", self.extractor)?;
        match &self.build.install {
            Some(install) => writeln!(f, "  Install: {}", install)?,
            None => writeln!(f, "  Install: (skipped)")?,
        }
        writeln!(f, "  Build: {}", self.build.compile)?;
        writeln!(f, "  Output Dir: {}", self.build.output_dir.display())?;
        writeln!(f, "  Scratch Root: {}", self.scratch_root.display())?;
        writeln!(f, "  Max Uploads: {}", self.max_concurrent_uploads)?;
        if let Some(endpoint) = &self.s3_endpoint_url {
            writeln!(f, "  S3 Endpoint: {}", endpoint)?;
        }
        Ok(())
    }
}
