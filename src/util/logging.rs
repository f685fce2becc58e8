//! Structured logging setup for site-pipeline
//!
//! Stage boundaries, subprocess output and upload results all go through
//! `tracing`. Under a function runtime the output is usually JSON so the
//! platform's log service can index the fields; locally it is plain text.
//!
//! # Example
//!
//! ```no_run
//! use site_pipeline::util::logging::{config_from_env, init_logging, LoggingConfig};
//!
//! init_logging(config_from_env(LoggingConfig::function_runtime()));
//!
//! tracing::info!(stage = "build", "Stage started");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ensures logging is only initialized once
static INIT: Once = Once::new();

/// Targets that are chatty at info level and capped at warn
const NOISY_TARGETS: &[&str] = &[
    "aws_config",
    "aws_smithy_runtime",
    "aws_smithy_runtime_api",
    "hyper",
    "hyper_util",
    "h2",
    "rustls",
];

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum log level to display
    pub level: Level,

    /// Use JSON output format
    pub use_json: bool,

    /// Include the module target (e.g., site_pipeline::publish) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,

    /// Emit ANSI colors; off under a function runtime
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    /// JSON lines without colors, for the function runtime's log stream
    pub fn function_runtime() -> Self {
        Self {
            level: Level::INFO,
            use_json: true,
            include_target: true,
            include_location: false,
            ansi: false,
        }
    }
}

/// Parses a log level from a string, falling back to INFO
///
/// ```
/// use site_pipeline::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("debug"), Level::DEBUG);
/// assert_eq!(parse_level("INFO"), Level::INFO);
/// assert_eq!(parse_level("invalid"), Level::INFO);
/// ```
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

/// Directives used when `RUST_LOG` is unset
fn default_directives(level: Level, rust_log_set: bool) -> Vec<Directive> {
    if rust_log_set {
        return Vec::new();
    }

    std::iter::once(format!("site_pipeline={}", level))
        .chain(NOISY_TARGETS.iter().map(|target| format!("{}=warn", target)))
        .filter_map(|directive| directive.parse().ok())
        .collect()
}

/// Initializes the global subscriber
///
/// Output goes to stderr so `invoke` can keep stdout for the response.
/// Only the first call has any effect; later calls are ignored.
///
/// # Arguments
///
/// * `config` - Level, format and decoration of the emitted lines
///
/// # Example
///
/// ```no_run
/// use site_pipeline::util::logging::{init_logging, LoggingConfig};
///
/// init_logging(LoggingConfig::function_runtime());
/// tracing::info!(stage = "download", "Stage started");
/// ```
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let rust_log_set = env::var("RUST_LOG").is_ok();
        let filter = default_directives(config.level, rust_log_set)
            .into_iter()
            .fold(EnvFilter::from_default_env(), |filter, directive| {
                filter.add_directive(directive)
            });

        let layer = fmt::layer()
            .with_target(config.include_target)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_ansi(config.ansi)
            .with_writer(std::io::stderr);

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(layer.json())
                .init();
        } else {
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    });
}

/// Applies the logging environment variables on top of `base`
///
/// # Arguments
///
/// * `base` - Defaults for the current entry point, e.g.
///   [`LoggingConfig::function_runtime`] under `serve`
///
/// # Environment Variables
///
/// - `SITE_PIPELINE_LOG_LEVEL` - trace, debug, info, warn, error
/// - `SITE_PIPELINE_LOG_JSON` - JSON output (true/false)
/// - `RUST_LOG` - standard filtering; replaces the default directives when set
///
/// Unparseable values keep the value from `base`.
///
/// # Example
///
/// ```no_run
/// use site_pipeline::util::logging::{config_from_env, LoggingConfig};
///
/// let config = config_from_env(LoggingConfig::default());
/// println!("logging at {}", config.level);
/// ```
pub fn config_from_env(base: LoggingConfig) -> LoggingConfig {
    let level = env::var("SITE_PIPELINE_LOG_LEVEL")
        .map(|v| parse_level(&v))
        .unwrap_or(base.level);

    let use_json = env::var("SITE_PIPELINE_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(base.use_json);

    LoggingConfig {
        level,
        use_json,
        ..base
    }
}
