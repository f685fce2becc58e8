//! Utility modules for site-pipeline
//!
//! - Structured logging setup and configuration

pub mod logging;

pub use logging::{config_from_env, init_logging, LoggingConfig};
