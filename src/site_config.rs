//! Build-time site configuration and its injection into the source tree
//!
//! The compiled site embeds whatever sits in the environment files at build
//! time, so injection has to happen before the build executor runs.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory holding the environment files, relative to the tree root
pub const ENVIRONMENTS_DIR: &str = "src/environments";

/// Production configuration slot
pub const PRODUCTION_FILE: &str = "environment.prod.ts";

/// Development configuration slot
pub const DEVELOPMENT_FILE: &str = "environment.ts";

/// Exported binding the site reads its configuration from
pub const EXPORT_PREFIX: &str = "export const environment = ";

/// Values baked into the compiled site
///
/// Field order is the serialization order, which keeps the rendered file
/// byte-stable across invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfiguration {
    #[serde(default)]
    pub production: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub well_known_endpoint_url: Option<String>,
}

impl SiteConfiguration {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            production: false,
            client_id: None,
            issuer: None,
            api_url: api_url.into(),
            well_known_endpoint_url: None,
        }
    }

    pub fn with_production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_well_known_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.well_known_endpoint_url = Some(url.into());
        self
    }

    /// True when the site talks to an identity provider
    pub fn has_authentication(&self) -> bool {
        self.client_id.is_some() || self.issuer.is_some()
    }

    /// Source text of the generated environment file
    pub fn render(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}{}", EXPORT_PREFIX, json))
    }
}

/// Writes the rendered configuration into both environment slots
#[derive(Debug, Clone)]
pub struct ConfigInjector {
    config: SiteConfiguration,
}

impl ConfigInjector {
    pub fn new(config: SiteConfiguration) -> Self {
        Self { config }
    }

    /// Paths the injector writes for a given tree root
    pub fn target_paths(tree_root: &Path) -> [PathBuf; 2] {
        let dir = tree_root.join(ENVIRONMENTS_DIR);
        [dir.join(PRODUCTION_FILE), dir.join(DEVELOPMENT_FILE)]
    }

    pub fn inject(&self, tree_root: &Path) -> io::Result<Vec<PathBuf>> {
        let content = self
            .config
            .render()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let dir = tree_root.join(ENVIRONMENTS_DIR);
        fs::create_dir_all(&dir)?;

        let mut written = Vec::with_capacity(2);
        for path in Self::target_paths(tree_root) {
            fs::write(&path, content.as_bytes())?;
            debug!(path = %path.display(), bytes = content.len(), "Wrote environment file");
            written.push(path);
        }

        info!(
            production = self.config.production,
            authenticated = self.config.has_authentication(),
            "Environment configuration written"
        );
        Ok(written)
    }
}
