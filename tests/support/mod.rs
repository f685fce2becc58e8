//! Shared fixtures for integration tests
#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use site_pipeline::build::{BuildCommands, BuildExecutor};
use site_pipeline::extract::Extractor;
use site_pipeline::pipeline::PipelineController;
use site_pipeline::process::{CommandSpec, ProcessRunner};
use site_pipeline::publish::{ArtifactPublisher, ObjectStore};
use site_pipeline::site_config::{ConfigInjector, SiteConfiguration};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;

pub const SOURCE_BUCKET: &str = "source-code-bucket";
pub const SITE_BUCKET: &str = "admin-site-bucket";
pub const ARCHIVE_KEY: &str = "AdminSite/src.zip";

/// Zip archive holding `files`; paths ending in `/` become directory entries
pub fn zip_archive(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (path, content) in files {
        if path.ends_with('/') {
            writer.add_directory(*path, options).unwrap();
        } else {
            writer.start_file(*path, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// Gzip'd tar archive holding `files`
pub fn tar_gz_archive(files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Every regular file below `root`, keyed by its path relative to `root`
pub fn tree_snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap().to_path_buf();
            (relative, fs::read(entry.path()).unwrap())
        })
        .collect()
}

/// Whether `program` can be used by the shell-strategy tests.
///
/// A missing binary skips the test locally but fails it when `CI` is set,
/// so the equivalence suite cannot pass there without running.
pub fn require_program(program: &str) -> bool {
    if which::which(program).is_ok() {
        return true;
    }
    if env::var_os("CI").is_some() {
        panic!("{} is required on PATH when CI is set", program);
    }
    eprintln!("{} not on PATH, skipping", program);
    false
}

pub fn site_configuration() -> SiteConfiguration {
    SiteConfiguration::new("https://api.example.com")
        .with_production(true)
        .with_client_id("admin-client")
        .with_issuer("https://idp.example.com")
}

/// Build steps that run the archive's own `build.sh` with no install step
pub fn shell_script_build() -> BuildCommands {
    BuildCommands::new(None, CommandSpec::new("sh").arg("build.sh"))
}

pub fn controller(
    store: Arc<dyn ObjectStore>,
    runner: Arc<dyn ProcessRunner>,
    extractor: Arc<dyn Extractor>,
    commands: BuildCommands,
    scratch_root: &Path,
) -> PipelineController {
    PipelineController::new(
        store.clone(),
        extractor,
        ConfigInjector::new(site_configuration()),
        BuildExecutor::new(runner, commands),
        ArtifactPublisher::new(store, SITE_BUCKET),
        scratch_root,
    )
}

/// Entries left behind under a scratch root
pub fn scratch_entries(root: &Path) -> usize {
    fs::read_dir(root).map(|entries| entries.count()).unwrap_or(0)
}
