//! Dependency install and compilation of the working tree

use crate::process::{CommandSpec, ProcessRunner};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_INSTALL_COMMAND: &str = "npm install --force";
pub const DEFAULT_BUILD_COMMAND: &str = "npm run build";
pub const DEFAULT_OUTPUT_DIR: &str = "dist";

/// Which of the two subprocess steps failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    Install,
    Compile,
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStep::Install => write!(f, "install"),
            BuildStep::Compile => write!(f, "compile"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to start {step} command '{command}': {source}")]
    Spawn {
        step: BuildStep,
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("{step} command '{command}' exited with status {}: {}", display_code(.exit_code), .diagnostics)]
    CommandFailed {
        step: BuildStep,
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        diagnostics: String,
    },

    #[error("Build reported success but produced no output directory at {0}")]
    MissingOutput(PathBuf),
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

/// The commands a site is built with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommands {
    pub install: Option<CommandSpec>,
    pub compile: CommandSpec,
    /// Output directory, relative to the tree root
    pub output_dir: PathBuf,
}

impl Default for BuildCommands {
    fn default() -> Self {
        Self {
            install: CommandSpec::parse(DEFAULT_INSTALL_COMMAND),
            compile: CommandSpec::new("npm").args(["run", "build"]),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl BuildCommands {
    pub fn new(install: Option<CommandSpec>, compile: CommandSpec) -> Self {
        Self {
            install,
            compile,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }
}

pub struct BuildExecutor {
    runner: Arc<dyn ProcessRunner>,
    commands: BuildCommands,
}

impl BuildExecutor {
    pub fn new(runner: Arc<dyn ProcessRunner>, commands: BuildCommands) -> Self {
        Self { runner, commands }
    }

    /// Installs dependencies, compiles, and returns the output directory
    pub async fn run(&self, tree_root: &Path) -> Result<PathBuf, BuildError> {
        if let Some(install) = &self.commands.install {
            self.run_step(BuildStep::Install, install, tree_root).await?;
        } else {
            info!("No install command configured, skipping dependency install");
        }

        self.run_step(BuildStep::Compile, &self.commands.compile, tree_root)
            .await?;

        let output_dir = tree_root.join(&self.commands.output_dir);
        if !output_dir.is_dir() {
            return Err(BuildError::MissingOutput(output_dir));
        }

        Ok(output_dir)
    }

    async fn run_step(
        &self,
        step: BuildStep,
        command: &CommandSpec,
        tree_root: &Path,
    ) -> Result<(), BuildError> {
        info!(%step, command = %command, "Running build step");
        let start = Instant::now();

        let output = self
            .runner
            .invoke(command, tree_root)
            .await
            .map_err(|source| BuildError::Spawn {
                step,
                command: command.to_string(),
                source,
            })?;

        if !output.success() {
            warn!(%step, exit_code = ?output.exit_code, "Build step failed");
            return Err(BuildError::CommandFailed {
                step,
                command: command.to_string(),
                exit_code: output.exit_code,
                diagnostics: output.diagnostics().to_string(),
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }

        info!(
            %step,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Build step completed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{ScriptedProcessRunner, ScriptedResponse};
    use tempfile::TempDir;

    fn executor(runner: Arc<ScriptedProcessRunner>) -> BuildExecutor {
        BuildExecutor::new(runner, BuildCommands::default())
    }

    #[test]
    fn test_default_commands() {
        let commands = BuildCommands::default();
        assert_eq!(commands.install.unwrap().to_string(), "npm install --force");
        assert_eq!(commands.compile.to_string(), "npm run build");
        assert_eq!(commands.output_dir, PathBuf::from("dist"));
    }

    #[tokio::test]
    async fn test_install_then_compile() {
        let runner = Arc::new(ScriptedProcessRunner::with_responses([
            ScriptedResponse::success(),
            ScriptedResponse::success().writing_files(&[("dist/index.html", "<html></html>")]),
        ]));
        let tree = TempDir::new().unwrap();

        let output_dir = executor(runner.clone()).run(tree.path()).await.unwrap();

        assert_eq!(output_dir, tree.path().join("dist"));
        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].command.to_string(), "npm install --force");
        assert_eq!(calls[1].command.to_string(), "npm run build");
        assert!(calls.iter().all(|c| c.working_dir == tree.path()));
    }

    #[tokio::test]
    async fn test_install_failure_skips_compile() {
        let runner = Arc::new(ScriptedProcessRunner::with_responses([
            ScriptedResponse::failure(1, "npm ERR! ERESOLVE unable to resolve dependency tree"),
        ]));
        let tree = TempDir::new().unwrap();

        let err = executor(runner.clone()).run(tree.path()).await.unwrap_err();

        match &err {
            BuildError::CommandFailed { step, exit_code, .. } => {
                assert_eq!(*step, BuildStep::Install);
                assert_eq!(*exit_code, Some(1));
            }
            other => panic!("Expected CommandFailed, got {:?}", other),
        }
        assert!(err.to_string().contains("ERESOLVE"));
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_compile_failure_keeps_raw_stderr() {
        let stderr = "Error: src/app/app.component.ts:3:1 - error TS1005: ';' expected.\n";
        let runner = Arc::new(ScriptedProcessRunner::with_responses([
            ScriptedResponse::success(),
            ScriptedResponse::failure(1, stderr),
        ]));
        let tree = TempDir::new().unwrap();

        let err = executor(runner).run(tree.path()).await.unwrap_err();

        match err {
            BuildError::CommandFailed {
                step,
                stderr: captured,
                ..
            } => {
                assert_eq!(step, BuildStep::Compile);
                assert_eq!(captured, stderr);
            }
            other => panic!("Expected CommandFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_output_dir() {
        let runner = Arc::new(ScriptedProcessRunner::with_responses([
            ScriptedResponse::success(),
            ScriptedResponse::success(),
        ]));
        let tree = TempDir::new().unwrap();

        let err = executor(runner).run(tree.path()).await.unwrap_err();

        assert!(matches!(err, BuildError::MissingOutput(path) if path == tree.path().join("dist")));
    }

    #[tokio::test]
    async fn test_without_install_step() {
        let runner = Arc::new(ScriptedProcessRunner::with_responses([
            ScriptedResponse::success().writing_files(&[("build/app.js", "1")]),
        ]));
        let commands =
            BuildCommands::new(None, CommandSpec::parse("make site").unwrap()).with_output_dir("build");
        let tree = TempDir::new().unwrap();

        let output_dir = BuildExecutor::new(runner.clone(), commands)
            .run(tree.path())
            .await
            .unwrap();

        assert_eq!(output_dir, tree.path().join("build"));
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let runner = Arc::new(ScriptedProcessRunner::new());
        let tree = TempDir::new().unwrap();

        let err = executor(runner).run(tree.path()).await.unwrap_err();

        assert!(matches!(
            err,
            BuildError::Spawn {
                step: BuildStep::Install,
                ..
            }
        ));
    }
}
