use super::{CommandSpec, ProcessOutput, ProcessRunner};
use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Runs commands as real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn invoke(&self, command: &CommandSpec, working_dir: &Path) -> io::Result<ProcessOutput> {
        info!(command = %command, cwd = %working_dir.display(), "Running command");
        let start = Instant::now();

        let output = Command::new(&command.program)
            .args(&command.args)
            .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                io::Error::new(
                    e.kind(),
                    format!("failed to start '{}': {}", command.program, e),
                )
            })?;

        let result = ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        for line in result.stdout.lines() {
            debug!(target: "site_pipeline::process::stdout", "{}", line);
        }
        if result.success() {
            for line in result.stderr.lines() {
                debug!(target: "site_pipeline::process::stderr", "{}", line);
            }
        } else {
            for line in result.stderr.lines() {
                warn!(target: "site_pipeline::process::stderr", "{}", line);
            }
        }

        debug!(
            command = %command,
            exit_code = ?result.exit_code,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Command finished"
        );
        Ok(result)
    }
}
