use super::{CommandSpec, Invocation, ProcessOutput, ProcessRunner};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

type SideEffect = Arc<dyn Fn(&Path) -> io::Result<()> + Send + Sync>;

/// Canned result for one call to [`ScriptedProcessRunner`]
#[derive(Clone)]
pub struct ScriptedResponse {
    pub output: ProcessOutput,
    side_effect: Option<SideEffect>,
}

impl fmt::Debug for ScriptedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedResponse")
            .field("output", &self.output)
            .field("side_effect", &self.side_effect.is_some())
            .finish()
    }
}

impl ScriptedResponse {
    pub fn success() -> Self {
        Self::exit(0)
    }

    pub fn exit(code: i32) -> Self {
        Self {
            output: ProcessOutput {
                exit_code: Some(code),
                stdout: String::new(),
                stderr: String::new(),
            },
            side_effect: None,
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        let mut response = Self::exit(code);
        response.output.stderr = stderr.into();
        response
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.output.stdout = stdout.into();
        self
    }

    /// Runs `effect` against the working directory before answering
    pub fn with_side_effect<F>(mut self, effect: F) -> Self
    where
        F: Fn(&Path) -> io::Result<()> + Send + Sync + 'static,
    {
        self.side_effect = Some(Arc::new(effect));
        self
    }

    /// Convenience for build steps: writes `files` (relative path, contents)
    /// under the working directory
    pub fn writing_files(self, files: &[(&str, &str)]) -> Self {
        let files: Vec<(String, String)> = files
            .iter()
            .map(|(path, content)| (path.to_string(), content.to_string()))
            .collect();

        self.with_side_effect(move |dir| {
            for (path, content) in &files {
                let target = dir.join(path);
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(target, content)?;
            }
            Ok(())
        })
    }
}

/// Replays queued responses and records every call
#[derive(Default)]
pub struct ScriptedProcessRunner {
    responses: Mutex<VecDeque<ScriptedResponse>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(responses: impl IntoIterator<Item = ScriptedResponse>) -> Self {
        let runner = Self::new();
        runner.add_responses(responses);
        runner
    }

    pub fn add_responses(&self, responses: impl IntoIterator<Item = ScriptedResponse>) {
        let mut queue = self.responses.lock().unwrap();
        for response in responses {
            queue.push_back(response);
        }
    }

    pub fn remaining_responses(&self) -> usize {
        self.responses.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedProcessRunner {
    async fn invoke(&self, command: &CommandSpec, working_dir: &Path) -> io::Result<ProcessOutput> {
        self.calls.lock().unwrap().push(Invocation {
            command: command.clone(),
            working_dir: working_dir.to_path_buf(),
        });

        let response = self.responses.lock().unwrap().pop_front().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::Other,
                format!("ScriptedProcessRunner: no response queued for '{}'", command),
            )
        })?;

        if let Some(effect) = &response.side_effect {
            effect(working_dir)?;
        }

        Ok(response.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_replays_in_order_and_records_calls() {
        let runner = ScriptedProcessRunner::with_responses([
            ScriptedResponse::success().with_stdout("installed"),
            ScriptedResponse::failure(1, "compile error"),
        ]);
        let dir = TempDir::new().unwrap();

        let first = runner
            .invoke(&CommandSpec::parse("npm install").unwrap(), dir.path())
            .await
            .unwrap();
        let second = runner
            .invoke(&CommandSpec::parse("npm run build").unwrap(), dir.path())
            .await
            .unwrap();

        assert!(first.success());
        assert_eq!(first.stdout, "installed");
        assert_eq!(second.exit_code, Some(1));
        assert_eq!(second.stderr, "compile error");

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].command.to_string(), "npm run build");
        assert_eq!(calls[1].working_dir, dir.path());
    }

    #[tokio::test]
    async fn test_exhausted_queue_is_an_error() {
        let runner = ScriptedProcessRunner::new();
        let dir = TempDir::new().unwrap();

        let result = runner
            .invoke(&CommandSpec::new("npm"), dir.path())
            .await;

        assert!(result.is_err());
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_side_effect_writes_files() {
        let runner = ScriptedProcessRunner::with_responses([
            ScriptedResponse::success().writing_files(&[("dist/index.html", "<html></html>")]),
        ]);
        let dir = TempDir::new().unwrap();

        runner
            .invoke(&CommandSpec::new("build"), dir.path())
            .await
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("dist/index.html")).unwrap();
        assert_eq!(written, "<html></html>");
        assert_eq!(runner.remaining_responses(), 0);
    }
}
