//! Subprocess invocation
//!
//! Dependency install, compilation and shell extraction all call out to
//! external programs through [`ProcessRunner`], so tests can replay exit
//! codes and output without a real toolchain.

pub mod mock;
pub mod runner;

pub use mock::{ScriptedProcessRunner, ScriptedResponse};
pub use runner::TokioProcessRunner;

use async_trait::async_trait;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// A program, its arguments and extra environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Splits a command line on whitespace. Returns `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program).args(parts))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// The stream worth showing an operator: stderr, or stdout when stderr is empty
    pub fn diagnostics(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        }
    }
}

/// One recorded call, as seen by a runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: CommandSpec,
    pub working_dir: PathBuf,
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Runs `command` in `working_dir` to completion.
    ///
    /// Failing to start the program is an `Err`; a non-zero exit is an
    /// `Ok` carrying the exit code.
    async fn invoke(&self, command: &CommandSpec, working_dir: &Path) -> io::Result<ProcessOutput>;
}
