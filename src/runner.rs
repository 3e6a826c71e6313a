//! Subprocess execution scoped to one repository directory.
//!
//! Every invocation carries its working directory explicitly; the process-wide
//! current directory is never changed.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::runtime::Runtime;

use crate::error::{Error, Result};

/// A program plus arguments, without a working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn git<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new("git", args)
    }

    /// Run `script` through `sh -c`.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh", ["-c".to_string(), script.into()])
    }

    /// `program` followed by `args`, for matching and display.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.argv().join(" "))
    }
}

/// Exit status and combined stdout + stderr of a finished subprocess.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub output: String,
}

impl CommandOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }

    /// Non-blank output lines, trimmed.
    pub fn lines(&self) -> Vec<String> {
        self.output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn is_blank(&self) -> bool {
        self.output.trim().is_empty()
    }
}

/// Runs external commands inside a given repository directory.
///
/// A non-zero exit is reported through [`CommandOutput::success`], not as an
/// error. `Err` is reserved for commands that could not run to completion.
pub trait CommandRunner {
    fn run(&self, dir: &Path, invocation: &Invocation) -> Result<CommandOutput>;
}

/// Runs commands as real child processes, one at a time.
pub struct SystemRunner {
    runtime: Runtime,
    timeout: Option<Duration>,
}

impl SystemRunner {
    /// Create a runner. With `timeout` set, a command still running after
    /// that long is killed and reported as [`Error::TimedOut`].
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self { runtime, timeout })
    }

    async fn run_async(&self, dir: &Path, invocation: &Invocation) -> Result<CommandOutput> {
        let child = tokio::process::Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::Spawn {
                program: invocation.program.clone(),
                dir: dir.to_path_buf(),
                source,
            })?;

        let output = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, child.wait_with_output())
                .await
                .map_err(|_| Error::TimedOut {
                    program: invocation.to_string(),
                    dir: dir.to_path_buf(),
                    timeout,
                })??,
            None => child.wait_with_output().await?,
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            success: output.status.success(),
            output: combined,
        })
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, dir: &Path, invocation: &Invocation) -> Result<CommandOutput> {
        tracing::debug!(dir = %dir.display(), command = %invocation, "running");
        let result = self.runtime.block_on(self.run_async(dir, invocation));
        match &result {
            Ok(out) if !out.success => {
                tracing::debug!(dir = %dir.display(), command = %invocation, "command exited non-zero")
            }
            Err(e @ Error::TimedOut { .. }) => tracing::warn!(error = %e, "command timed out"),
            _ => {}
        }
        result
    }
}
