//! External process execution with captured stdio.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::GitError;
use crate::quote::render_command_line;

/// Result of one finished process. Produced once per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    /// Exit code, or `-1` when the process was terminated by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs a program to completion and hands back its exit code and output.
///
/// Everything that talks to `git`, `launchctl`, `net` or `which` goes
/// through this trait so the process boundary can be replaced in tests.
pub trait CommandRunner: Send + Sync {
    /// Spawn `program` with `args` as discrete argv entries, wait for it to
    /// exit, and return the captured streams.
    fn run(&self, program: &Path, args: &[String]) -> Result<ProcessOutput, GitError>;
}

/// [`CommandRunner`] backed by [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[String]) -> Result<ProcessOutput, GitError> {
        tracing::debug!(command = %render_command_line(program, args), "running process");

        // `output()` drains stdout and stderr while waiting, so a chatty child
        // cannot fill a pipe and deadlock us.
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| GitError::Spawn {
                program: program.to_path_buf(),
                source,
            })?;

        let result = ProcessOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        tracing::debug!(exit_code = result.exit_code, "process exited");
        Ok(result)
    }
}
