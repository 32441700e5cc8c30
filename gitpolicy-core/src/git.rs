//! `git config` as a scope-aware key/value store.
//!
//! Every call spawns `git` and re-reads its answer; nothing is cached, since
//! other processes may edit configuration at any time.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::GitError;
use crate::locate::locate_executable;
use crate::process::{CommandRunner, ProcessOutput, SystemRunner};
use crate::types::ConfigScope;

/// Value regex for [`Git::unset_all`] that matches every value.
pub const ANY_VALUE_REGEX: &str = ".*";

#[cfg(windows)]
const GIT_EXECUTABLE: &str = "git.exe";
#[cfg(not(windows))]
const GIT_EXECUTABLE: &str = "git";

/// Handle to a `git` executable plus the runner used to invoke it.
#[derive(Clone)]
pub struct Git {
    path: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl fmt::Debug for Git {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Git").field("path", &self.path).finish()
    }
}

impl Git {
    pub fn new(path: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            path: path.into(),
            runner,
        }
    }

    /// Locate `git` on this machine and wrap it with the system runner.
    pub fn discover() -> Result<Self, GitError> {
        Self::discover_with(Arc::new(SystemRunner))
    }

    /// Locate `git` using `runner` for any helper processes.
    pub fn discover_with(runner: Arc<dyn CommandRunner>) -> Result<Self, GitError> {
        let path = locate_executable(runner.as_ref(), GIT_EXECUTABLE)?
            .ok_or_else(|| GitError::ExecutableNotFound("git".to_string()))?;
        tracing::debug!(path = %path.display(), "located git");
        Ok(Self::new(path, runner))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `git` with arbitrary arguments through the store's execution path.
    pub fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<ProcessOutput, GitError> {
        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
        self.runner.run(&self.path, &args)
    }

    /// `git --version`, trailing whitespace trimmed.
    pub fn version(&self) -> Result<String, GitError> {
        let output = self.run(&["--version"])?;
        if !output.success() {
            return Err(GitError::ConfigRead {
                message: "failed to get git version".to_string(),
                exit_code: output.exit_code,
            });
        }

        let version = output.stdout.trim_end();
        if version.is_empty() {
            return Err(GitError::Parse {
                what: "git version",
                value: output.stdout,
            });
        }
        Ok(version.to_string())
    }

    /// Set the single value of `key`, replacing any previous one.
    pub fn set_config(&self, key: &str, value: &str, scope: &ConfigScope) -> Result<(), GitError> {
        let mut args = config_args(Some(scope));
        args.extend([key.to_string(), value.to_string()]);
        self.write(args, "failed to set configuration")
    }

    /// Append another value to the multi-valued `key`.
    pub fn add_config(&self, key: &str, value: &str, scope: &ConfigScope) -> Result<(), GitError> {
        let mut args = config_args(Some(scope));
        args.extend(["--add".to_string(), key.to_string(), value.to_string()]);
        self.write(args, "failed to add configuration")
    }

    /// Remove every value of `key` that matches `value_regex`.
    ///
    /// Pass [`ANY_VALUE_REGEX`] to remove all values regardless of content.
    pub fn unset_all(
        &self,
        key: &str,
        value_regex: &str,
        scope: &ConfigScope,
    ) -> Result<(), GitError> {
        let mut args = config_args(Some(scope));
        args.extend([
            "--unset-all".to_string(),
            key.to_string(),
            value_regex.to_string(),
        ]);
        self.write(args, "failed to unset configuration")
    }

    /// Read the value of `key`. `scope: None` uses git's normal precedence.
    pub fn get_config(
        &self,
        key: &str,
        scope: Option<&ConfigScope>,
    ) -> Result<Option<String>, GitError> {
        let mut args = config_args(scope);
        args.extend(["-z".to_string(), key.to_string()]);

        let output = self.runner.run(&self.path, &args)?;
        match output.exit_code {
            0 => Ok(Some(output.stdout.trim_end_matches('\0').to_string())),
            1 => Ok(None),
            exit_code => Err(GitError::ConfigRead {
                message: format!("failed to get git configuration entry '{key}'"),
                exit_code,
            }),
        }
    }

    /// Read every value of the multi-valued `key`, in the order git stores
    /// them.
    pub fn get_all_config(
        &self,
        key: &str,
        scope: Option<&ConfigScope>,
    ) -> Result<Vec<String>, GitError> {
        let mut args = config_args(scope);
        args.extend(["--get-all".to_string(), "-z".to_string(), key.to_string()]);

        let output = self.runner.run(&self.path, &args)?;
        match output.exit_code {
            0 => Ok(split_nul_terminated(&output.stdout)),
            1 => Ok(Vec::new()),
            exit_code => Err(GitError::ConfigRead {
                message: format!("failed to get all git configuration entries '{key}'"),
                exit_code,
            }),
        }
    }

    fn write(&self, args: Vec<String>, message: &str) -> Result<(), GitError> {
        let output = self.runner.run(&self.path, &args)?;
        if output.success() {
            return Ok(());
        }
        tracing::debug!(
            exit_code = output.exit_code,
            stderr = %output.stderr.trim_end(),
            "git config write failed"
        );
        Err(GitError::ConfigWrite {
            message: message.to_string(),
            exit_code: output.exit_code,
        })
    }
}

fn config_args(scope: Option<&ConfigScope>) -> Vec<String> {
    let mut args = vec!["config".to_string()];
    if let Some(scope) = scope {
        args.extend(scope.args());
    }
    args
}

/// Each value is terminated by a NUL, so splitting always leaves one empty
/// segment at the end which is not a value.
fn split_nul_terminated(data: &str) -> Vec<String> {
    let mut entries: Vec<String> = data.split('\0').map(str::to_string).collect();
    entries.pop();
    entries
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod store_tests;
