//! Error types for gitpolicy-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from running git and reading or writing its
/// configuration.
#[derive(Debug, Error)]
pub enum GitError {
    /// The program could not be located or spawned at all.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `git` ran but a read returned an unexpected exit code.
    #[error("{message} (exit={exit_code})")]
    ConfigRead { message: String, exit_code: i32 },

    /// `git` ran but a write returned a nonzero exit code.
    #[error("{message} (exit={exit_code})")]
    ConfigWrite { message: String, exit_code: i32 },

    /// A scope name that does not map to `--global` or `--system`.
    #[error("invalid configuration scope '{0}'; expected: global, system")]
    InvalidScope(String),

    /// Captured output could not be parsed into the expected shape.
    #[error("could not parse {what} from output '{value}'")]
    Parse { what: &'static str, value: String },

    /// `which` failed in a way other than "not found".
    #[error("unknown error locating '{program}' (exit={exit_code})")]
    Locate { program: String, exit_code: i32 },

    /// The executable is not installed or not on `PATH`.
    #[error("unable to locate {0} executable")]
    ExecutableNotFound(String),
}

impl GitError {
    /// Exit code reported by the external tool, when there was one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            GitError::ConfigRead { exit_code, .. }
            | GitError::ConfigWrite { exit_code, .. }
            | GitError::Locate { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}
