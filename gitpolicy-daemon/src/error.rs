use std::path::PathBuf;

use thiserror::Error;

use gitpolicy_core::GitError;

/// Error surface for service management and the daemon runtime.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("git error: {0}")]
    Git(#[from] GitError),

    #[error("{message}{}", exit_suffix(.exit_code))]
    Start {
        message: String,
        exit_code: Option<i32>,
    },

    #[error("{message}{}", exit_suffix(.exit_code))]
    Stop {
        message: String,
        exit_code: Option<i32>,
    },

    #[error("{0}")]
    Unsupported(String),

    #[error("daemon runtime error: {0}")]
    Runtime(String),
}

fn exit_suffix(exit_code: &Option<i32>) -> String {
    exit_code.map(|code| format!(" ({code})")).unwrap_or_default()
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
