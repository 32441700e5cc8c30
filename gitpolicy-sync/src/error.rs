//! Error types for gitpolicy-sync.

use std::path::PathBuf;

use thiserror::Error;

use gitpolicy_core::GitError;

/// All errors that can arise from a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Reading or writing git configuration failed.
    #[error("git error: {0}")]
    Git(#[from] GitError),

    /// The policy authority could not be reached or answered with an error.
    #[error("{message}: {source}")]
    Http {
        message: String,
        #[source]
        source: Box<ureq::Error>,
    },

    /// A response body was not the JSON document we expected.
    #[error("{message}: {source}")]
    Json {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// `policy.url` is not a usable base URL.
    #[error("invalid policy authority URL '{url}': {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No `policy.url` has been configured yet.
    #[error("git-policy is not initialized; run `git policy init <url>` first")]
    NotInitialized,
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
