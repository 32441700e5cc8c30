//! git-policy core library: process execution, argument quoting, and the
//! `git config` backed key/value store.
//!
//! Public API surface:
//! - [`process`]: [`CommandRunner`] seam and the real [`SystemRunner`]
//! - [`quote`]: shell-safe argument tokens for diagnostics
//! - [`git`]: [`Git`], the config store
//! - [`locate`]: executable discovery
//! - [`types`]: scopes, entries and policy documents
//! - [`error`]: [`GitError`]

pub mod error;
pub mod git;
pub mod locate;
pub mod process;
pub mod quote;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::GitError;
pub use git::{Git, ANY_VALUE_REGEX};
pub use process::{CommandRunner, ProcessOutput, SystemRunner};
pub use types::{ConfigEntry, ConfigScope, Policy, Profile};
