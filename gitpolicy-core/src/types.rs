//! Domain types shared by the config store, the sync pipeline and the CLI.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GitError;

// ---------------------------------------------------------------------------
// Config scope
// ---------------------------------------------------------------------------

/// Which configuration target a `git config` invocation reads or writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConfigScope {
    /// Per-user configuration (`--global`).
    Global,
    /// Machine-wide configuration (`--system`).
    System,
    /// An explicit config file (`-f <path>`), bypassing scope resolution.
    File(PathBuf),
}

impl ConfigScope {
    /// Command-line options selecting this scope.
    pub fn args(&self) -> Vec<String> {
        match self {
            ConfigScope::Global => vec!["--global".to_string()],
            ConfigScope::System => vec!["--system".to_string()],
            ConfigScope::File(path) => vec!["-f".to_string(), path.display().to_string()],
        }
    }
}

impl fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigScope::Global => f.write_str("global"),
            ConfigScope::System => f.write_str("system"),
            ConfigScope::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

impl FromStr for ConfigScope {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "global" => Ok(ConfigScope::Global),
            "system" => Ok(ConfigScope::System),
            _ => Err(GitError::InvalidScope(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Config entries and policy documents
// ---------------------------------------------------------------------------

/// A single `key = value` configuration entry.
///
/// This is also the wire shape of the `cfg` list in a policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl ConfigEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }
}

/// The set of policies assigned to this client by the authority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub policies: Vec<String>,
}

/// A named bundle of configuration entries.
///
/// `vmin`/`vmax` are carried through untouched; version ranges are not
/// evaluated on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    #[serde(default, rename = "desc")]
    pub description: Option<String>,
    #[serde(default, rename = "cfg")]
    pub configuration: Vec<ConfigEntry>,
    #[serde(default, rename = "vmin")]
    pub minimum_version: Option<String>,
    #[serde(default, rename = "vmax")]
    pub maximum_version: Option<String>,
}
