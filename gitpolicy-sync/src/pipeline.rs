//! Shared sync pipeline entrypoint used by `git policy sync`.
//!
//! Applied policies are written to a dedicated config file rather than the
//! user's global config, so a sync can replace the whole policy set without
//! touching anything the user set by hand. The global config only gains an
//! `include.path` entry pointing at that file.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use gitpolicy_core::{ConfigEntry, ConfigScope, Git};

use crate::api::PolicyApi;
use crate::error::{io_err, SyncError};
use crate::paths::policy_config_path;

pub const URL_KEY: &str = "policy.url";
pub const IGNORE_KEY: &str = "policy.ignore";
pub const INCLUDE_KEY: &str = "include.path";

const FILE_HEADER: &str = "# Managed by git-policy. Local edits are replaced on every sync.\n";

/// Outcome of one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Policy ids whose entries were written.
    pub applied: Vec<String>,
    /// Policy ids skipped because of `policy.ignore`.
    pub ignored: Vec<String>,
    /// Policy ids listed in the profile but unknown to the authority.
    pub missing: Vec<String>,
    /// Number of config entries written.
    pub entries: usize,
    /// The policy config file.
    pub path: PathBuf,
}

/// Fetch the profile from the authority configured in `policy.url`, using
/// `connect` to build the client.
pub fn run_configured<A, F>(git: &Git, home: &Path, connect: F) -> Result<SyncReport, SyncError>
where
    A: PolicyApi,
    F: FnOnce(&str) -> Result<A, SyncError>,
{
    let url = git
        .get_config(URL_KEY, None)?
        .filter(|url| !url.trim().is_empty())
        .ok_or(SyncError::NotInitialized)?;
    let api = connect(url.trim())?;
    run(git, &api, home)
}

/// Apply every non-ignored policy from `api`'s profile.
pub fn run(git: &Git, api: &dyn PolicyApi, home: &Path) -> Result<SyncReport, SyncError> {
    let profile = api.profile()?;
    let ignored: HashSet<String> = git
        .get_all_config(IGNORE_KEY, None)?
        .into_iter()
        .map(|id| id.to_lowercase())
        .collect();

    let mut report = SyncReport {
        path: policy_config_path(home),
        ..SyncReport::default()
    };
    let mut entries: Vec<ConfigEntry> = Vec::new();

    for id in profile.policies {
        if ignored.contains(&id.to_lowercase()) {
            tracing::info!(policy = %id, "policy ignored");
            report.ignored.push(id);
            continue;
        }

        match api.policy(&id)? {
            Some(policy) => {
                tracing::debug!(
                    policy = %policy.id,
                    entries = policy.configuration.len(),
                    "policy fetched"
                );
                entries.extend(policy.configuration);
                report.applied.push(id);
            }
            None => {
                tracing::warn!(policy = %id, "policy listed in profile but not found");
                report.missing.push(id);
            }
        }
    }

    report.entries = entries.len();
    write_policy_file(git, &report.path, &entries)?;
    ensure_included(git, &report.path)?;

    tracing::info!(
        applied = report.applied.len(),
        ignored = report.ignored.len(),
        missing = report.missing.len(),
        entries = report.entries,
        "policies applied"
    );
    Ok(report)
}

/// Write `entries` to a fresh temp file next to `path` through git, then
/// rename it over `path`.
///
/// Every run writes its own uniquely named temp file.
fn write_policy_file(git: &Git, path: &Path, entries: &[ConfigEntry]) -> Result<(), SyncError> {
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
    }

    let mut file = tempfile::Builder::new()
        .prefix(".policy-")
        .suffix(".gitconfig.tmp")
        .tempfile_in(&dir)
        .map_err(|e| io_err(&dir, e))?;
    file.write_all(FILE_HEADER.as_bytes())
        .map_err(|e| io_err(file.path(), e))?;
    // Close our handle; git replaces the file on every write. The path is
    // still removed on drop if a write below fails.
    let tmp = file.into_temp_path();

    let scope = ConfigScope::File(tmp.to_path_buf());
    for entry in entries {
        let value = entry.value.as_deref().unwrap_or_default();
        git.add_config(&entry.key, value, &scope)?;
    }

    tmp.persist(path).map_err(|e| io_err(path, e.error))?;
    Ok(())
}

fn ensure_included(git: &Git, path: &Path) -> Result<(), SyncError> {
    let target = path.display().to_string();
    let included = git.get_all_config(INCLUDE_KEY, Some(&ConfigScope::Global))?;
    if included.iter().any(|existing| *existing == target) {
        return Ok(());
    }
    tracing::info!(path = %target, "adding policy config to global include.path");
    git.add_config(INCLUDE_KEY, &target, &ConfigScope::Global)?;
    Ok(())
}

