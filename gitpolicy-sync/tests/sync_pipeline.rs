//! Sync pipeline against the in-memory `git config` emulation and a canned
//! policy authority.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use gitpolicy_core::testing::MemoryGit;
use gitpolicy_core::{
    CommandRunner, ConfigEntry, ConfigScope, Git, GitError, Policy, Profile, ProcessOutput,
};
use gitpolicy_sync::paths::policy_config_path;
use gitpolicy_sync::pipeline::{self, IGNORE_KEY, INCLUDE_KEY, URL_KEY};
use gitpolicy_sync::{PolicyApi, SyncError};
use tempfile::TempDir;

struct CannedApi {
    profile: Vec<&'static str>,
    policies: HashMap<&'static str, Vec<ConfigEntry>>,
}

impl PolicyApi for CannedApi {
    fn profile(&self) -> Result<Profile, SyncError> {
        Ok(Profile {
            policies: self.profile.iter().map(|id| id.to_string()).collect(),
        })
    }

    fn policy(&self, id: &str) -> Result<Option<Policy>, SyncError> {
        Ok(self.policies.get(id).map(|cfg| Policy {
            id: id.to_string(),
            description: None,
            configuration: cfg.clone(),
            minimum_version: None,
            maximum_version: None,
        }))
    }
}

fn api() -> CannedApi {
    let mut policies = HashMap::new();
    policies.insert("POL-1", vec![ConfigEntry::new("core.autocrlf", "input")]);
    policies.insert(
        "POL-2",
        vec![
            ConfigEntry::new("fetch.prune", "true"),
            ConfigEntry {
                key: "user.signingkey".to_string(),
                value: None,
            },
        ],
    );
    CannedApi {
        profile: vec!["POL-1", "POL-2", "POL-404"],
        policies,
    }
}

fn policy_dir_entries(home: &Path) -> Vec<String> {
    let dir = policy_config_path(home)
        .parent()
        .expect("policy dir")
        .to_path_buf();
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read policy dir")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn file_value(git: &Git, home: &TempDir, key: &str) -> Option<String> {
    let scope = ConfigScope::File(policy_config_path(home.path()));
    git.get_config(key, Some(&scope)).expect("read policy file")
}

#[test]
fn applies_policies_into_the_managed_file_and_includes_it() {
    let home = TempDir::new().expect("home");
    let git = MemoryGit::new().into_git();

    let report = pipeline::run(&git, &api(), home.path()).expect("sync");

    assert_eq!(report.applied, vec!["POL-1", "POL-2"]);
    assert_eq!(report.missing, vec!["POL-404"]);
    assert!(report.ignored.is_empty());
    assert_eq!(report.entries, 3);
    assert_eq!(report.path, policy_config_path(home.path()));

    assert_eq!(file_value(&git, &home, "core.autocrlf").as_deref(), Some("input"));
    assert_eq!(file_value(&git, &home, "fetch.prune").as_deref(), Some("true"));
    assert_eq!(file_value(&git, &home, "user.signingkey").as_deref(), Some(""));
    assert_eq!(policy_dir_entries(home.path()), vec!["policy.gitconfig"]);

    let includes = git
        .get_all_config(INCLUDE_KEY, Some(&ConfigScope::Global))
        .expect("includes");
    assert_eq!(includes, vec![report.path.display().to_string()]);
}

#[test]
fn ignored_policies_are_skipped_case_insensitively() {
    let home = TempDir::new().expect("home");
    let git = MemoryGit::new().into_git();
    git.add_config(IGNORE_KEY, "pol-2", &ConfigScope::Global)
        .expect("ignore");

    let report = pipeline::run(&git, &api(), home.path()).expect("sync");

    assert_eq!(report.applied, vec!["POL-1"]);
    assert_eq!(report.ignored, vec!["POL-2"]);
    assert_eq!(file_value(&git, &home, "fetch.prune"), None);
}

#[test]
fn repeated_sync_replaces_the_file_and_includes_once() {
    let home = TempDir::new().expect("home");
    let git = MemoryGit::new().into_git();

    pipeline::run(&git, &api(), home.path()).expect("first sync");
    git.add_config(IGNORE_KEY, "POL-1", &ConfigScope::Global)
        .expect("ignore");
    pipeline::run(&git, &api(), home.path()).expect("second sync");

    assert_eq!(file_value(&git, &home, "core.autocrlf"), None);
    let contents = fs::read_to_string(policy_config_path(home.path())).expect("read");
    assert_eq!(contents.matches("fetch.prune").count(), 1);
    assert_eq!(
        git.get_all_config(INCLUDE_KEY, Some(&ConfigScope::Global))
            .expect("includes")
            .len(),
        1
    );
}

#[test]
fn run_configured_requires_policy_url() {
    let home = TempDir::new().expect("home");
    let git = MemoryGit::new().into_git();

    let err = pipeline::run_configured(&git, home.path(), |_| Ok(api())).unwrap_err();
    assert!(matches!(err, SyncError::NotInitialized), "got: {err}");

    git.set_config(URL_KEY, "https://policy.example.com/", &ConfigScope::Global)
        .expect("set url");
    let mut seen_url = String::new();
    pipeline::run_configured(&git, home.path(), |url| {
        seen_url = url.to_string();
        Ok(api())
    })
    .expect("sync");
    assert_eq!(seen_url, "https://policy.example.com/");
}

type Hook = Box<dyn FnOnce() + Send>;

/// Delegates to `MemoryGit` and runs `hook` just before the `nth` write into
/// a `-f` file.
struct InterleavingRunner {
    inner: Arc<MemoryGit>,
    nth: usize,
    file_adds: AtomicUsize,
    hook: Mutex<Option<Hook>>,
}

impl CommandRunner for InterleavingRunner {
    fn run(&self, program: &Path, args: &[String]) -> Result<ProcessOutput, GitError> {
        let is_file_add = args.iter().any(|a| a == "-f") && args.iter().any(|a| a == "--add");
        if is_file_add && self.file_adds.fetch_add(1, Ordering::SeqCst) + 1 == self.nth {
            let hook = self.hook.lock().expect("hook lock").take();
            if let Some(hook) = hook {
                hook();
            }
        }
        self.inner.run(program, args)
    }
}

#[test]
fn overlapping_syncs_keep_every_entry_of_the_last_writer() {
    let home = TempDir::new().expect("home");
    let memory = Arc::new(MemoryGit::new());

    // The second sync starts and finishes while the first is between writes.
    let nested_git = Git::new("git", memory.clone());
    let nested_home: PathBuf = home.path().to_path_buf();
    let nested: Hook = Box::new(move || {
        let report = pipeline::run(&nested_git, &api(), &nested_home).expect("second sync");
        assert_eq!(report.entries, 3);
    });
    let runner = InterleavingRunner {
        inner: memory,
        nth: 2,
        file_adds: AtomicUsize::new(0),
        hook: Mutex::new(Some(nested)),
    };
    let git = Git::new("git", Arc::new(runner));

    let report = pipeline::run(&git, &api(), home.path()).expect("first sync");
    assert_eq!(report.entries, 3);

    assert_eq!(file_value(&git, &home, "core.autocrlf").as_deref(), Some("input"));
    assert_eq!(file_value(&git, &home, "fetch.prune").as_deref(), Some("true"));
    assert_eq!(file_value(&git, &home, "user.signingkey").as_deref(), Some(""));
    assert_eq!(policy_dir_entries(home.path()), vec!["policy.gitconfig"]);
}
