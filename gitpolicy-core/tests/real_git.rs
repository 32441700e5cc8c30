//! Config store against the real `git` binary, using `-f` files so no user
//! or system configuration is touched. Skipped when git is not installed.

use assert_fs::prelude::*;
use gitpolicy_core::{ConfigScope, Git, GitError, ANY_VALUE_REGEX};
use predicates::prelude::*;

fn git() -> Option<Git> {
    match Git::discover() {
        Ok(git) => Some(git),
        Err(err @ (GitError::ExecutableNotFound(_) | GitError::Spawn { .. })) => {
            eprintln!("skipping: {err}");
            None
        }
        Err(err) => panic!("unexpected discovery failure: {err}"),
    }
}

fn file_scope(dir: &assert_fs::TempDir) -> ConfigScope {
    let file = dir.child("policy.gitconfig");
    file.touch().expect("touch config file");
    ConfigScope::File(file.path().to_path_buf())
}

#[test]
fn version_reports_git() {
    let Some(git) = git() else { return };
    let version = git.version().expect("version");
    assert!(version.starts_with("git version"), "got: {version}");
    assert!(!version.ends_with('\n'));
}

#[test]
fn multi_values_come_back_in_insertion_order() {
    let Some(git) = git() else { return };
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let scope = file_scope(&dir);

    assert!(git
        .get_all_config("policy.ignore", Some(&scope))
        .expect("empty get-all")
        .is_empty());

    git.add_config("policy.ignore", "POL-1", &scope).expect("add 1");
    git.add_config("policy.ignore", "POL-2", &scope).expect("add 2");
    assert_eq!(
        git.get_all_config("policy.ignore", Some(&scope)).expect("get-all"),
        vec!["POL-1", "POL-2"]
    );
}

#[test]
fn special_characters_survive_a_round_trip() {
    let Some(git) = git() else { return };
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let scope = file_scope(&dir);
    let value = r#"C:\Program Files\tool "quoted" value"#;

    git.set_config("policy.tool", value, &scope).expect("set");
    assert_eq!(
        git.get_config("policy.tool", Some(&scope)).expect("get").as_deref(),
        Some(value)
    );
    dir.child("policy.gitconfig")
        .assert(predicate::str::contains("[policy]"));
}

#[test]
fn unset_all_with_any_value_regex_clears_the_key() {
    let Some(git) = git() else { return };
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let scope = file_scope(&dir);

    git.set_config("policy.interval", "60", &scope).expect("set");
    assert_eq!(
        git.get_config("policy.interval", Some(&scope)).expect("get").as_deref(),
        Some("60")
    );
    git.unset_all("policy.interval", ANY_VALUE_REGEX, &scope)
        .expect("unset");
    assert_eq!(git.get_config("policy.interval", Some(&scope)).expect("get"), None);
}
