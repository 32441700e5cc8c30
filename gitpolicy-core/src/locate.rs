//! Executable discovery.

use std::path::{Path, PathBuf};

use crate::error::GitError;
use crate::process::CommandRunner;

const WHICH: &str = "/usr/bin/which";

/// Find `name` on this machine.
///
/// Windows scans `PATH` directly; elsewhere `/usr/bin/which` is asked, where
/// exit code 1 means "not found" and anything else but 0 is an error.
pub fn locate_executable(
    runner: &dyn CommandRunner,
    name: &str,
) -> Result<Option<PathBuf>, GitError> {
    if cfg!(windows) {
        let path_var = std::env::var("PATH").unwrap_or_default();
        return Ok(search_path_list(&path_var, ';', name));
    }
    locate_with_which(runner, name)
}

fn locate_with_which(
    runner: &dyn CommandRunner,
    name: &str,
) -> Result<Option<PathBuf>, GitError> {
    let output = runner.run(Path::new(WHICH), &[name.to_string()])?;
    match output.exit_code {
        0 => Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(PathBuf::from)),
        1 => Ok(None),
        exit_code => Err(GitError::Locate {
            program: name.to_string(),
            exit_code,
        }),
    }
}

fn search_path_list(path_var: &str, separator: char, name: &str) -> Option<PathBuf> {
    path_var
        .split(separator)
        .filter(|dir| !dir.is_empty())
        .map(|dir| Path::new(dir).join(name))
        .find(|candidate| candidate.is_file())
}
