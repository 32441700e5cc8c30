//! `git-policy-daemon`: background service that keeps policies in sync.
//!
//! Normally launched by launchd (macOS) or the service control manager
//! (Windows); can also be run in the foreground.

use std::process::ExitCode;

fn main() -> ExitCode {
    match gitpolicy_daemon::start_blocking() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fatal: {err}");
            ExitCode::FAILURE
        }
    }
}
