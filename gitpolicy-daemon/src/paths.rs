use std::path::{Path, PathBuf};

pub const DAEMON_LABEL: &str = "dev.gitpolicy.daemon";
pub const WINDOWS_SERVICE_NAME: &str = "GitPolicy";
pub const DAEMON_BINARY: &str = "git-policy-daemon";

pub const DAEMON_STDOUT_LOG: &str = "daemon.log";
pub const DAEMON_STDERR_LOG: &str = "daemon-err.log";

pub fn gitpolicy_root(home: &Path) -> PathBuf {
    home.join(".gitpolicy")
}

pub fn logs_dir(home: &Path) -> PathBuf {
    gitpolicy_root(home).join("logs")
}

pub fn launch_agents_dir(home: &Path) -> PathBuf {
    home.join("Library").join("LaunchAgents")
}

pub fn launchd_plist_path(home: &Path) -> PathBuf {
    launch_agents_dir(home).join(format!("{DAEMON_LABEL}.plist"))
}
