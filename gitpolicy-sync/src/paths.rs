use std::path::{Path, PathBuf};

pub const POLICY_CONFIG_FILE: &str = "policy.gitconfig";

pub fn gitpolicy_root(home: &Path) -> PathBuf {
    home.join(".gitpolicy")
}

/// Git config file holding every applied policy entry; included from the
/// global config through `include.path`.
pub fn policy_config_path(home: &Path) -> PathBuf {
    gitpolicy_root(home).join(POLICY_CONFIG_FILE)
}
