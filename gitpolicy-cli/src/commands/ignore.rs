//! `git policy ignore <id>...`

use std::collections::HashSet;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use gitpolicy_core::{ConfigScope, Git};
use gitpolicy_sync::pipeline::IGNORE_KEY;

/// Opt out of policies.
#[derive(Args, Debug)]
pub struct IgnoreArgs {
    /// Policy IDs to ignore.
    #[arg(required = true, value_name = "ID")]
    pub ids: Vec<String>,
}

impl IgnoreArgs {
    pub fn run(self, git: &Git) -> Result<ExitCode> {
        let scope = ConfigScope::Global;
        let mut known: HashSet<String> = git
            .get_all_config(IGNORE_KEY, Some(&scope))
            .context("failed to read ignored policies")?
            .into_iter()
            .map(|id| id.to_lowercase())
            .collect();

        let mut code = ExitCode::SUCCESS;
        for id in self.ids {
            // Policy ids compare case-insensitively, including within one call.
            if !known.insert(id.to_lowercase()) {
                continue;
            }
            match git.add_config(IGNORE_KEY, &id, &scope) {
                Ok(()) => println!("✓ Ignoring policy '{id}'"),
                Err(err) => {
                    eprintln!("error: failed to ignore policy '{id}': {err}");
                    code = ExitCode::FAILURE;
                }
            }
        }
        Ok(code)
    }
}
