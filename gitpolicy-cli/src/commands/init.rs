//! `git policy init <url>`

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use url::Url;

use gitpolicy_core::{ConfigScope, Git};
use gitpolicy_sync::pipeline::URL_KEY;

/// Connect to a Git Policy authority.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Git Policy authority URL.
    pub url: String,
}

impl InitArgs {
    pub fn run(self, git: &Git) -> Result<ExitCode> {
        if Url::parse(&self.url).is_err() {
            eprintln!("error: URL is invalid");
            return Ok(ExitCode::FAILURE);
        }

        if let Err(err) = git.set_config(URL_KEY, &self.url, &ConfigScope::Global) {
            eprintln!("error: failed to initialize git-policy: {err}");
            return Ok(ExitCode::FAILURE);
        }

        println!("✓ Using policy authority {}", self.url);
        println!("  Run `git policy sync` to apply policies now, or `git policy start` to sync in the background.");
        Ok(ExitCode::SUCCESS)
    }
}
