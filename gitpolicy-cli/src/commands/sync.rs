//! `git policy sync`: fetch and apply policies once.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use gitpolicy_core::Git;
use gitpolicy_sync::{pipeline, HttpPolicyApi, SyncReport};

/// Arguments for `git policy sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Only print errors.
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

impl SyncArgs {
    pub fn run(self, git: &Git) -> Result<ExitCode> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;

        let report = pipeline::run_configured(git, &home, HttpPolicyApi::new)
            .context("failed to sync policies")?;
        if !self.quiet {
            print_report(&report);
        }
        Ok(ExitCode::SUCCESS)
    }
}

fn print_report(report: &SyncReport) {
    println!(
        "✓ {} {} applied ({} config entries)",
        report.applied.len(),
        if report.applied.len() == 1 { "policy" } else { "policies" },
        report.entries
    );
    for id in &report.applied {
        println!("  ✎  {id}");
    }
    for id in &report.ignored {
        println!("  ·  {id} (ignored)");
    }
    for id in &report.missing {
        println!("  ?  {id} (not found on authority)");
    }
    println!("  Saved to: {}", report.path.display());
}
