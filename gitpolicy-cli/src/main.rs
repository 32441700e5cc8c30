//! git-policy: organisational git configuration, synced from a policy
//! authority.
//!
//! Installed as `git-policy`, so git exposes it as `git policy`.
//!
//! # Usage
//!
//! ```text
//! git policy init <url>
//! git policy sync
//! git policy ignore <id>...
//! git policy start|stop|restart|status
//! git policy install
//! ```

mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    daemon::DaemonCommand, ignore::IgnoreArgs, init::InitArgs, sync::SyncArgs,
};
use gitpolicy_core::Git;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "git-policy",
    bin_name = "git policy",
    version,
    about = "Apply organisational git configuration policies",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to a Git Policy authority.
    Init(InitArgs),

    /// Fetch and apply policies from the configured authority.
    Sync(SyncArgs),

    /// Opt out of policies.
    Ignore(IgnoreArgs),

    /// Start, stop or query the background sync daemon.
    #[command(flatten)]
    Daemon(DaemonCommand),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    gitpolicy_daemon::init_tracing("warn");

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("fatal: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Init(args) => args.run(&discover_git()?),
        Commands::Sync(args) => args.run(&discover_git()?),
        Commands::Ignore(args) => args.run(&discover_git()?),
        Commands::Daemon(command) => commands::daemon::run(command),
    }
}

fn discover_git() -> Result<Git> {
    Ok(Git::discover()?)
}
