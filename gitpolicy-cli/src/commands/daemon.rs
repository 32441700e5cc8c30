//! `git policy start|stop|restart|status|install`: background daemon
//! lifecycle.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;

use gitpolicy_core::SystemRunner;
use gitpolicy_daemon::paths::DAEMON_BINARY;
use gitpolicy_daemon::{launchd, DaemonController, DaemonState, LifecycleOutcome, ServiceBackend};

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Start the Git Policy daemon.
    Start,
    /// Stop the Git Policy daemon.
    Stop,
    /// Restart the Git Policy daemon.
    Restart,
    /// Show whether the Git Policy daemon is running.
    Status,
    /// Write the launch agent descriptor for the daemon (macOS).
    Install,
}

pub fn run(command: DaemonCommand) -> Result<ExitCode> {
    let home = dirs::home_dir().context("could not determine home directory")?;

    if let DaemonCommand::Install = command {
        let binary = daemon_binary_path()?;
        let path = launchd::install(&home, &binary).context("failed to install launch agent")?;
        println!("installed launch agent: {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let backend = ServiceBackend::detect(&home, Arc::new(SystemRunner))?;
    let identity = backend.identity();
    tracing::debug!(
        service = %identity.name,
        system = identity.is_system_service,
        handle = ?identity.handle,
        "using service backend"
    );
    let controller = DaemonController::new(backend);

    let outcome = match command {
        DaemonCommand::Start => controller.start(),
        DaemonCommand::Stop => controller.stop(),
        DaemonCommand::Restart => controller.restart(),
        DaemonCommand::Status => {
            match controller.state() {
                DaemonState::Running(pid) => println!("running (pid {pid})"),
                DaemonState::NotRunning => println!("not running"),
            }
            return Ok(ExitCode::SUCCESS);
        }
        DaemonCommand::Install => return Ok(ExitCode::SUCCESS),
    };

    Ok(report(&outcome))
}

fn report(outcome: &LifecycleOutcome) -> ExitCode {
    eprintln!("{outcome}");
    u8::try_from(outcome.exit_code())
        .map(ExitCode::from)
        .unwrap_or(ExitCode::FAILURE)
}

/// The daemon binary is installed next to `git-policy`.
fn daemon_binary_path() -> Result<PathBuf> {
    let current = std::env::current_exe().context("could not determine current executable")?;
    let dir = current.parent().unwrap_or_else(|| Path::new("."));
    Ok(dir.join(format!("{DAEMON_BINARY}{}", std::env::consts::EXE_SUFFIX)))
}
