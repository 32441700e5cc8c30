use std::future::Future;

use tokio::sync::broadcast;

use gitpolicy_core::Git;

use crate::error::{io_err, DaemonError};
use crate::worker::SyncWorker;

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking() -> Result<(), DaemonError> {
    init_tracing("info");

    let git = Git::discover()?;
    match git.version() {
        Ok(version) => tracing::info!(path = %git.path().display(), %version, "using git"),
        Err(err) => tracing::warn!(error = %err, "could not determine git version"),
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(git))
}

/// Run the sync worker until ctrl-c (or SIGTERM on Unix).
pub async fn run(git: Git) -> Result<(), DaemonError> {
    run_until(git, shutdown_signal()).await
}

/// Run the sync worker until `signal` resolves.
pub async fn run_until<F>(git: Git, signal: F) -> Result<(), DaemonError>
where
    F: Future<Output = Result<&'static str, DaemonError>> + Send + 'static,
{
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let worker = tokio::task::spawn_blocking(move || SyncWorker::from_config(git))
        .await
        .map_err(|err| DaemonError::Runtime(format!("worker setup join failure: {err}")))?;

    let worker_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            worker.run(shutdown_rx).await;
            let _ = shutdown.send(());
            Ok::<(), DaemonError>(())
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => Ok::<(), DaemonError>(()),
                received = signal => {
                    // Stop the worker even when the signal handler itself failed.
                    let _ = shutdown.send(());
                    let name = received?;
                    tracing::info!(signal = name, "shutting down daemon");
                    Ok(())
                }
            }
        })
    };

    let (worker_result, signal_result) = tokio::join!(worker_handle, signal_handle);
    handle_join("sync_worker", worker_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<&'static str, DaemonError> {
    use tokio::signal::unix::{signal, SignalKind};

    // launchd stops services with SIGTERM.
    let mut terminate =
        signal(SignalKind::terminate()).map_err(|e| io_err("SIGTERM handler", e))?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.map_err(|e| io_err("ctrl-c handler", e))?;
            Ok("ctrl-c")
        }
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<&'static str, DaemonError> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| io_err("ctrl-c handler", e))?;
    Ok("ctrl-c")
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Runtime(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` overrides `default_level`; `GITPOLICY_LOG_FORMAT=json` switches
/// to JSON lines.
pub fn init_tracing(default_level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let json = std::env::var("GITPOLICY_LOG_FORMAT").is_ok_and(|format| format == "json");

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
