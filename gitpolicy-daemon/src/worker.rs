//! Periodic `git policy sync` inside the daemon process.
//!
//! One sync runs at a time. The interval is the pause between the end of one
//! sync and the start of the next, so a slow sync delays the schedule rather
//! than overlapping with the next run.

use std::time::Duration;

use tokio::sync::broadcast::{self, error::TryRecvError};

use gitpolicy_core::Git;

/// Key holding the sync interval in seconds.
pub const INTERVAL_KEY: &str = "policy.interval";

/// Used when `policy.interval` is unset or not a non-negative integer.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30 * 60);

const SYNC_ARGS: [&str; 2] = ["policy", "sync"];

pub struct SyncWorker {
    git: Git,
    interval: Duration,
}

impl SyncWorker {
    /// Build a worker whose interval comes from `policy.interval`.
    pub fn from_config(git: Git) -> Self {
        let interval = resolve_interval(&git);
        Self::new(git, interval)
    }

    pub fn new(git: Git, interval: Duration) -> Self {
        Self { git, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sync until `shutdown` fires. Returns the number of syncs attempted.
    ///
    /// Shutdown is observed before each sync and during the wait; a sync in
    /// flight is always allowed to finish.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> u64 {
        tracing::info!(interval_secs = self.interval.as_secs(), "sync worker starting");
        let mut attempts = 0u64;

        loop {
            if shutdown_requested(&mut shutdown) {
                break;
            }

            attempts += 1;
            self.sync_once().await;

            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::info!(attempts, "sync worker stopping");
        attempts
    }

    async fn sync_once(&self) {
        tracing::info!("syncing policies");
        let git = self.git.clone();
        let result = tokio::task::spawn_blocking(move || git.run(&SYNC_ARGS)).await;

        match result {
            Ok(Ok(output)) if output.success() => tracing::info!("policies synced"),
            Ok(Ok(output)) => tracing::error!(
                exit_code = output.exit_code,
                stdout = %output.stdout,
                stderr = %output.stderr,
                "failed to sync policies"
            ),
            Ok(Err(err)) => tracing::error!(error = %err, "failed to run policy sync"),
            Err(err) => tracing::error!(error = %err, "policy sync task join failure"),
        }
    }
}

/// Read `policy.interval` (unscoped). Any problem falls back to
/// [`DEFAULT_INTERVAL`].
pub fn resolve_interval(git: &Git) -> Duration {
    match git.get_config(INTERVAL_KEY, None) {
        Ok(Some(value)) => parse_interval(&value).unwrap_or_else(|| {
            tracing::warn!(value = %value, "ignoring invalid policy.interval");
            DEFAULT_INTERVAL
        }),
        Ok(None) => DEFAULT_INTERVAL,
        Err(err) => {
            tracing::warn!(error = %err, "failed to read policy.interval");
            DEFAULT_INTERVAL
        }
    }
}

fn parse_interval(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// True once a shutdown message was sent or every sender is gone.
fn shutdown_requested(shutdown: &mut broadcast::Receiver<()>) -> bool {
    !matches!(shutdown.try_recv(), Err(TryRecvError::Empty))
}
