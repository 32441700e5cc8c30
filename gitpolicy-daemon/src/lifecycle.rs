//! Idempotent start/stop/restart of the background service.
//!
//! The service is either running (with a PID) or not; that state is asked of
//! the host service manager on every call and never cached. `start` on a
//! running service and `stop` on a stopped one are successful no-ops.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gitpolicy_core::CommandRunner;

use crate::error::DaemonError;
use crate::launchd::LaunchdService;
use crate::paths::{launchd_plist_path, DAEMON_LABEL, WINDOWS_SERVICE_NAME};
use crate::windows::WindowsService;

/// Platform-specific handle the service manager knows the service by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformHandle {
    /// Launch agent/daemon descriptor path (macOS).
    Plist(PathBuf),
    /// Service control manager name (Windows).
    ServiceName(String),
}

/// Identifies one controllable service instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonIdentity {
    pub name: String,
    pub is_system_service: bool,
    pub handle: PlatformHandle,
}

/// Service state as reported by the service manager right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    Running(u32),
    NotRunning,
}

/// The three primitives each host service manager must provide.
pub trait ServiceManager {
    /// PID of the running service, or `None` when it is not running or the
    /// PID cannot be determined.
    fn query_process_id(&self) -> Option<u32>;

    /// Start the service, returning its new PID when the backend knows it.
    fn start_core(&self) -> Result<Option<u32>, DaemonError>;

    fn stop_core(&self) -> Result<(), DaemonError>;
}

/// Result of a lifecycle operation, ready to show to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleOutcome {
    AlreadyRunning(u32),
    Started(Option<u32>),
    NotRunning,
    Stopped,
    StartFailed(String),
    StopFailed(String),
}

impl LifecycleOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(
            self,
            LifecycleOutcome::StartFailed(_) | LifecycleOutcome::StopFailed(_)
        )
    }

    /// Process exit code for the CLI: 0 on success, 1 on failure.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

impl fmt::Display for LifecycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleOutcome::AlreadyRunning(pid) => {
                write!(f, "daemon already running with PID: {pid}")
            }
            LifecycleOutcome::Started(Some(pid)) => write!(f, "daemon started with PID: {pid}"),
            LifecycleOutcome::Started(None) => f.write_str("daemon started"),
            LifecycleOutcome::NotRunning => f.write_str("no daemon running"),
            LifecycleOutcome::Stopped => f.write_str("daemon stopped"),
            LifecycleOutcome::StartFailed(_) => f.write_str("error: failed to start daemon"),
            LifecycleOutcome::StopFailed(_) => f.write_str("error: failed to stop daemon"),
        }
    }
}

/// Drives a [`ServiceManager`] through the two idempotent guards.
pub struct DaemonController<S> {
    service: S,
}

impl<S: ServiceManager> DaemonController<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn state(&self) -> DaemonState {
        match self.service.query_process_id() {
            Some(pid) => DaemonState::Running(pid),
            None => DaemonState::NotRunning,
        }
    }

    pub fn start(&self) -> LifecycleOutcome {
        if let DaemonState::Running(pid) = self.state() {
            tracing::info!(pid, "daemon already running");
            return LifecycleOutcome::AlreadyRunning(pid);
        }

        match self.service.start_core() {
            Ok(pid) => {
                tracing::info!(pid = ?pid, "daemon started");
                LifecycleOutcome::Started(pid)
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to start daemon");
                LifecycleOutcome::StartFailed(err.to_string())
            }
        }
    }

    pub fn stop(&self) -> LifecycleOutcome {
        if self.state() == DaemonState::NotRunning {
            tracing::info!("no daemon running");
            return LifecycleOutcome::NotRunning;
        }

        match self.service.stop_core() {
            Ok(()) => {
                tracing::info!("daemon stopped");
                LifecycleOutcome::Stopped
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to stop daemon");
                LifecycleOutcome::StopFailed(err.to_string())
            }
        }
    }

    /// Stop then start. A failed stop is returned as-is; start is not tried.
    pub fn restart(&self) -> LifecycleOutcome {
        let stopped = self.stop();
        if !stopped.is_success() {
            return stopped;
        }
        self.start()
    }
}

// ---------------------------------------------------------------------------
// Host backend selection
// ---------------------------------------------------------------------------

/// The supported host service managers.
pub enum ServiceBackend {
    Launchd(LaunchdService),
    WindowsService(WindowsService),
}

impl ServiceBackend {
    /// Pick the backend for the current OS: a per-user launch agent on
    /// macOS, the `GitPolicy` service on Windows.
    pub fn detect(home: &Path, runner: Arc<dyn CommandRunner>) -> Result<Self, DaemonError> {
        if cfg!(target_os = "macos") {
            return Ok(ServiceBackend::Launchd(LaunchdService::new(
                DAEMON_LABEL,
                launchd_plist_path(home),
                false,
                runner,
            )));
        }
        if cfg!(windows) {
            return Ok(ServiceBackend::WindowsService(WindowsService::new(
                WINDOWS_SERVICE_NAME,
                runner,
            )));
        }
        Err(DaemonError::Unsupported(format!(
            "daemon management is not supported on {}",
            std::env::consts::OS
        )))
    }

    pub fn identity(&self) -> DaemonIdentity {
        match self {
            ServiceBackend::Launchd(service) => service.identity(),
            ServiceBackend::WindowsService(service) => service.identity(),
        }
    }
}

impl ServiceManager for ServiceBackend {
    fn query_process_id(&self) -> Option<u32> {
        match self {
            ServiceBackend::Launchd(service) => service.query_process_id(),
            ServiceBackend::WindowsService(service) => service.query_process_id(),
        }
    }

    fn start_core(&self) -> Result<Option<u32>, DaemonError> {
        match self {
            ServiceBackend::Launchd(service) => service.start_core(),
            ServiceBackend::WindowsService(service) => service.start_core(),
        }
    }

    fn stop_core(&self) -> Result<(), DaemonError> {
        match self {
            ServiceBackend::Launchd(service) => service.stop_core(),
            ServiceBackend::WindowsService(service) => service.stop_core(),
        }
    }
}
