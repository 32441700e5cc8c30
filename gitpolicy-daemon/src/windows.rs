use std::path::Path;
use std::sync::Arc;

use gitpolicy_core::{CommandRunner, ProcessOutput};

use crate::error::DaemonError;
use crate::lifecycle::{DaemonIdentity, PlatformHandle, ServiceManager};

const NET: &str = "net";

/// A Windows service driven through `net start` / `net stop`.
///
/// The running PID is never discovered, so `start` cannot detect an
/// already-running service and always asks the service manager.
pub struct WindowsService {
    service_name: String,
    runner: Arc<dyn CommandRunner>,
}

impl WindowsService {
    pub fn new(service_name: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            service_name: service_name.into(),
            runner,
        }
    }

    pub fn identity(&self) -> DaemonIdentity {
        DaemonIdentity {
            name: self.service_name.clone(),
            is_system_service: true,
            handle: PlatformHandle::ServiceName(self.service_name.clone()),
        }
    }

    fn net(&self, verb: &str) -> Result<ProcessOutput, DaemonError> {
        let args = vec![verb.to_string(), self.service_name.clone()];
        Ok(self.runner.run(Path::new(NET), &args)?)
    }
}

impl ServiceManager for WindowsService {
    // TODO: resolve the service PID (QueryServiceStatusEx) so start() can
    // short-circuit like the launchd backend does.
    fn query_process_id(&self) -> Option<u32> {
        None
    }

    fn start_core(&self) -> Result<Option<u32>, DaemonError> {
        let output = self.net("start")?;
        if !output.success() {
            return Err(DaemonError::Start {
                message: "failed to start the service".to_string(),
                exit_code: Some(output.exit_code),
            });
        }
        Ok(None)
    }

    fn stop_core(&self) -> Result<(), DaemonError> {
        let output = self.net("stop")?;
        if !output.success() {
            return Err(DaemonError::Stop {
                message: "failed to stop the service".to_string(),
                exit_code: Some(output.exit_code),
            });
        }
        Ok(())
    }
}
