use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;

use gitpolicy_core::{CommandRunner, ProcessOutput};

use crate::error::{io_err, DaemonError};
use crate::lifecycle::{DaemonIdentity, PlatformHandle, ServiceManager};
use crate::paths::{
    launch_agents_dir, launchd_plist_path, logs_dir, DAEMON_LABEL, DAEMON_STDERR_LOG,
    DAEMON_STDOUT_LOG,
};

const LAUNCHCTL: &str = "launchctl";

// launchd starts agents with only the system directories on PATH.
const AGENT_PATH_DIRS: [&str; 6] = [
    "/usr/local/bin",
    "/opt/homebrew/bin",
    "/usr/bin",
    "/bin",
    "/usr/sbin",
    "/sbin",
];

// `launchctl print` is free text; the only line we rely on is `pid = N`.
static PID_LINE: LazyLock<Regex> = LazyLock::new(|| match Regex::new(r"\s*pid = (?P<pid>\d+)") {
    Ok(re) => re,
    Err(_) => unreachable!("static regex pattern"),
});

/// A launchd-managed service (per-user agent or system daemon).
pub struct LaunchdService {
    name: String,
    plist_path: PathBuf,
    is_system: bool,
    uid: u32,
    runner: Arc<dyn CommandRunner>,
}

impl LaunchdService {
    pub fn new(
        name: impl Into<String>,
        plist_path: impl Into<PathBuf>,
        is_system: bool,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            name: name.into(),
            plist_path: plist_path.into(),
            is_system,
            uid: current_uid(),
            runner,
        }
    }

    /// Override the uid used for `gui/<uid>/<name>` targets.
    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = uid;
        self
    }

    pub fn identity(&self) -> DaemonIdentity {
        DaemonIdentity {
            name: self.name.clone(),
            is_system_service: self.is_system,
            handle: PlatformHandle::Plist(self.plist_path.clone()),
        }
    }

    /// `system/<name>` for system daemons, `gui/<uid>/<name>` for agents.
    pub fn service_target(&self) -> String {
        if self.is_system {
            format!("system/{}", self.name)
        } else {
            format!("gui/{}/{}", self.uid, self.name)
        }
    }

    fn launchctl(&self, args: &[&str]) -> Result<ProcessOutput, DaemonError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        Ok(self.runner.run(Path::new(LAUNCHCTL), &args)?)
    }
}

impl ServiceManager for LaunchdService {
    fn query_process_id(&self) -> Option<u32> {
        let target = self.service_target();
        let output = match self.launchctl(&["print", &target]) {
            Ok(output) => output,
            Err(err) => {
                tracing::debug!(error = %err, "launchctl print failed to run");
                return None;
            }
        };
        if !output.success() {
            return None;
        }
        parse_pid(&output.stdout)
    }

    fn start_core(&self) -> Result<Option<u32>, DaemonError> {
        let plist = self.plist_path.display().to_string();

        // Unload first in case the descriptor changed; failure just means it
        // was not loaded.
        let unload = self.launchctl(&["unload", "-F", &plist])?;
        tracing::debug!(exit_code = unload.exit_code, "launchctl unload");

        let load = self.launchctl(&["load", "-F", &plist])?;
        if !load.success() {
            return Err(DaemonError::Start {
                message: "failed to load the launch agent plist".to_string(),
                exit_code: Some(load.exit_code),
            });
        }

        let target = self.service_target();
        let kick = self.launchctl(&["kickstart", "-p", &target])?;
        if !kick.success() {
            return Err(DaemonError::Start {
                message: "failed to kickstart daemon".to_string(),
                exit_code: Some(kick.exit_code),
            });
        }

        let pid = kick.stdout.trim_end();
        pid.parse::<u32>().map(Some).map_err(|_| DaemonError::Start {
            message: format!("could not parse PID from kickstart output '{pid}'"),
            exit_code: None,
        })
    }

    fn stop_core(&self) -> Result<(), DaemonError> {
        let output = self.launchctl(&["stop", &self.name])?;
        if !output.success() {
            return Err(DaemonError::Stop {
                message: "failed to stop daemon".to_string(),
                exit_code: Some(output.exit_code),
            });
        }
        Ok(())
    }
}

fn parse_pid(output: &str) -> Option<u32> {
    PID_LINE
        .captures(output)
        .and_then(|caps| caps.name("pid"))
        .and_then(|pid| pid.as_str().parse().ok())
}

#[cfg(unix)]
fn current_uid() -> u32 {
    nix::unistd::getuid().as_raw()
}

#[cfg(not(unix))]
fn current_uid() -> u32 {
    0
}

// ---------------------------------------------------------------------------
// Launch agent descriptor
// ---------------------------------------------------------------------------

/// Generate a launchd plist that runs the daemon binary at login.
///
/// The daemon shells `git policy sync`, so the agent's `PATH` starts with
/// the directory holding the daemon (where `git-policy` is installed too).
pub fn generate_plist(binary_path: &Path, log_dir: &Path) -> String {
    let stdout = log_dir.join(DAEMON_STDOUT_LOG).display().to_string();
    let stderr = log_dir.join(DAEMON_STDERR_LOG).display().to_string();
    let binary = binary_path.display().to_string();
    let path = agent_path(binary_path);

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
  <key>Label</key>
  <string>{label}</string>
  <key>ProgramArguments</key>
  <array>
    <string>{binary}</string>
  </array>
  <key>RunAtLoad</key>
  <true/>
  <key>ProcessType</key>
  <string>Background</string>
  <key>EnvironmentVariables</key>
  <dict>
    <key>PATH</key>
    <string>{path}</string>
  </dict>
  <key>StandardOutPath</key>
  <string>{stdout}</string>
  <key>StandardErrorPath</key>
  <string>{stderr}</string>
</dict>
</plist>
"#,
        label = DAEMON_LABEL,
        binary = xml_escape(&binary),
        stdout = xml_escape(&stdout),
        stderr = xml_escape(&stderr),
        path = xml_escape(&path)
    )
}

fn agent_path(binary_path: &Path) -> String {
    let mut dirs: Vec<String> = Vec::new();
    if let Some(parent) = binary_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        dirs.push(parent.display().to_string());
    }
    for dir in AGENT_PATH_DIRS {
        if !dirs.iter().any(|existing| existing == dir) {
            dirs.push(dir.to_string());
        }
    }
    dirs.join(":")
}

/// Write the launch agent plist for the current user and return its path.
///
/// Does not load it; `git policy start` does that.
pub fn install(home: &Path, binary_path: &Path) -> Result<PathBuf, DaemonError> {
    ensure_macos()?;

    let launch_agents = launch_agents_dir(home);
    if !launch_agents.exists() {
        fs::create_dir_all(&launch_agents).map_err(|e| io_err(&launch_agents, e))?;
    }

    let logs = logs_dir(home);
    if !logs.exists() {
        fs::create_dir_all(&logs).map_err(|e| io_err(&logs, e))?;
    }

    let plist = launchd_plist_path(home);
    fs::write(&plist, generate_plist(binary_path, &logs)).map_err(|e| io_err(&plist, e))?;
    Ok(plist)
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(target_os = "macos")]
fn ensure_macos() -> Result<(), DaemonError> {
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn ensure_macos() -> Result<(), DaemonError> {
    Err(DaemonError::Unsupported(
        "launchd management is only supported on macOS".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{DaemonController, LifecycleOutcome};
    use gitpolicy_core::testing::ScriptedRunner;
    use plist::Value;

    const PRINT_RUNNING: &str = "gui/501/dev.gitpolicy.daemon = {\n\
        \tactive count = 1\n\
        \tpath = /Users/tester/Library/LaunchAgents/dev.gitpolicy.daemon.plist\n\
        \tstate = running\n\
        \tprogram = /usr/local/bin/git-policy-daemon\n\
        \tpid = 4242\n\
        \tlast exit code = (never exited)\n\
        }\n";

    const PRINT_STOPPED: &str = "gui/501/dev.gitpolicy.daemon = {\n\
        \tstate = not running\n\
        \tlast exit code = 0\n\
        }\n";

    fn agent(runner: ScriptedRunner) -> (LaunchdService, Arc<ScriptedRunner>) {
        let runner = Arc::new(runner);
        let service = LaunchdService::new(
            DAEMON_LABEL,
            "/Users/tester/Library/LaunchAgents/dev.gitpolicy.daemon.plist",
            false,
            runner.clone(),
        )
        .with_uid(501);
        (service, runner)
    }

    #[test]
    fn service_target_depends_on_scope() {
        let (agent, _) = agent(ScriptedRunner::new());
        assert_eq!(agent.service_target(), "gui/501/dev.gitpolicy.daemon");

        let system = LaunchdService::new(
            "dev.gitpolicy.daemon",
            "/Library/LaunchDaemons/dev.gitpolicy.daemon.plist",
            true,
            Arc::new(ScriptedRunner::new()),
        );
        assert_eq!(system.service_target(), "system/dev.gitpolicy.daemon");
        assert!(system.identity().is_system_service);
    }

    #[test]
    fn pid_is_parsed_from_print_output() {
        assert_eq!(parse_pid(PRINT_RUNNING), Some(4242));
        assert_eq!(parse_pid(PRINT_STOPPED), None);
        assert_eq!(parse_pid("pid = notanumber"), None);
    }

    #[test]
    fn query_treats_failure_and_missing_pid_as_not_running() {
        let (service, runner) = agent(
            ScriptedRunner::new()
                .respond(0, PRINT_RUNNING, "")
                .respond(0, PRINT_STOPPED, "")
                .respond(113, "", "Could not find service"),
        );
        assert_eq!(service.query_process_id(), Some(4242));
        assert_eq!(service.query_process_id(), None);
        assert_eq!(service.query_process_id(), None);
        assert_eq!(
            runner.command_lines()[0],
            "launchctl print gui/501/dev.gitpolicy.daemon"
        );
    }

    #[test]
    fn start_unloads_loads_and_kickstarts() {
        let (service, runner) = agent(
            ScriptedRunner::new()
                .respond(0, PRINT_STOPPED, "")
                .respond(1, "", "not loaded")
                .respond(0, "", "")
                .respond(0, "4243\n", ""),
        );
        let controller = DaemonController::new(service);

        assert_eq!(controller.start(), LifecycleOutcome::Started(Some(4243)));
        let plist = "/Users/tester/Library/LaunchAgents/dev.gitpolicy.daemon.plist";
        assert_eq!(
            runner.command_lines(),
            vec![
                "launchctl print gui/501/dev.gitpolicy.daemon".to_string(),
                format!("launchctl unload -F {plist}"),
                format!("launchctl load -F {plist}"),
                "launchctl kickstart -p gui/501/dev.gitpolicy.daemon".to_string(),
            ]
        );
    }

    #[test]
    fn start_when_running_touches_nothing() {
        let (service, runner) = agent(ScriptedRunner::new().respond(0, PRINT_RUNNING, ""));
        let controller = DaemonController::new(service);

        assert_eq!(controller.start(), LifecycleOutcome::AlreadyRunning(4242));
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn load_or_kickstart_failure_carries_exit_code() {
        let (service, _) = agent(
            ScriptedRunner::new()
                .respond(0, "", "")
                .respond(5, "", "Load failed: 5: Input/output error"),
        );
        let err = service.start_core().unwrap_err();
        assert!(matches!(err, DaemonError::Start { exit_code: Some(5), .. }), "got: {err}");

        let (service, _) = agent(
            ScriptedRunner::new()
                .respond(0, "", "")
                .respond(0, "", "")
                .respond(113, "", ""),
        );
        let err = service.start_core().unwrap_err();
        assert!(err.to_string().contains("kickstart"), "got: {err}");
    }

    #[test]
    fn unparsable_kickstart_pid_is_a_start_failure() {
        let (service, _) = agent(
            ScriptedRunner::new()
                .respond(0, "", "")
                .respond(0, "", "")
                .respond(0, "service started\n", ""),
        );
        assert!(matches!(
            service.start_core(),
            Err(DaemonError::Start { exit_code: None, .. })
        ));
    }

    #[test]
    fn stop_uses_label_and_reports_failure() {
        let (service, runner) = agent(
            ScriptedRunner::new()
                .respond(0, PRINT_RUNNING, "")
                .respond(0, "", "")
                .respond(0, PRINT_RUNNING, "")
                .respond(3, "", ""),
        );
        let controller = DaemonController::new(service);

        assert_eq!(controller.stop(), LifecycleOutcome::Stopped);
        assert_eq!(runner.command_lines()[1], "launchctl stop dev.gitpolicy.daemon");
        assert!(matches!(controller.stop(), LifecycleOutcome::StopFailed(_)));
    }

    #[test]
    fn plist_contains_required_launchd_fields() {
        let binary = Path::new("/usr/local/bin/git-policy-daemon");
        let log_dir = Path::new("/Users/tester/.gitpolicy/logs");
        let plist = generate_plist(binary, log_dir);

        let value = Value::from_reader_xml(plist.as_bytes()).expect("parse plist");
        let dict = value.as_dictionary().expect("plist root dict");

        assert_eq!(
            dict.get("Label").and_then(Value::as_string),
            Some("dev.gitpolicy.daemon")
        );
        assert_eq!(
            dict.get("RunAtLoad").and_then(Value::as_boolean),
            Some(true)
        );
        assert_eq!(
            dict.get("StandardErrorPath").and_then(Value::as_string),
            Some("/Users/tester/.gitpolicy/logs/daemon-err.log")
        );

        let args = dict
            .get("ProgramArguments")
            .and_then(Value::as_array)
            .expect("ProgramArguments array");
        let rendered_args: Vec<&str> = args
            .iter()
            .map(|v| v.as_string().expect("program arg as string"))
            .collect();
        assert_eq!(rendered_args, vec!["/usr/local/bin/git-policy-daemon"]);

        let path = dict
            .get("EnvironmentVariables")
            .and_then(Value::as_dictionary)
            .and_then(|env| env.get("PATH"))
            .and_then(Value::as_string)
            .expect("EnvironmentVariables.PATH");
        assert!(path.starts_with("/usr/local/bin:"), "{path}");
        assert_eq!(path.matches("/usr/local/bin").count(), 1, "{path}");
    }

    #[test]
    fn agent_path_puts_the_install_dir_first() {
        let plist = generate_plist(
            Path::new("/Users/tester/.cargo/bin/git-policy-daemon"),
            Path::new("/Users/tester/.gitpolicy/logs"),
        );
        let value = Value::from_reader_xml(plist.as_bytes()).expect("parse plist");
        let path = value
            .as_dictionary()
            .and_then(|dict| dict.get("EnvironmentVariables"))
            .and_then(Value::as_dictionary)
            .and_then(|env| env.get("PATH"))
            .and_then(Value::as_string)
            .expect("EnvironmentVariables.PATH");

        let dirs: Vec<&str> = path.split(':').collect();
        assert_eq!(dirs[0], "/Users/tester/.cargo/bin");
        assert!(dirs.contains(&"/usr/bin"), "{path}");
    }
}
