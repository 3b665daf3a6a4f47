// Fixture lifecycle: start the daemon, run the tests, always tear down.

use crate::config::{FixtureConfig, PEBBLE_ENV};
use fileops_common::{ProcessError, ProcessResult};
use fileops_monitoring::{check_http_health_with_config, HttpHealthCheckConfig};
use fileops_process::{exit_code, force_kill, process_exists, run_to_completion, spawn_daemon, ExecutionSpec};
use fileops_process_file::PidFileManager;
use std::fmt;
use std::time::Duration;
use tokio::process::Child;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

/// How long teardown waits for the killed daemon to be reaped.
const REAP_TIMEOUT: Duration = Duration::from_secs(5);

/// Pebble's `/v1/health` answer when healthy.
const HEALTHY_BODY: &str = "\"healthy\":true";

/// Exit code reported when the fixture itself fails.
pub const SETUP_FAILURE_EXIT_CODE: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixturePhase {
    Idle,
    Prepare,
    Launch,
    Settle,
    Probe,
    RunTests,
    Teardown,
    Finished,
}

impl fmt::Display for FixturePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FixturePhase::Idle => "idle",
            FixturePhase::Prepare => "prepare",
            FixturePhase::Launch => "launch",
            FixturePhase::Settle => "settle",
            FixturePhase::Probe => "probe",
            FixturePhase::RunTests => "run-tests",
            FixturePhase::Teardown => "teardown",
            FixturePhase::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Runs one fixture flow around a test command.
#[derive(Debug)]
pub struct FixtureRunner {
    config: FixtureConfig,
    pid_files: PidFileManager,
    phase: FixturePhase,
    daemon: Option<Child>,
    daemon_pid: Option<u32>,
}

impl FixtureRunner {
    pub fn new(config: FixtureConfig) -> Self {
        let pid_files = PidFileManager::new(&config.working_directory, &config.pid_file_name);
        Self {
            config,
            pid_files,
            phase: FixturePhase::Idle,
            daemon: None,
            daemon_pid: None,
        }
    }

    pub fn config(&self) -> &FixtureConfig {
        &self.config
    }

    pub fn phase(&self) -> FixturePhase {
        self.phase
    }

    /// PID of the most recently launched daemon.
    pub fn daemon_pid(&self) -> Option<u32> {
        self.daemon_pid
    }

    pub fn pid_files(&self) -> &PidFileManager {
        &self.pid_files
    }

    /// Create the working directory if it is missing.
    pub async fn prepare(&mut self) -> ProcessResult<()> {
        self.phase = FixturePhase::Prepare;
        self.pid_files.ensure_directory().await
    }

    /// Start the daemon and record its PID. Doesn't wait for readiness.
    pub async fn launch(&mut self) -> ProcessResult<u32> {
        self.phase = FixturePhase::Launch;
        let working_directory = self.config.working_directory.to_string_lossy().into_owned();
        let mut spec = ExecutionSpec::new(&self.config.pebble_binary)
            .args(self.config.daemon_args())
            .env(PEBBLE_ENV, working_directory);
        if let Some(log_file) = &self.config.daemon_log_file {
            spec = spec.log_file(log_file);
        }

        let child = spawn_daemon(&spec)?;
        let pid = child.id().ok_or_else(|| {
            ProcessError::start_failed(&self.config.name, "daemon exited before its PID was read")
        })?;
        self.daemon = Some(child);
        self.daemon_pid = Some(pid);

        self.pid_files.write_pid_file(pid).await?;
        info!(
            "Started {} (PID {}) with {}={}",
            self.config.pebble_binary,
            pid,
            PEBBLE_ENV,
            self.config.working_directory.display()
        );
        Ok(pid)
    }

    /// Wait the settle delay, then make sure the daemon is still running.
    pub async fn settle(&mut self) -> ProcessResult<()> {
        self.phase = FixturePhase::Settle;
        debug!("Settling for {:?}", self.config.settle_delay);
        sleep(self.config.settle_delay).await;

        let child = self
            .daemon
            .as_mut()
            .ok_or_else(|| ProcessError::not_found(&self.config.name))?;
        match child.try_wait() {
            Ok(None) => Ok(()),
            Ok(Some(status)) => Err(ProcessError::start_failed(
                &self.config.name,
                format!(
                    "{} exited during startup with code {} (is {} already in use?)",
                    self.config.pebble_binary,
                    exit_code(status),
                    self.config.http_address
                ),
            )),
            Err(e) => Err(ProcessError::start_failed(&self.config.name, e.to_string())),
        }
    }

    /// Issue the readiness request, if one is configured.
    pub async fn probe(&mut self) -> ProcessResult<()> {
        self.phase = FixturePhase::Probe;
        let (Some(endpoint), Some(probe)) =
            (self.config.probe_endpoint(), self.config.readiness_probe.as_ref())
        else {
            return Ok(());
        };

        let check = HttpHealthCheckConfig::new(&endpoint)
            .with_timeout(probe.timeout)
            .with_expected_body(HEALTHY_BODY);
        let data = check_http_health_with_config(&check)
            .await
            .map_err(|e| ProcessError::health_check_failed(&self.config.name, e.to_string()))?;
        if data.is_healthy {
            debug!("Readiness probe {} answered in {:?}ms", endpoint, data.response_time_ms);
            Ok(())
        } else {
            Err(ProcessError::health_check_failed(
                &self.config.name,
                format!(
                    "{}: {}",
                    endpoint,
                    data.error_message.unwrap_or_else(|| "unhealthy".to_string())
                ),
            ))
        }
    }

    /// Run the test command and return its exit code.
    pub async fn run_tests(&mut self, command: &[String]) -> ProcessResult<i32> {
        self.phase = FixturePhase::RunTests;
        let (program, args) = command
            .split_first()
            .ok_or_else(|| ProcessError::configuration(&self.config.name, "no test command given"))?;

        let spec = ExecutionSpec::new(program)
            .args(args.iter().cloned())
            .env(PEBBLE_ENV, self.config.working_directory.to_string_lossy())
            .env(&self.config.run_real_tests_env, "1");
        info!("Running tests: {}", command.join(" "));
        let status = run_to_completion(&spec).await?;
        let code = exit_code(status);
        info!("Tests finished with exit code {}", code);
        Ok(code)
    }

    /// Kill the daemon by its recorded PID and reap it.
    ///
    /// Never fails; problems are logged.
    pub async fn teardown(&mut self) {
        self.phase = FixturePhase::Teardown;
        let Some(mut child) = self.daemon.take() else {
            debug!("No daemon to tear down");
            return;
        };
        sleep(self.config.teardown_delay).await;

        let already_exited = matches!(child.try_wait(), Ok(Some(_)));
        if !already_exited {
            match self.pid_files.read_pid_file().await {
                Ok(pid) => kill_recorded(pid),
                Err(e) => {
                    warn!("Cannot use PID file ({}); killing the daemon directly", e);
                    if let Err(e) = child.start_kill() {
                        warn!("Failed to kill daemon: {}", e);
                    }
                }
            }
        }

        match timeout(REAP_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => debug!("Daemon reaped with code {}", exit_code(status)),
            Ok(Err(e)) => warn!("Failed to reap daemon: {}", e),
            Err(_) => {
                warn!("Daemon still running after {:?}; killing it", REAP_TIMEOUT);
                if let Err(e) = child.kill().await {
                    error!("Failed to kill daemon: {}", e);
                }
            }
        }

        if let Err(e) = self.pid_files.delete_pid_file().await {
            warn!("{}", e);
        }
        info!("Fixture torn down");
    }

    async fn run_phases(&mut self, command: &[String]) -> ProcessResult<i32> {
        if command.is_empty() {
            return Err(ProcessError::configuration(&self.config.name, "no test command given"));
        }
        self.prepare().await?;
        self.launch().await?;
        self.settle().await?;
        self.probe().await?;
        self.run_tests(command).await
    }

    /// Run the whole flow and return the exit code to report.
    ///
    /// Teardown runs whatever happened before it; its outcome never
    /// changes the returned code.
    pub async fn run(&mut self, command: &[String]) -> i32 {
        let outcome = self.run_phases(command).await;
        let failed_phase = self.phase;
        self.teardown().await;
        self.phase = FixturePhase::Finished;

        match outcome {
            Ok(code) => code,
            Err(e) => {
                error!("Fixture failed during {}: {}", failed_phase, e);
                SETUP_FAILURE_EXIT_CODE
            }
        }
    }
}

fn kill_recorded(pid: u32) {
    match process_exists(pid) {
        Ok(true) => {
            if let Err(e) = force_kill(pid) {
                warn!("{}", e);
            }
        }
        Ok(false) => debug!("Process {} already gone", pid),
        Err(e) => warn!("{}", e),
    }
}
