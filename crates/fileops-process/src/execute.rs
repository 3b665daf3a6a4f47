//! Process execution primitives.
//!
//! The fixture needs two kinds of process: a long-running daemon whose
//! output is either discarded or appended to a log file, and a foreground
//! test command that inherits the terminal and whose exit status matters.

use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use fileops_common::{ProcessError, ProcessResult};
use tokio::process::{Child, Command};
use tracing::debug;

use crate::validation::validate_executable;

/// Everything needed to start a process.
#[derive(Debug, Clone, Default)]
pub struct ExecutionSpec {
    pub executable: String,
    pub args: Vec<String>,
    /// Extra environment variables on top of the inherited environment.
    pub env: Vec<(String, String)>,
    /// Where daemon stdout/stderr go; `None` discards them.
    pub log_file: Option<PathBuf>,
}

impl ExecutionSpec {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            ..Default::default()
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    fn command(&self) -> ProcessResult<Command> {
        let executable = validate_executable(&self.executable)?;
        let mut cmd = Command::new(executable);
        cmd.args(&self.args);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        Ok(cmd)
    }
}

/// Start a background process without waiting for it to initialise.
///
/// stdin is closed. The returned child is not killed on drop; callers
/// own its teardown.
pub fn spawn_daemon(spec: &ExecutionSpec) -> ProcessResult<Child> {
    let mut cmd = spec.command()?;
    cmd.stdin(Stdio::null());

    match &spec.log_file {
        Some(path) => {
            let log = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    ProcessError::spawn_failed(
                        &spec.executable,
                        format!("Failed to open log file {}: {}", path.display(), e),
                    )
                })?;
            let log_clone = log.try_clone().map_err(|e| {
                ProcessError::spawn_failed(&spec.executable, format!("Failed to clone log file: {}", e))
            })?;
            cmd.stdout(Stdio::from(log)).stderr(Stdio::from(log_clone));
        }
        None => {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
    }

    let child = cmd
        .spawn()
        .map_err(|e| ProcessError::spawn_failed(&spec.executable, e.to_string()))?;
    debug!("Spawned {} with PID {:?}", spec.executable, child.id());
    Ok(child)
}

/// Run a foreground command to completion with inherited stdio.
///
/// The child is killed if the returned future is dropped before it exits.
pub async fn run_to_completion(spec: &ExecutionSpec) -> ProcessResult<ExitStatus> {
    let mut cmd = spec.command()?;
    cmd.kill_on_drop(true)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    let mut child = cmd
        .spawn()
        .map_err(|e| ProcessError::spawn_failed(&spec.executable, e.to_string()))?;
    child
        .wait()
        .await
        .map_err(|e| ProcessError::start_failed(&spec.executable, e.to_string()))
}

/// Map an exit status to a shell-style exit code.
///
/// A process killed by a signal maps to `128 + signal`.
pub fn exit_code(status: ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => 1,
    }
}
