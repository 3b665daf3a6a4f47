//! Process termination primitives.

use fileops_common::{ProcessError, ProcessResult};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tracing::debug;

fn to_pid(pid: u32) -> ProcessResult<Pid> {
    match i32::try_from(pid) {
        Ok(raw) if raw > 0 => Ok(Pid::from_raw(raw)),
        _ => Err(ProcessError::stop_failed(pid.to_string(), "invalid PID")),
    }
}

/// Force kill a process (SIGKILL).
pub fn force_kill(pid: u32) -> ProcessResult<()> {
    kill(to_pid(pid)?, Signal::SIGKILL)
        .map_err(|e| ProcessError::stop_failed(pid.to_string(), e.to_string()))?;
    debug!("Sent SIGKILL to {}", pid);
    Ok(())
}
