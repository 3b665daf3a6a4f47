//! Process existence checking.

use fileops_common::{ProcessError, ProcessResult};
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;

/// Check if a process with the given PID exists.
///
/// Uses `kill(pid, 0)`, which sends no signal but reports whether the
/// process exists. A zombie (exited but not yet reaped) still counts as
/// existing.
///
/// # Returns
///
/// * `Ok(true)` - Process exists
/// * `Ok(false)` - Process does not exist
/// * `Err(_)` - The check itself failed
///
/// # Examples
///
/// ```rust,no_run
/// use fileops_process::process_exists;
///
/// if process_exists(1234).unwrap() {
///     println!("Process 1234 is running");
/// }
/// ```
pub fn process_exists(pid: u32) -> ProcessResult<bool> {
    let raw = i32::try_from(pid)
        .map_err(|_| ProcessError::configuration(pid.to_string(), "PID out of range"))?;
    if raw <= 0 {
        // 0 and negative values address process groups, not a process
        return Ok(false);
    }

    match kill(Pid::from_raw(raw), None) {
        Ok(_) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        // Exists, but belongs to someone else
        Err(Errno::EPERM) => Ok(true),
        Err(e) => Err(ProcessError::configuration(
            pid.to_string(),
            format!("Failed to check process: {}", e),
        )),
    }
}
