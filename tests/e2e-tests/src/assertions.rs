//! Custom assertions for E2E tests

use crate::fixture::FixtureOutcome;
use fileops_process::process_exists;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

/// Assert the fixture exited with `expected`
pub fn assert_exit_code(outcome: &FixtureOutcome, expected: i32) -> Result<(), String> {
    if outcome.exit_code == Some(expected) {
        Ok(())
    } else {
        Err(format!(
            "Expected exit code {}, got {:?}. Logs:\n{}",
            expected, outcome.exit_code, outcome.log
        ))
    }
}

/// Assert the fixture log contains `pattern`
pub fn assert_log_contains(outcome: &FixtureOutcome, pattern: &str) -> Result<(), String> {
    if outcome.has_log_matching(pattern) {
        Ok(())
    } else {
        Err(format!("Log does not contain {:?}. Logs:\n{}", pattern, outcome.log))
    }
}

/// Read a PID saved by the test command
pub fn read_saved_pid(path: &Path) -> Result<u32, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    content
        .trim()
        .parse()
        .map_err(|e| format!("Invalid PID in {}: {}", path.display(), e))
}

/// Assert `pid` is gone, allowing a short grace period
pub fn assert_pid_not_running(pid: u32) -> Result<(), String> {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        match process_exists(pid) {
            Ok(false) => return Ok(()),
            Ok(true) if Instant::now() >= deadline => {
                return Err(format!("Process {} is still running", pid))
            }
            Ok(true) => std::thread::sleep(Duration::from_millis(50)),
            Err(e) => return Err(e.to_string()),
        }
    }
}
