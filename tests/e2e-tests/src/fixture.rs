//! Running `pebble-fixture` as a subprocess.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// One `pebble-fixture` invocation.
#[derive(Debug, Clone)]
pub struct FixtureInvocation {
    pub pebble: PathBuf,
    pub workdir: PathBuf,
    pub http: String,
    pub settle_ms: u64,
    pub teardown_delay_ms: u64,
    pub probe: Option<String>,
    pub command: Vec<String>,
}

impl FixtureInvocation {
    pub fn new(pebble: impl Into<PathBuf>, workdir: impl Into<PathBuf>, port: u16) -> Self {
        Self {
            pebble: pebble.into(),
            workdir: workdir.into(),
            http: format!("127.0.0.1:{}", port),
            settle_ms: 300,
            teardown_delay_ms: 100,
            probe: None,
            command: Vec::new(),
        }
    }

    pub fn probe(mut self, url: impl Into<String>) -> Self {
        self.probe = Some(url.into());
        self
    }

    /// Run `script` with `sh -c` as the test command.
    pub fn shell(mut self, script: impl Into<String>) -> Self {
        self.command = vec!["sh".to_string(), "-c".to_string(), script.into()];
        self
    }

    /// Run the fixture to completion, logging its output to `log_dir/fixture.log`.
    pub fn run(&self, fixture_path: &Path, log_dir: &Path, timeout: Duration) -> Result<FixtureOutcome, String> {
        let log_path = log_dir.join("fixture.log");
        let log_file = fs::File::create(&log_path)
            .map_err(|e| format!("Failed to create log file: {}", e))?;
        let log_file_clone = log_file
            .try_clone()
            .map_err(|e| format!("Failed to clone log file: {}", e))?;

        let mut cmd = Command::new(fixture_path);
        cmd.arg("--pebble")
            .arg(&self.pebble)
            .arg("--workdir")
            .arg(&self.workdir)
            .arg("--http")
            .arg(&self.http)
            .arg("--settle")
            .arg(self.settle_ms.to_string())
            .arg("--teardown-delay")
            .arg(self.teardown_delay_ms.to_string())
            .arg("--debug");
        if let Some(url) = &self.probe {
            cmd.arg("--probe").arg(url);
        }
        cmd.arg("--")
            .args(&self.command)
            .env_remove("RUST_LOG")
            .stdout(Stdio::from(log_file))
            .stderr(Stdio::from(log_file_clone));

        println!("Running fixture: {:?}", cmd);
        let mut child = cmd.spawn().map_err(|e| format!("Failed to spawn fixture: {}", e))?;

        let status = match child.wait_timeout(timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                child.kill().ok();
                child.wait().ok();
                return Err(format!("Fixture did not finish within {:?}", timeout));
            }
            Err(e) => return Err(format!("Error waiting for fixture: {}", e)),
        };

        let log = fs::read_to_string(&log_path).unwrap_or_default();
        for line in log.lines() {
            println!("[FIXTURE] {}", line);
        }
        Ok(FixtureOutcome {
            exit_code: status.code(),
            log,
        })
    }
}

#[derive(Debug, Clone)]
pub struct FixtureOutcome {
    pub exit_code: Option<i32>,
    pub log: String,
}

impl FixtureOutcome {
    pub fn has_log_matching(&self, pattern: &str) -> bool {
        self.log.lines().any(|line| line.contains(pattern))
    }
}
