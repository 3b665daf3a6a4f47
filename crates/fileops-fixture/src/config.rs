use anyhow::{anyhow, Context, Result};
use fileops_process::validate_process_id;
use fileops_process_file::DEFAULT_PID_FILE_NAME;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the Pebble working directory.
pub const PEBBLE_ENV: &str = "PEBBLE";

/// Fixture configuration, usually loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureConfig {
    /// Identifies this fixture in errors and logs.
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_pebble_binary")]
    pub pebble_binary: String,
    #[serde(default = "default_working_directory")]
    pub working_directory: PathBuf,
    #[serde(default = "default_http_address")]
    pub http_address: String,
    #[serde(default = "default_true")]
    pub create_dirs: bool,
    #[serde(default = "default_pid_file_name")]
    pub pid_file_name: String,
    #[serde(default = "default_delay", with = "duration_serde")]
    pub settle_delay: Duration,
    #[serde(default = "default_delay", with = "duration_serde")]
    pub teardown_delay: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness_probe: Option<ReadinessProbeConfig>,
    /// Set to `1` in the test command's environment.
    #[serde(default = "default_run_real_tests_env")]
    pub run_real_tests_env: String,
    /// Daemon stdout/stderr are appended here; discarded when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daemon_log_file: Option<PathBuf>,
}

/// One HTTP request issued after the settle delay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessProbeConfig {
    /// Defaults to `/v1/health` on the daemon's HTTP address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default = "default_probe_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for ReadinessProbeConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: default_probe_timeout(),
        }
    }
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            pebble_binary: default_pebble_binary(),
            working_directory: default_working_directory(),
            http_address: default_http_address(),
            create_dirs: true,
            pid_file_name: default_pid_file_name(),
            settle_delay: default_delay(),
            teardown_delay: default_delay(),
            readiness_probe: None,
            run_real_tests_env: default_run_real_tests_env(),
            daemon_log_file: None,
        }
    }
}

impl FixtureConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::load_from_string(&content)
    }

    /// Load configuration from a YAML string
    pub fn load_from_string(content: &str) -> Result<Self> {
        let config: FixtureConfig =
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_process_id(&self.name).map_err(|e| anyhow!("Invalid fixture name: {}", e))?;

        if self.pebble_binary.trim().is_empty() {
            return Err(anyhow!("Pebble binary cannot be empty"));
        }
        if self.working_directory.as_os_str().is_empty() {
            return Err(anyhow!("Working directory cannot be empty"));
        }
        if self.http_address.trim().is_empty() {
            return Err(anyhow!("HTTP address cannot be empty"));
        }
        if self.pid_file_name.is_empty() {
            return Err(anyhow!("PID file name cannot be empty"));
        }
        if self.pid_file_name.contains('/') {
            return Err(anyhow!(
                "PID file name must not contain a path separator: {}",
                self.pid_file_name
            ));
        }
        if self.run_real_tests_env.is_empty() {
            return Err(anyhow!("Test flag variable name cannot be empty"));
        }
        if let Some(probe) = &self.readiness_probe {
            if probe.timeout.is_zero() {
                return Err(anyhow!("Readiness probe timeout must be greater than 0"));
            }
        }
        Ok(())
    }

    /// Arguments passed to the Pebble binary.
    pub fn daemon_args(&self) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--http".to_string(),
            self.http_address.clone(),
        ];
        if self.create_dirs {
            args.push("--create-dirs".to_string());
        }
        args
    }

    /// The endpoint to probe, if probing is enabled.
    pub fn probe_endpoint(&self) -> Option<String> {
        self.readiness_probe.as_ref().map(|probe| {
            probe
                .endpoint
                .clone()
                .unwrap_or_else(|| fileops_monitoring::health_endpoint_for(&self.http_address))
        })
    }
}

// Default value functions
fn default_name() -> String {
    "pebble".to_string()
}

fn default_pebble_binary() -> String {
    "pebble".to_string()
}

fn default_working_directory() -> PathBuf {
    match std::env::var_os(PEBBLE_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from("/tmp/pebble-test"),
    }
}

fn default_http_address() -> String {
    ":4000".to_string()
}

fn default_true() -> bool {
    true
}

fn default_pid_file_name() -> String {
    DEFAULT_PID_FILE_NAME.to_string()
}

fn default_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_run_real_tests_env() -> String {
    "RUN_REAL_PEBBLE_TESTS".to_string()
}

/// Durations written as `"500ms"`, `"1s"` or `"2m"`.
pub mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        // "ms" before "s"
        if let Some(num_str) = s.strip_suffix("ms") {
            let millis: u64 = num_str.parse().map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_millis(millis))
        } else if let Some(num_str) = s.strip_suffix('s') {
            let secs: u64 = num_str.parse().map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_secs(secs))
        } else if let Some(num_str) = s.strip_suffix('m') {
            let mins: u64 = num_str.parse().map_err(|_| format!("Invalid duration: {}", s))?;
            let secs = mins
                .checked_mul(60)
                .ok_or_else(|| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_secs(secs))
        } else {
            Err(format!("Duration must end with 's', 'ms', or 'm': {}", s))
        }
    }
}
