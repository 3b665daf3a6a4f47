//! # fileops-process-file
//!
//! PID file persistence for the Pebble test fixture.
//!
//! The fixture keeps all of its state in one working directory (the same
//! directory handed to the daemon as `$PEBBLE`). This crate owns that
//! directory's layout:
//! - Creating the working directory (idempotent)
//! - Writing the daemon PID as `"<pid>\n"`
//! - Reading it back at teardown
//! - Removing it afterwards

use std::path::PathBuf;

use fileops_common::{ProcessError, ProcessResult};
use tracing::debug;

/// Default PID file name inside the working directory.
pub const DEFAULT_PID_FILE_NAME: &str = "pebble.pid";

/// PID file manager rooted at the fixture working directory.
#[derive(Debug, Clone)]
pub struct PidFileManager {
    working_directory: PathBuf,
    pid_file_name: String,
}

impl PidFileManager {
    pub fn new(working_directory: impl Into<PathBuf>, pid_file_name: impl Into<String>) -> Self {
        Self {
            working_directory: working_directory.into(),
            pid_file_name: pid_file_name.into(),
        }
    }

    pub fn with_defaults(working_directory: impl Into<PathBuf>) -> Self {
        Self::new(working_directory, DEFAULT_PID_FILE_NAME)
    }

    pub fn pid_file_path(&self) -> PathBuf {
        self.working_directory.join(&self.pid_file_name)
    }

    /// Create the working directory and any missing parents.
    ///
    /// Succeeds without changes if it already exists. Fails if the path
    /// exists but is not a directory.
    pub async fn ensure_directory(&self) -> ProcessResult<()> {
        tokio::fs::create_dir_all(&self.working_directory)
            .await
            .map_err(|e| {
                ProcessError::configuration(
                    &self.pid_file_name,
                    format!(
                        "Failed to create directory {}: {}",
                        self.working_directory.display(),
                        e
                    ),
                )
            })?;
        debug!("Working directory ready: {}", self.working_directory.display());
        Ok(())
    }

    /// Write a PID file (simple text format: just the PID number).
    ///
    /// Overwrites whatever an earlier run left behind.
    pub async fn write_pid_file(&self, pid: u32) -> ProcessResult<()> {
        let path = self.pid_file_path();
        tokio::fs::write(&path, format!("{}\n", pid))
            .await
            .map_err(|e| {
                ProcessError::configuration(
                    &self.pid_file_name,
                    format!("Failed to write PID file {}: {}", path.display(), e),
                )
            })?;
        debug!("Wrote PID {} to {}", pid, path.display());
        Ok(())
    }

    /// Read the PID file.
    pub async fn read_pid_file(&self) -> ProcessResult<u32> {
        let path = self.pid_file_path();
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProcessError::not_found(path.display().to_string())
            } else {
                ProcessError::configuration(
                    &self.pid_file_name,
                    format!("Failed to read PID file {}: {}", path.display(), e),
                )
            }
        })?;

        content.trim().parse::<u32>().map_err(|e| {
            ProcessError::configuration(
                &self.pid_file_name,
                format!("Invalid PID in {}: {}", path.display(), e),
            )
        })
    }

    /// Delete the PID file; a missing file is not an error.
    pub async fn delete_pid_file(&self) -> ProcessResult<()> {
        let path = self.pid_file_path();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ProcessError::configuration(
                &self.pid_file_name,
                format!("Failed to delete PID file {}: {}", path.display(), e),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_directory_is_idempotent() {
        let temp = tempfile::tempdir().unwrap();
        let workdir = temp.path().join("a").join("pebble");
        let manager = PidFileManager::with_defaults(&workdir);

        manager.ensure_directory().await.unwrap();
        assert!(workdir.is_dir());

        std::fs::write(workdir.join("keep"), "x").unwrap();
        manager.ensure_directory().await.unwrap();
        assert!(workdir.join("keep").exists());
    }

    #[tokio::test]
    async fn test_ensure_directory_rejects_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("not-a-dir");
        std::fs::write(&path, "").unwrap();
        let manager = PidFileManager::with_defaults(&path);
        assert!(manager.ensure_directory().await.is_err());
    }

    #[tokio::test]
    async fn test_pid_file_lifecycle() {
        let temp = tempfile::tempdir().unwrap();
        let manager = PidFileManager::with_defaults(temp.path());

        manager.write_pid_file(12345).await.unwrap();
        let raw = std::fs::read_to_string(manager.pid_file_path()).unwrap();
        assert_eq!(raw, "12345\n");
        assert_eq!(manager.read_pid_file().await.unwrap(), 12345);

        // Most recent write wins
        manager.write_pid_file(42).await.unwrap();
        assert_eq!(manager.read_pid_file().await.unwrap(), 42);

        manager.delete_pid_file().await.unwrap();
        assert!(!manager.pid_file_path().exists());
        manager.delete_pid_file().await.unwrap();
    }

    #[tokio::test]
    async fn test_read_missing_pid_file() {
        let temp = tempfile::tempdir().unwrap();
        let manager = PidFileManager::new(temp.path(), "daemon.pid");
        assert!(matches!(
            manager.read_pid_file().await,
            Err(ProcessError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_read_garbage_pid_file() {
        let temp = tempfile::tempdir().unwrap();
        let manager = PidFileManager::with_defaults(temp.path());
        std::fs::write(manager.pid_file_path(), "not a pid\n").unwrap();
        assert!(matches!(
            manager.read_pid_file().await,
            Err(ProcessError::Configuration { .. })
        ));
    }
}
