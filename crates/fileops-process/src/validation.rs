//! Validation utilities for executables and process identifiers.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use fileops_common::{ProcessError, ProcessResult};

/// Resolve an executable the way a shell would.
///
/// Names containing a `/` are checked as paths; bare names are searched
/// on `PATH`. The returned path exists, is a regular file and has at
/// least one execute bit set.
pub fn validate_executable(executable: &str) -> ProcessResult<PathBuf> {
    if executable.is_empty() {
        return Err(ProcessError::configuration(
            "validation",
            "Executable path cannot be empty",
        ));
    }

    if executable.contains('/') {
        let path = PathBuf::from(executable);
        return if is_executable(&path) {
            Ok(path)
        } else {
            Err(ProcessError::spawn_failed(
                executable,
                format!("executable not found: {}", path.display()),
            ))
        };
    }

    let search_path = std::env::var_os("PATH").unwrap_or_default();
    std::env::split_paths(&search_path)
        .map(|dir| dir.join(executable))
        .find(|candidate| is_executable(candidate))
        .ok_or_else(|| {
            ProcessError::spawn_failed(executable, "executable not found on PATH")
        })
}

fn is_executable(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(metadata) => metadata.is_file() && metadata.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

/// Validate a process ID used to name fixture artifacts.
pub fn validate_process_id(id: &str) -> ProcessResult<()> {
    if id.is_empty() {
        return Err(ProcessError::configuration(
            "validation",
            "Process ID cannot be empty",
        ));
    }

    if !id.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.') {
        return Err(ProcessError::configuration(
            id,
            "Process ID can only contain alphanumeric characters, dots, hyphens, and underscores",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_empty_executable() {
        assert!(matches!(
            validate_executable(""),
            Err(ProcessError::Configuration { .. })
        ));
    }

    #[test]
    fn test_executable_on_path() {
        let resolved = validate_executable("sh").unwrap();
        assert!(resolved.is_absolute() || resolved.starts_with("."));
        assert!(resolved.ends_with("sh"));
    }

    #[test]
    fn test_missing_executable() {
        let err = validate_executable("definitely-not-a-real-binary-4000").unwrap_err();
        assert!(matches!(err, ProcessError::SpawnFailed { .. }));
    }

    #[test]
    fn test_non_executable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script");
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        assert!(validate_executable(path.to_str().unwrap()).is_err());

        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(validate_executable(path.to_str().unwrap()).unwrap(), path);
    }

    #[test]
    fn test_process_id() {
        assert!(validate_process_id("pebble").is_ok());
        assert!(validate_process_id("pebble.pid").is_ok());
        assert!(validate_process_id("").is_err());
        assert!(validate_process_id("../pebble").is_err());
    }
}
