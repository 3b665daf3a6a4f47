//! Error types for file operations and the test fixture.
//!
//! File operation errors follow the two shapes the Pebble files API uses on
//! the wire, so callers get the same error whether a call went to a
//! container or was served from the local filesystem:
//!
//! - [`ApiError`]: the whole request failed (bad pattern, listing a path
//!   that doesn't exist).
//! - [`PathError`]: a single path in the request failed, tagged with a
//!   `kind` such as `not-found` or `permission-denied`.
//!
//! ```rust
//! use fileops_common::{Error, PathError, Result};
//!
//! fn remove(path: &str) -> Result<()> {
//!     Err(PathError::file_not_found(path, "remove").into())
//! }
//!
//! let err = remove("/nope").unwrap_err();
//! assert!(err.is_path_not_found());
//! assert_eq!(err.to_string(), "not-found - remove /nope: no such file or directory");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for file operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The `kind` tag Pebble attaches to per-path errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PathErrorKind {
    /// `not-found`
    NotFound,
    /// `permission-denied`
    PermissionDenied,
    /// `generic-file-error`
    GenericFileError,
    /// Any kind this crate doesn't classify.
    Other(String),
}

impl PathErrorKind {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            PathErrorKind::NotFound => "not-found",
            PathErrorKind::PermissionDenied => "permission-denied",
            PathErrorKind::GenericFileError => "generic-file-error",
            PathErrorKind::Other(kind) => kind,
        }
    }
}

impl From<&str> for PathErrorKind {
    fn from(s: &str) -> Self {
        match s {
            "not-found" => PathErrorKind::NotFound,
            "permission-denied" => PathErrorKind::PermissionDenied,
            "generic-file-error" => PathErrorKind::GenericFileError,
            other => PathErrorKind::Other(other.to_string()),
        }
    }
}

impl From<String> for PathErrorKind {
    fn from(s: String) -> Self {
        PathErrorKind::from(s.as_str())
    }
}

impl From<PathErrorKind> for String {
    fn from(kind: PathErrorKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for PathErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed request, as reported in a Pebble error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    /// HTTP status code (`400`, `404`, ...).
    pub code: u16,
    /// HTTP status text (`Bad Request`, `Not Found`, ...).
    pub status: String,
    /// Human readable message.
    pub message: String,
    /// The `kind` from the envelope's result, when present.
    pub kind: Option<PathErrorKind>,
}

impl ApiError {
    /// Creates an error from the fields of a Pebble error envelope.
    pub fn new(
        code: u16,
        status: impl Into<String>,
        message: impl Into<String>,
        kind: Option<PathErrorKind>,
    ) -> Self {
        Self {
            code,
            status: status.into(),
            message: message.into(),
            kind,
        }
    }

    /// Creates a `400 Bad Request` error for `path`.
    pub fn bad_request(path: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::new(
            400,
            "Bad Request",
            format!("{}: {}", path, message),
            Some(PathErrorKind::GenericFileError),
        )
    }

    /// Creates the `404 Not Found` error Pebble returns when listing a
    /// missing path.
    pub fn file_not_found(path: impl fmt::Display) -> Self {
        Self::new(
            404,
            "Not Found",
            format!("stat {}: no such file or directory", path),
            Some(PathErrorKind::NotFound),
        )
    }
}

/// A failure for a single path within a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} - {message}")]
pub struct PathError {
    pub kind: PathErrorKind,
    pub message: String,
}

impl PathError {
    pub fn new(kind: impl Into<PathErrorKind>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// `{method} {path}: file exists`
    pub fn file_exists(path: impl fmt::Display, method: &str) -> Self {
        Self::new(
            PathErrorKind::GenericFileError,
            format!("{} {}: file exists", method, path),
        )
    }

    /// Rejection of a relative path.
    pub fn relative_path(path: impl fmt::Display) -> Self {
        Self::new(
            PathErrorKind::GenericFileError,
            format!("paths must be absolute, got \"{}\"", path),
        )
    }

    /// `{method} {path}: no such file or directory`
    pub fn file_not_found(path: impl fmt::Display, method: &str) -> Self {
        Self::new(
            PathErrorKind::NotFound,
            format!("{} {}: no such file or directory", method, path),
        )
    }

    /// A user or group name that couldn't be resolved.
    pub fn lookup(path: impl fmt::Display, method: &str, detail: impl fmt::Display) -> Self {
        Self::new(
            PathErrorKind::GenericFileError,
            format!("{} {}: {}", method, path, detail),
        )
    }

    /// The caller isn't allowed to do what was asked.
    pub fn permission(path: impl fmt::Display, method: &str, detail: impl fmt::Display) -> Self {
        Self::new(
            PathErrorKind::PermissionDenied,
            format!("{} {}: {}", method, path, detail),
        )
    }

    /// Any other failure, tagged `generic-file-error`.
    pub fn generic(path: impl fmt::Display, method: &str, message: impl fmt::Display) -> Self {
        Self::new(
            PathErrorKind::GenericFileError,
            format!("{} {}: {}", method, path, message),
        )
    }

    fn is_generic_kind(&self) -> bool {
        self.kind == PathErrorKind::GenericFileError
    }

    pub fn is_file_exists(&self) -> bool {
        self.is_generic_kind() && self.message.contains("file exists")
    }

    pub fn is_relative_path(&self) -> bool {
        self.is_generic_kind() && self.message.contains("paths must be absolute")
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == PathErrorKind::NotFound
    }

    pub fn is_lookup(&self) -> bool {
        self.is_generic_kind()
            && (self.message.contains("unknown user")
                || self.message.contains("unknown group")
                || self.message.contains("name not found"))
    }

    pub fn is_permission(&self) -> bool {
        self.kind == PathErrorKind::PermissionDenied
    }

    /// A `generic-file-error` that isn't one of the more specific cases
    /// sharing that kind.
    pub fn is_generic(&self) -> bool {
        self.is_generic_kind()
            && !self.is_file_exists()
            && !self.is_relative_path()
            && !self.is_lookup()
    }
}

/// Main error type for file operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The whole request failed.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// A single path failed.
    #[error("{0}")]
    Path(#[from] PathError),

    /// One or more paths of a `push_path`/`pull_path` batch failed.
    #[error("{action} failed for {} path(s): {}", .errors.len(), describe_failures(.errors))]
    MultiPath {
        action: String,
        errors: Vec<(String, Error)>,
    },

    #[error("Not a directory: {path}")]
    NotADirectory { path: String },

    #[error("Is a directory: {path}")]
    IsADirectory { path: String },

    /// File contents weren't valid UTF-8.
    #[error("Cannot decode {path} as UTF-8: {reason}")]
    Decode { path: String, reason: String },

    /// Couldn't reach the Pebble daemon.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Pebble answered with something this client doesn't understand.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// I/O error (wraps std::io::Error).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context.
    #[error("{message}: {source}")]
    WithContext {
        message: String,
        source: Box<Error>,
    },
}

fn describe_failures(errors: &[(String, Error)]) -> String {
    errors
        .iter()
        .map(|(path, err)| format!("{}: {}", path, err))
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    pub fn multi_path(action: impl Into<String>, errors: Vec<(String, Error)>) -> Self {
        Self::MultiPath {
            action: action.into(),
            errors,
        }
    }

    pub fn not_a_directory(path: impl fmt::Display) -> Self {
        Self::NotADirectory {
            path: path.to_string(),
        }
    }

    pub fn is_a_directory(path: impl fmt::Display) -> Self {
        Self::IsADirectory {
            path: path.to_string(),
        }
    }

    pub fn connection(reason: impl Into<String>) -> Self {
        Self::Connection(reason.into())
    }

    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol(reason.into())
    }

    /// Adds context to an error.
    pub fn context(self, message: impl Into<String>) -> Self {
        Self::WithContext {
            message: message.into(),
            source: Box::new(self),
        }
    }

    /// Strips any context wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// The per-path error, if this is one.
    pub fn as_path_error(&self) -> Option<&PathError> {
        match self.root() {
            Error::Path(err) => Some(err),
            _ => None,
        }
    }

    /// The request-level error, if this is one.
    pub fn as_api_error(&self) -> Option<&ApiError> {
        match self.root() {
            Error::Api(err) => Some(err),
            _ => None,
        }
    }

    /// Request rejected with `400 Bad Request`.
    pub fn is_bad_request(&self) -> bool {
        self.as_api_error().map_or(false, |e| e.code == 400)
    }

    /// Request rejected with `404 Not Found`.
    pub fn is_api_not_found(&self) -> bool {
        self.as_api_error().map_or(false, |e| e.code == 404)
    }

    pub fn is_file_exists(&self) -> bool {
        self.as_path_error().map_or(false, PathError::is_file_exists)
    }

    pub fn is_relative_path(&self) -> bool {
        self.as_path_error().map_or(false, PathError::is_relative_path)
    }

    pub fn is_path_not_found(&self) -> bool {
        self.as_path_error().map_or(false, PathError::is_not_found)
    }

    pub fn is_lookup(&self) -> bool {
        self.as_path_error().map_or(false, PathError::is_lookup)
    }

    pub fn is_permission(&self) -> bool {
        self.as_path_error().map_or(false, PathError::is_permission)
    }

    pub fn is_generic(&self) -> bool {
        self.as_path_error().map_or(false, PathError::is_generic)
    }
}

// Convenience methods for Result types
pub trait ResultExt<T> {
    /// Adds context to an error result.
    fn context(self, message: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(message))
    }
}

// ==============================================================================
// Process Errors
// ==============================================================================

/// Errors raised while driving the fixture daemon.
#[derive(Error, Debug, Clone)]
pub enum ProcessError {
    #[error("Process not found: {id}")]
    NotFound { id: String },

    #[error("Process spawn failed: {id} - {reason}")]
    SpawnFailed { id: String, reason: String },

    #[error("Process start failed: {id} - {reason}")]
    StartFailed { id: String, reason: String },

    #[error("Process stop failed: {id} - {reason}")]
    StopFailed { id: String, reason: String },

    #[error("Process configuration error: {id} - {reason}")]
    Configuration { id: String, reason: String },

    #[error("Process health check failed: {id} - {reason}")]
    HealthCheckFailed { id: String, reason: String },
}

impl ProcessError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn spawn_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn start_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StartFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn stop_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StopFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn health_check_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::HealthCheckFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for process operations.
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_error_classification() {
        let exists: Error = PathError::file_exists("/tmp/x", "mkdir").into();
        assert!(exists.is_file_exists());
        assert!(!exists.is_generic());
        assert!(!exists.is_path_not_found());

        let relative: Error = PathError::relative_path("foo").into();
        assert!(relative.is_relative_path());
        assert!(!relative.is_generic());
        assert_eq!(
            relative.to_string(),
            "generic-file-error - paths must be absolute, got \"foo\""
        );

        let lookup: Error = PathError::lookup("/tmp/x", "mkdir", "unknown user \"nobody2\"").into();
        assert!(lookup.is_lookup());
        assert!(!lookup.is_generic());

        let generic: Error = PathError::generic("/tmp/x", "mkdir", "must specify group").into();
        assert!(generic.is_generic());

        let permission: Error = PathError::permission("/tmp/x", "open", "permission denied").into();
        assert!(permission.is_permission());
        assert!(!permission.is_generic());
    }

    #[test]
    fn test_api_error_classification() {
        let bad: Error = ApiError::bad_request("/tmp", "syntax error in pattern \"[foo\"").into();
        assert!(bad.is_bad_request());
        assert!(!bad.is_api_not_found());
        assert_eq!(bad.to_string(), "/tmp: syntax error in pattern \"[foo\"");

        let missing: Error = ApiError::file_not_found("/tmp/missing").into();
        assert!(missing.is_api_not_found());
        assert_eq!(
            missing.to_string(),
            "stat /tmp/missing: no such file or directory"
        );
    }

    #[test]
    fn test_classification_sees_through_context() {
        let err = Error::from(PathError::file_not_found("/a", "stat")).context("pull failed");
        assert!(err.is_path_not_found());
        assert!(err.to_string().contains("pull failed"));
    }

    #[test]
    fn test_multi_path_message() {
        let err = Error::multi_path(
            "push",
            vec![
                ("/a".to_string(), PathError::file_not_found("/a", "stat").into()),
                ("b".to_string(), PathError::relative_path("b").into()),
            ],
        );
        let message = err.to_string();
        assert!(message.starts_with("push failed for 2 path(s)"));
        assert!(message.contains("/a: not-found"));
    }

    #[test]
    fn test_path_error_kind_round_trip() {
        assert_eq!(PathErrorKind::from("not-found"), PathErrorKind::NotFound);
        assert_eq!(
            PathErrorKind::from("weird"),
            PathErrorKind::Other("weird".to_string())
        );
        let json = serde_json::to_string(&PathErrorKind::PermissionDenied).unwrap();
        assert_eq!(json, "\"permission-denied\"");
    }

    #[test]
    fn test_process_error_construction() {
        let error = ProcessError::not_found("pebble");
        assert!(matches!(error, ProcessError::NotFound { .. }));
        assert_eq!(format!("{}", error), "Process not found: pebble");

        let error = ProcessError::spawn_failed("pebble", "executable not found");
        assert!(matches!(error, ProcessError::SpawnFailed { .. }));
        assert!(format!("{}", error).contains("spawn failed"));
    }
}
