//! The operations every backend provides.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fileops_common::{Error, FileInfo, Result};

use crate::options::{ListOptions, MakeDirOptions, PushOptions};

/// File operations with Pebble's semantics.
///
/// Implemented by [`LocalFileOps`](crate::LocalFileOps), which works on
/// the host filesystem, and [`ContainerFileOps`](crate::ContainerFileOps),
/// which talks to a Pebble daemon. Both produce the same results and the
/// same errors for the same calls, so code can be tested locally and run
/// against a container unchanged.
///
/// Paths on the backend side are absolute POSIX paths; relative paths are
/// rejected with [`PathError::relative_path`](fileops_common::PathError::relative_path).
#[async_trait]
pub trait FileOperations: Send + Sync + fmt::Debug {
    /// Name identifying the backend (a container name, or `"local"`).
    fn name(&self) -> &str;

    /// True if anything exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool>;

    /// True if `path` is a directory.
    async fn is_dir(&self, path: &str) -> Result<bool>;

    /// Metadata for `path` itself, or for its entries if it's a directory.
    async fn list_files(&self, path: &str, options: &ListOptions) -> Result<Vec<FileInfo>>;

    async fn make_dir(&self, path: &str, options: &MakeDirOptions) -> Result<()>;

    /// Write `data` to `path`, replacing any existing file.
    async fn push(&self, path: &str, data: &[u8], options: &PushOptions) -> Result<()>;

    /// Read the whole file at `path`.
    async fn pull(&self, path: &str) -> Result<Vec<u8>>;

    /// Read the whole file at `path` as UTF-8.
    async fn pull_text(&self, path: &str) -> Result<String> {
        let data = self.pull(path).await?;
        String::from_utf8(data).map_err(|e| Error::Decode {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Copy local files or trees into `dest_dir/<name>` on the backend.
    async fn push_path(&self, sources: &[PathBuf], dest_dir: &str) -> Result<()>;

    /// Copy backend files or trees into local `dest_dir/<name>`.
    async fn pull_path(&self, sources: &[String], dest_dir: &Path) -> Result<()>;

    async fn remove_path(&self, path: &str, recursive: bool) -> Result<()>;
}
