//! Paths bound to a [`FileOperations`] backend.
//!
//! A [`BoundPath`] behaves like a POSIX path with a handful of
//! filesystem methods, where every filesystem access goes through the
//! backend it was created with. The same code can then operate on the
//! host (`BoundPath::local`) or inside a workload container
//! (`BoundPath::container`).

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use fileops_common::{Error, FileInfo, FileType, PathError, Result};

use crate::container::ContainerFileOps;
use crate::local::LocalFileOps;
use crate::options::{ListOptions, MakeDirOptions, PushOptions};
use crate::protocol::FileOperations;

#[derive(Clone)]
pub struct BoundPath {
    path: String,
    backend: Arc<dyn FileOperations>,
}

/// Collapse repeated separators and `.` components.
fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let parts: Vec<&str> = path
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();
    match (absolute, parts.is_empty()) {
        (true, _) => format!("/{}", parts.join("/")),
        (false, true) => ".".to_string(),
        (false, false) => parts.join("/"),
    }
}

impl BoundPath {
    pub fn new(path: impl AsRef<str>, backend: Arc<dyn FileOperations>) -> Self {
        Self {
            path: normalize(path.as_ref()),
            backend,
        }
    }

    /// A path on the host filesystem.
    pub fn local(path: impl AsRef<str>) -> Self {
        Self::new(path, Arc::new(LocalFileOps::new()))
    }

    /// A path inside the container served by `container`.
    pub fn container(path: impl AsRef<str>, container: Arc<ContainerFileOps>) -> Self {
        Self::new(path, container)
    }

    fn with_path(&self, path: impl AsRef<str>) -> Self {
        Self::new(path, self.backend.clone())
    }

    pub fn backend(&self) -> &Arc<dyn FileOperations> {
        &self.backend
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.path)
    }

    pub fn is_absolute(&self) -> bool {
        self.path.starts_with('/')
    }

    pub fn join(&self, other: impl AsRef<str>) -> Self {
        let other = other.as_ref();
        if other.starts_with('/') || self.path == "." {
            self.with_path(other)
        } else {
            self.with_path(format!("{}/{}", self.path, other))
        }
    }

    pub fn parent(&self) -> Self {
        match self.path.rsplit_once('/') {
            Some(("", _)) => self.with_path("/"),
            Some((parent, _)) => self.with_path(parent),
            None => self.with_path("."),
        }
    }

    /// Final component; empty for `/` and `.`.
    pub fn name(&self) -> &str {
        match self.path.rsplit_once('/') {
            Some((_, name)) => name,
            None if self.path == "." => "",
            None => &self.path,
        }
    }

    /// Final component's extension including the dot (`.txt`), or empty.
    pub fn suffix(&self) -> &str {
        let name = self.name();
        match name.rfind('.') {
            Some(index) if index > 0 && index < name.len() - 1 => &name[index..],
            _ => "",
        }
    }

    pub fn stem(&self) -> &str {
        let name = self.name();
        &name[..name.len() - self.suffix().len()]
    }

    pub fn with_name(&self, name: &str) -> Self {
        self.parent().join(name)
    }

    pub fn with_suffix(&self, suffix: &str) -> Self {
        self.with_name(&format!("{}{}", self.stem(), suffix))
    }

    /// This path relative to `base`, or `None` if it isn't below `base`.
    pub fn relative_to(&self, base: impl AsRef<str>) -> Option<Self> {
        let base = normalize(base.as_ref());
        if base == self.path {
            return Some(self.with_path("."));
        }
        let prefix = if base.ends_with('/') {
            base
        } else {
            format!("{}/", base)
        };
        self.path
            .strip_prefix(&prefix)
            .map(|rest| self.with_path(rest))
    }

    pub async fn read_bytes(&self) -> Result<Vec<u8>> {
        self.backend.pull(&self.path).await
    }

    pub async fn read_text(&self) -> Result<String> {
        self.backend.pull_text(&self.path).await
    }

    /// Write `data`, returning the number of bytes written.
    pub async fn write_bytes(&self, data: &[u8], options: &PushOptions) -> Result<usize> {
        self.backend.push(&self.path, data, options).await?;
        Ok(data.len())
    }

    pub async fn write_text(&self, data: &str, options: &PushOptions) -> Result<usize> {
        self.write_bytes(data.as_bytes(), options).await
    }

    /// Create this directory.
    ///
    /// Without `exist_ok` an existing path is an error even when
    /// `parents` is set.
    pub async fn mkdir(&self, parents: bool, exist_ok: bool, options: &MakeDirOptions) -> Result<()> {
        if parents && !exist_ok && self.exists().await? {
            return Err(PathError::file_exists(&self.path, "mkdir").into());
        }
        let options = options.clone().make_parents(parents);
        match self.backend.make_dir(&self.path, &options).await {
            Err(e) if exist_ok && e.is_file_exists() && self.is_dir().await? => Ok(()),
            other => other,
        }
    }

    /// Remove this directory, which must be empty.
    pub async fn rmdir(&self) -> Result<()> {
        if !self.is_dir().await? {
            return Err(Error::not_a_directory(&self.path));
        }
        self.backend.remove_path(&self.path, false).await
    }

    /// Remove this file or symlink.
    pub async fn unlink(&self, missing_ok: bool) -> Result<()> {
        if self.is_dir().await? {
            return Err(Error::is_a_directory(&self.path));
        }
        match self.backend.remove_path(&self.path, false).await {
            Err(e) if missing_ok && e.is_path_not_found() => Ok(()),
            other => other,
        }
    }

    /// Entries of this directory, in no particular order.
    pub async fn iterdir(&self) -> Result<Vec<BoundPath>> {
        if !self.is_dir().await? {
            return Err(Error::not_a_directory(&self.path));
        }
        let entries = self.backend.list_files(&self.path, &ListOptions::new()).await?;
        Ok(entries.into_iter().map(|info| self.with_path(info.path)).collect())
    }

    pub async fn exists(&self) -> Result<bool> {
        self.backend.exists(&self.path).await
    }

    pub async fn is_dir(&self) -> Result<bool> {
        self.backend.is_dir(&self.path).await
    }

    /// Metadata for this path, without following symlinks.
    pub async fn info(&self) -> Result<FileInfo> {
        let mut infos = self
            .backend
            .list_files(&self.path, &ListOptions::new().itself())
            .await?;
        infos
            .pop()
            .ok_or_else(|| Error::protocol(format!("no file info returned for {}", self.path)))
    }

    async fn file_type(&self) -> Result<Option<FileType>> {
        match self.info().await {
            Ok(info) => Ok(Some(info.file_type)),
            Err(e) if e.is_api_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn is_file(&self) -> Result<bool> {
        Ok(self.file_type().await? == Some(FileType::File))
    }

    pub async fn is_symlink(&self) -> Result<bool> {
        Ok(self.file_type().await? == Some(FileType::Symlink))
    }

    pub async fn is_socket(&self) -> Result<bool> {
        Ok(self.file_type().await? == Some(FileType::Socket))
    }

    pub async fn is_fifo(&self) -> Result<bool> {
        Ok(self.file_type().await? == Some(FileType::NamedPipe))
    }

    /// Name of the owning user.
    pub async fn owner(&self) -> Result<String> {
        let info = self.info().await?;
        info.user.ok_or_else(|| {
            PathError::lookup(&self.path, "owner", format!("unknown user id {:?}", info.user_id)).into()
        })
    }

    /// Name of the owning group.
    pub async fn group(&self) -> Result<String> {
        let info = self.info().await?;
        info.group.ok_or_else(|| {
            PathError::lookup(&self.path, "group", format!("unknown group id {:?}", info.group_id)).into()
        })
    }
}

impl fmt::Display for BoundPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl fmt::Debug for BoundPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundPath")
            .field("backend", &self.backend.name())
            .field("path", &self.path)
            .finish()
    }
}

impl PartialEq for BoundPath {
    fn eq(&self, other: &Self) -> bool {
        self.backend.name() == other.backend.name() && self.path == other.path
    }
}

impl Eq for BoundPath {}

impl Hash for BoundPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.backend.name().hash(state);
        self.path.hash(state);
    }
}

impl PartialOrd for BoundPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BoundPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.backend
            .name()
            .cmp(other.backend.name())
            .then_with(|| self.path.cmp(&other.path))
    }
}
