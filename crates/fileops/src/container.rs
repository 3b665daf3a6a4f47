//! [`FileOperations`] backed by a Pebble daemon.

use std::collections::VecDeque;
use std::fs::Permissions;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fileops_common::{Error, FileInfo, PathError, Result, ResultExt};
use tracing::debug;

use crate::local::blocking;
use crate::options::{ListOptions, MakeDirOptions, PushOptions};
use crate::pebble::PebbleClient;
use crate::protocol::FileOperations;

/// Files inside a workload container, reached through its Pebble daemon.
#[derive(Debug, Clone)]
pub struct ContainerFileOps {
    name: String,
    client: PebbleClient,
}

impl ContainerFileOps {
    pub fn new(name: impl Into<String>, client: PebbleClient) -> Self {
        Self {
            name: name.into(),
            client,
        }
    }

    /// Connect to the daemon located by `PEBBLE_SOCKET` or `$PEBBLE`.
    pub fn from_env(name: impl Into<String>) -> Result<Self> {
        Ok(Self::new(name, PebbleClient::from_env()?))
    }

    pub fn client(&self) -> &PebbleClient {
        &self.client
    }

    /// Metadata for `path` itself, or `None` if nothing is there.
    async fn stat(&self, path: &str) -> Result<Option<FileInfo>> {
        match self.client.list_files(path, None, true).await {
            Ok(mut infos) => Ok(infos.pop()),
            Err(e) if e.is_api_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn push_one(&self, source: &Path, dest_dir: &str) -> Result<()> {
        let name = source
            .file_name()
            .ok_or_else(|| PathError::generic(source.display(), "copy", "path has no file name"))?;
        let target = join(dest_dir, &name.to_string_lossy());

        let metadata = tokio::fs::metadata(source).await.map_err(|e| -> Error {
            if e.kind() == io::ErrorKind::NotFound {
                PathError::file_not_found(source.display(), "stat").into()
            } else {
                e.into()
            }
        })?;
        if !metadata.is_dir() {
            let data = tokio::fs::read(source).await?;
            let options = PushOptions::new()
                .make_dirs(true)
                .with_permissions(metadata.permissions().mode() & 0o777);
            return self.client.push(&target, &data, &options).await;
        }

        let root = source.to_path_buf();
        for entry in blocking(move || walk_tree(&root)).await? {
            let destination = if entry.relative.as_os_str().is_empty() {
                target.clone()
            } else {
                join(&target, &entry.relative.to_string_lossy())
            };
            match entry.kind {
                EntryKind::Directory => {
                    let options = MakeDirOptions::new().make_parents(true).with_permissions(entry.mode);
                    self.client.make_dir(&destination, &options).await?;
                }
                EntryKind::File => {
                    let data = tokio::fs::read(&entry.path).await?;
                    let options = PushOptions::new().make_dirs(true).with_permissions(entry.mode);
                    self.client.push(&destination, &data, &options).await?;
                }
                EntryKind::Other => {
                    debug!("Skipping {}: not a regular file or directory", entry.path.display());
                }
            }
        }
        Ok(())
    }

    async fn pull_one(&self, source: &str, dest_dir: &Path) -> Result<()> {
        check_absolute(source)?;
        let info = self
            .stat(source)
            .await?
            .ok_or_else(|| Error::from(PathError::file_not_found(source, "stat")))?;
        let target = dest_dir.join(&info.name);

        if !info.is_dir() {
            return self.pull_file(&info, &target).await;
        }

        create_local_dir(&target, info.permissions).await?;
        let mut pending = VecDeque::from([(info.path.clone(), target)]);
        while let Some((remote, local)) = pending.pop_front() {
            for entry in self.client.list_files(&remote, None, false).await? {
                let local_entry = local.join(&entry.name);
                if entry.is_dir() {
                    create_local_dir(&local_entry, entry.permissions).await?;
                    pending.push_back((entry.path.clone(), local_entry));
                } else if entry.is_file() {
                    self.pull_file(&entry, &local_entry).await?;
                } else {
                    debug!("Skipping {}: {}", entry.path, entry.file_type);
                }
            }
        }
        Ok(())
    }

    async fn pull_file(&self, info: &FileInfo, target: &Path) -> Result<()> {
        let data = self.client.pull(&info.path).await?;
        write_local_file(target, &data, info.permissions)
            .await
            .map_err(Error::from)
            .context(format!("write {}", target.display()))
    }
}

fn check_absolute(path: &str) -> Result<()> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(PathError::relative_path(path).into())
    }
}

fn join(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Directory,
    File,
    Other,
}

/// One entry of a local tree, relative to the tree's root.
#[derive(Debug)]
struct TreeEntry {
    path: PathBuf,
    relative: PathBuf,
    mode: u32,
    kind: EntryKind,
}

/// List a local tree, parents before children, without following links.
fn walk_tree(root: &Path) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();
    for entry in walkdir::WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::Other, e)))?
            .to_path_buf();
        let mode = entry.metadata().map_err(|e| Error::Io(e.into()))?.permissions().mode() & 0o777;
        let kind = if entry.file_type().is_dir() {
            EntryKind::Directory
        } else if entry.file_type().is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        };
        entries.push(TreeEntry {
            path: entry.into_path(),
            relative,
            mode,
            kind,
        });
    }
    Ok(entries)
}

async fn write_local_file(path: &Path, data: &[u8], mode: u32) -> io::Result<()> {
    tokio::fs::write(path, data).await?;
    tokio::fs::set_permissions(path, Permissions::from_mode(mode)).await
}

async fn make_local_dir(path: &Path, mode: u32) -> io::Result<()> {
    tokio::fs::create_dir_all(path).await?;
    tokio::fs::set_permissions(path, Permissions::from_mode(mode)).await
}

async fn create_local_dir(path: &Path, mode: u32) -> Result<()> {
    make_local_dir(path, mode)
        .await
        .map_err(Error::from)
        .context(format!("create {}", path.display()))
}

#[async_trait]
impl FileOperations for ContainerFileOps {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        check_absolute(path)?;
        Ok(self.stat(path).await?.is_some())
    }

    async fn is_dir(&self, path: &str) -> Result<bool> {
        check_absolute(path)?;
        Ok(self.stat(path).await?.map_or(false, |info| info.is_dir()))
    }

    async fn list_files(&self, path: &str, options: &ListOptions) -> Result<Vec<FileInfo>> {
        check_absolute(path)?;
        self.client
            .list_files(path, options.pattern.as_deref(), options.itself)
            .await
    }

    async fn make_dir(&self, path: &str, options: &MakeDirOptions) -> Result<()> {
        check_absolute(path)?;
        self.client.make_dir(path, options).await
    }

    async fn push(&self, path: &str, data: &[u8], options: &PushOptions) -> Result<()> {
        check_absolute(path)?;
        self.client.push(path, data, options).await
    }

    async fn pull(&self, path: &str) -> Result<Vec<u8>> {
        check_absolute(path)?;
        self.client.pull(path).await
    }

    async fn push_path(&self, sources: &[PathBuf], dest_dir: &str) -> Result<()> {
        let prepared = match check_absolute(dest_dir) {
            Ok(()) => {
                self.client
                    .make_dir(dest_dir, &MakeDirOptions::new().make_parents(true))
                    .await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = prepared {
            return Err(Error::multi_path("push", vec![(dest_dir.to_string(), e)]));
        }

        let mut errors = Vec::new();
        for source in sources {
            if let Err(e) = self.push_one(source, dest_dir).await {
                errors.push((source.display().to_string(), e));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::multi_path("push", errors))
        }
    }

    async fn pull_path(&self, sources: &[String], dest_dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dest_dir).await?;
        let mut errors = Vec::new();
        for source in sources {
            if let Err(e) = self.pull_one(source, dest_dir).await {
                errors.push((source.clone(), e));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::multi_path("pull", errors))
        }
    }

    async fn remove_path(&self, path: &str, recursive: bool) -> Result<()> {
        check_absolute(path)?;
        self.client.remove_path(path, recursive).await
    }
}
