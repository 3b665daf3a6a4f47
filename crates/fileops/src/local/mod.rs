//! Host filesystem backend.
//!
//! Reproduces what Pebble does for each files API call, including its
//! error kinds and messages, so tests written against [`LocalFileOps`]
//! behave the same against a real container.

pub mod chown;
pub mod fileinfo;
pub mod pattern;

use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fileops_common::{ApiError, Error, FileInfo, Ownership, PathError, Result};
use nix::errno::Errno;
use nix::unistd::{access, AccessFlags};
use tracing::debug;

use crate::options::{ListOptions, MakeDirOptions, PushOptions, DEFAULT_DIR_MODE};
use crate::protocol::FileOperations;
use chown::ChownPlan;
use pattern::Pattern;

/// Backend name reported by [`LocalFileOps`].
pub const LOCAL_BACKEND_NAME: &str = "local";

/// [`FileOperations`] on the host filesystem.
#[derive(Debug, Clone, Default)]
pub struct LocalFileOps;

impl LocalFileOps {
    pub fn new() -> Self {
        Self
    }
}

/// Run blocking filesystem work off the async runtime.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::Other, e)))?
}

fn absolute(path: &str) -> Result<PathBuf> {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        Ok(path)
    } else {
        Err(PathError::relative_path(path.display()).into())
    }
}

#[async_trait]
impl FileOperations for LocalFileOps {
    fn name(&self) -> &str {
        LOCAL_BACKEND_NAME
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let path = absolute(path)?;
        blocking(move || Ok(path.exists())).await
    }

    async fn is_dir(&self, path: &str) -> Result<bool> {
        let path = absolute(path)?;
        blocking(move || Ok(path.is_dir())).await
    }

    async fn list_files(&self, path: &str, options: &ListOptions) -> Result<Vec<FileInfo>> {
        let path = absolute(path)?;
        let options = options.clone();
        blocking(move || list_files(&path, &options)).await
    }

    async fn make_dir(&self, path: &str, options: &MakeDirOptions) -> Result<()> {
        let path = absolute(path)?;
        let options = options.clone();
        blocking(move || {
            make_dir(&path, options.mode(), options.make_parents, &options.owner)
        })
        .await
    }

    async fn push(&self, path: &str, data: &[u8], options: &PushOptions) -> Result<()> {
        let path = absolute(path)?;
        let data = data.to_vec();
        let options = options.clone();
        blocking(move || push(&path, &data, &options)).await
    }

    async fn pull(&self, path: &str) -> Result<Vec<u8>> {
        let path = absolute(path)?;
        blocking(move || pull(&path)).await
    }

    async fn push_path(&self, sources: &[PathBuf], dest_dir: &str) -> Result<()> {
        let sources = sources.to_vec();
        let dest_dir = PathBuf::from(dest_dir);
        blocking(move || {
            let dest = dest_dir.to_string_lossy().into_owned();
            let prepared = absolute(&dest).and_then(|dest_dir| {
                make_dir(&dest_dir, DEFAULT_DIR_MODE, true, &Ownership::default())
            });
            if let Err(e) = prepared {
                return Err(Error::multi_path("push", vec![(dest, e)]));
            }

            let errors: Vec<(String, Error)> = sources
                .iter()
                .filter_map(|source| {
                    copy_into(source, &dest_dir)
                        .err()
                        .map(|e| (source.display().to_string(), e))
                })
                .collect();
            if errors.is_empty() {
                Ok(())
            } else {
                Err(Error::multi_path("push", errors))
            }
        })
        .await
    }

    async fn pull_path(&self, sources: &[String], dest_dir: &Path) -> Result<()> {
        let sources = sources.to_vec();
        let dest_dir = dest_dir.to_path_buf();
        blocking(move || {
            fs::create_dir_all(&dest_dir)?;
            let errors: Vec<(String, Error)> = sources
                .iter()
                .filter_map(|source| {
                    absolute(source)
                        .and_then(|source| copy_into(&source, &dest_dir))
                        .err()
                        .map(|e| (source.clone(), e))
                })
                .collect();
            if errors.is_empty() {
                Ok(())
            } else {
                Err(Error::multi_path("pull", errors))
            }
        })
        .await
    }

    async fn remove_path(&self, path: &str, recursive: bool) -> Result<()> {
        let path = absolute(path)?;
        blocking(move || remove_path(&path, recursive)).await
    }
}

fn list_files(path: &Path, options: &ListOptions) -> Result<Vec<FileInfo>> {
    if !path.exists() {
        return Err(ApiError::file_not_found(path.display()).into());
    }

    let candidates: Vec<PathBuf> = if options.itself || !path.is_dir() {
        vec![path.to_path_buf()]
    } else {
        fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<io::Result<_>>()?
    };

    let candidates = match &options.pattern {
        // Only validated when there is something to match against
        Some(pattern) if !candidates.is_empty() => {
            let compiled = Pattern::new(pattern).map_err(|_| {
                ApiError::bad_request(
                    path.display(),
                    format!("syntax error in pattern \"{}\"", pattern),
                )
            })?;
            candidates
                .into_iter()
                .filter(|p| {
                    p.file_name()
                        .map_or(false, |name| compiled.matches(&name.to_string_lossy()))
                })
                .collect()
        }
        _ => candidates,
    };

    candidates
        .iter()
        .map(|p| fileinfo::from_path(p).map_err(Error::from))
        .collect()
}

enum MkdirFailure {
    NotFound,
    Permission(io::Error),
    Other(io::Error),
}

fn try_make_dir(path: &Path, mode: u32) -> std::result::Result<(), MkdirFailure> {
    fs::create_dir(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => MkdirFailure::NotFound,
        io::ErrorKind::PermissionDenied => MkdirFailure::Permission(e),
        _ => MkdirFailure::Other(e),
    })?;
    // Explicit chmod so the umask doesn't apply
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(MkdirFailure::Other)
}

fn permission_detail(e: &io::Error) -> String {
    e.raw_os_error()
        .map(|code| Errno::from_raw(code).desc().to_lowercase())
        .unwrap_or_else(|| e.to_string())
}

/// Create `path` with `mode`, optionally creating parents with the same
/// mode and owner.
fn make_dir(path: &Path, mode: u32, make_parents: bool, owner: &Ownership) -> Result<()> {
    let plan = ChownPlan::validate(path, owner, "mkdir")?;
    let shown = path.display();

    match try_make_dir(path, mode) {
        Ok(()) => {}
        Err(MkdirFailure::NotFound) => {
            let parent = match path.parent() {
                Some(parent) if make_parents && parent != path => parent,
                _ => return Err(PathError::file_not_found(&shown, "mkdir").into()),
            };
            make_dir(parent, mode, true, owner)?;
            match try_make_dir(path, mode) {
                Ok(()) => {}
                Err(MkdirFailure::NotFound) => {
                    return Err(PathError::file_not_found(&shown, "mkdir").into())
                }
                Err(MkdirFailure::Permission(e)) => {
                    return Err(PathError::permission(&shown, "mkdir", permission_detail(&e)).into())
                }
                Err(MkdirFailure::Other(e)) => {
                    return Err(PathError::generic(&shown, "mkdir", e).into())
                }
            }
            if access(parent, AccessFlags::R_OK).is_err() {
                return Err(PathError::permission(
                    &shown,
                    "mkdir",
                    format!(
                        "cannot read: {} (created via make_parents/make_dirs)",
                        parent.display()
                    ),
                )
                .into());
            }
        }
        Err(MkdirFailure::Permission(e)) => {
            return Err(PathError::permission(&shown, "mkdir", permission_detail(&e)).into());
        }
        Err(MkdirFailure::Other(_)) => {
            // Existing directories are left untouched with make_parents
            if make_parents && path.is_dir() {
                return Ok(());
            }
            return Err(PathError::file_exists(&shown, "mkdir").into());
        }
    }

    plan.apply(path, "mkdir").map_err(|e| {
        let _ = fs::remove_dir(path);
        e
    })?;
    debug!("Created directory {} ({:o})", path.display(), mode);
    Ok(())
}

fn push(path: &Path, data: &[u8], options: &PushOptions) -> Result<()> {
    let shown = path.display();

    if options.make_dirs {
        if let Some(parent) = path.parent() {
            make_dir(parent, DEFAULT_DIR_MODE, true, &options.owner)?;
        }
    }

    let plan = ChownPlan::validate(path, &options.owner, "push")?;

    // Owner-only permissions while the content is being written
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map_err(|e| -> Error {
            match e.kind() {
                io::ErrorKind::NotFound => PathError::file_not_found(&shown, "open").into(),
                io::ErrorKind::PermissionDenied => {
                    PathError::permission(&shown, "open", permission_detail(&e)).into()
                }
                _ => PathError::generic(&shown, "open", e).into(),
            }
        })?;
    file.write_all(data)?;
    file.flush()?;
    drop(file);

    plan.apply(path, "push")?;
    fs::set_permissions(path, fs::Permissions::from_mode(options.mode()))?;
    Ok(())
}

fn pull(path: &Path) -> Result<Vec<u8>> {
    let shown = path.display();
    let metadata = fs::metadata(path).map_err(|e| -> Error {
        match e.kind() {
            io::ErrorKind::NotFound => PathError::file_not_found(&shown, "stat").into(),
            io::ErrorKind::PermissionDenied => {
                PathError::permission(&shown, "stat", permission_detail(&e)).into()
            }
            _ => Error::Io(e),
        }
    })?;
    if !metadata.is_file() {
        return Err(PathError::generic(&shown, "read", "can only read a regular file").into());
    }
    fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::PermissionDenied => {
            PathError::permission(&shown, "open", permission_detail(&e)).into()
        }
        _ => Error::Io(e),
    })
}

fn remove_path(path: &Path, recursive: bool) -> Result<()> {
    let shown = path.display();
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(PathError::file_not_found(&shown, "remove").into())
        }
        Err(e) => return Err(e.into()),
    };

    let result = if metadata.is_dir() {
        match fs::remove_dir(path) {
            Err(e) if e.raw_os_error() == Some(Errno::ENOTEMPTY as i32) => {
                if !recursive {
                    return Err(PathError::generic(&shown, "remove", "directory not empty").into());
                }
                fs::remove_dir_all(path)
            }
            other => other,
        }
    } else {
        fs::remove_file(path)
    };

    result.map_err(|e| -> Error {
        match e.kind() {
            io::ErrorKind::PermissionDenied => {
                PathError::permission(&shown, "remove", permission_detail(&e)).into()
            }
            _ => PathError::generic(&shown, "remove", e).into(),
        }
    })
}

/// Copy a file or a whole tree to `dest_dir/<name of source>`.
pub(crate) fn copy_into(source: &Path, dest_dir: &Path) -> Result<()> {
    let name = source
        .file_name()
        .ok_or_else(|| PathError::generic(source.display(), "copy", "path has no file name"))?;
    let target = dest_dir.join(name);

    let metadata = fs::metadata(source).map_err(|e| -> Error {
        if e.kind() == io::ErrorKind::NotFound {
            PathError::file_not_found(source.display(), "stat").into()
        } else {
            e.into()
        }
    })?;
    if !metadata.is_dir() {
        fs::copy(source, &target)?;
        return Ok(());
    }

    for entry in walkdir::WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(|e| Error::Io(io::Error::from(e)))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::Other, e)))?;
        let destination = target.join(relative);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&destination)?;
            let mode = entry.metadata().map_err(|e| Error::Io(io::Error::from(e)))?.permissions();
            fs::set_permissions(&destination, mode)?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            std::os::unix::fs::symlink(link, &destination)?;
        } else {
            fs::copy(entry.path(), &destination)?;
        }
    }
    Ok(())
}
