//! Core domain types used throughout the workspace.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The type of a filesystem entry, as Pebble reports it.
///
/// Block and character devices are both reported as [`FileType::Device`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileType {
    File,
    Directory,
    Symlink,
    Socket,
    NamedPipe,
    Device,
    #[serde(other)]
    Unknown,
}

impl FileType {
    /// Returns the wire name of the file type.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::File => "file",
            FileType::Directory => "directory",
            FileType::Symlink => "symlink",
            FileType::Socket => "socket",
            FileType::NamedPipe => "named-pipe",
            FileType::Device => "device",
            FileType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata for a single filesystem entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileInfo {
    /// Full path of the entry.
    pub path: String,
    /// Final path component.
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    /// Size in bytes; only set for regular files.
    pub size: Option<u64>,
    /// Permission bits (`mode & 0o7777`).
    pub permissions: u32,
    pub last_modified: DateTime<FixedOffset>,
    pub user_id: Option<u32>,
    pub user: Option<String>,
    pub group_id: Option<u32>,
    pub group: Option<String>,
}

impl FileInfo {
    /// Compares every attribute except `last_modified`.
    ///
    /// Two listings of the same tree taken through different backends
    /// are expected to agree on everything but modification time.
    pub fn same_attributes(&self, other: &FileInfo) -> bool {
        self.path == other.path
            && self.name == other.name
            && self.file_type == other.file_type
            && self.size == other.size
            && self.permissions == other.permissions
            && self.user_id == other.user_id
            && self.user == other.user
            && self.group_id == other.group_id
            && self.group == other.group
    }

    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }
}

/// Requested owner for a created file or directory.
///
/// Any combination may be set; the backends validate the combination
/// before touching the filesystem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ownership {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl Ownership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_user_id(mut self, user_id: u32) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_group_id(mut self, group_id: u32) -> Self {
        self.group_id = Some(group_id);
        self
    }

    /// True if no owner was requested at all.
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.user.is_none() && self.group_id.is_none() && self.group.is_none()
    }
}
