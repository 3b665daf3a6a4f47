//! Build [`FileInfo`] from the host filesystem.

use std::fs;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::Path;

use chrono::{DateTime, Local};
use fileops_common::{FileInfo, FileType};
use nix::unistd::{Gid, Group, Uid, User};

/// Describe `path` without following symlinks, the way Pebble does.
pub fn from_path(path: &Path) -> std::io::Result<FileInfo> {
    let metadata = fs::symlink_metadata(path)?;
    let file_type = file_type_of(metadata.file_type());

    Ok(FileInfo {
        path: path.to_string_lossy().into_owned(),
        name: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        file_type,
        size: (file_type == FileType::File).then(|| metadata.len()),
        permissions: metadata.mode() & 0o7777,
        last_modified: modified_at(metadata.mtime()),
        user_id: Some(metadata.uid()),
        user: user_name(metadata.uid()),
        group_id: Some(metadata.gid()),
        group: group_name(metadata.gid()),
    })
}

pub(crate) fn file_type_of(file_type: fs::FileType) -> FileType {
    if file_type.is_symlink() {
        FileType::Symlink
    } else if file_type.is_file() {
        FileType::File
    } else if file_type.is_dir() {
        FileType::Directory
    } else if file_type.is_socket() {
        FileType::Socket
    } else if file_type.is_fifo() {
        FileType::NamedPipe
    } else if file_type.is_block_device() || file_type.is_char_device() {
        FileType::Device
    } else {
        FileType::Unknown
    }
}

/// Whole seconds, in the host's current UTC offset.
fn modified_at(seconds: i64) -> DateTime<chrono::FixedOffset> {
    let offset = *Local::now().offset();
    DateTime::from_timestamp(seconds, 0)
        .unwrap_or_default()
        .with_timezone(&offset)
}

pub(crate) fn user_name(uid: u32) -> Option<String> {
    User::from_uid(Uid::from_raw(uid)).ok().flatten().map(|u| u.name)
}

pub(crate) fn group_name(gid: u32) -> Option<String> {
    Group::from_gid(Gid::from_raw(gid)).ok().flatten().map(|g| g.name)
}
