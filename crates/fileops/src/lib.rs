//! # fileops
//!
//! One file operation API with two interchangeable backends:
//!
//! - [`LocalFileOps`] works on the host filesystem
//! - [`ContainerFileOps`] talks to a Pebble daemon over its HTTP API
//!
//! Both report failures with the same [`Error`] taxonomy, so code written
//! against [`FileOperations`] (or a [`BoundPath`]) behaves identically
//! whichever side of the container boundary it runs on.

pub mod container;
pub mod local;
pub mod options;
pub mod path;
pub mod pebble;
pub mod protocol;

pub use container::ContainerFileOps;
pub use local::LocalFileOps;
pub use options::{ListOptions, MakeDirOptions, PushOptions, DEFAULT_DIR_MODE, DEFAULT_FILE_MODE};
pub use path::BoundPath;
pub use pebble::{PebbleClient, Transport};
pub use protocol::FileOperations;

pub use fileops_common::{ApiError, Error, FileInfo, FileType, Ownership, PathError, Result};
