//! # fileops-common
//!
//! Common types shared across the charm file operations workspace.
//!
//! This crate provides the foundational abstractions the other crates build
//! on: the Pebble-shaped error taxonomy used by every file operation backend,
//! the process errors used by the test fixture, and the `FileInfo` model
//! returned by directory listings.

pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::{
    ApiError, Error, PathError, PathErrorKind, ProcessError, ProcessResult, Result, ResultExt,
};
pub use types::{FileInfo, FileType, Ownership};
