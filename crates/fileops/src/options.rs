//! Option structs for the operations that take more than a path.

use fileops_common::Ownership;

/// Default mode for directories created by `make_dir`.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Default mode for files written by `push`.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Options for `list_files`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Shell glob matched against entry names.
    pub pattern: Option<String>,
    /// Return the path itself rather than its entries.
    pub itself: bool,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn itself(mut self) -> Self {
        self.itself = true;
        self
    }
}

/// Options for `make_dir`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MakeDirOptions {
    pub make_parents: bool,
    /// Mode for the new directory; [`DEFAULT_DIR_MODE`] when unset.
    pub permissions: Option<u32>,
    pub owner: Ownership,
}

impl MakeDirOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn make_parents(mut self, make_parents: bool) -> Self {
        self.make_parents = make_parents;
        self
    }

    pub fn with_permissions(mut self, permissions: u32) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn with_owner(mut self, owner: Ownership) -> Self {
        self.owner = owner;
        self
    }

    pub fn mode(&self) -> u32 {
        self.permissions.unwrap_or(DEFAULT_DIR_MODE)
    }
}

/// Options for `push`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushOptions {
    /// Create missing parent directories (mode `0o755`).
    pub make_dirs: bool,
    /// Mode for the written file; [`DEFAULT_FILE_MODE`] when unset.
    pub permissions: Option<u32>,
    pub owner: Ownership,
}

impl PushOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn make_dirs(mut self, make_dirs: bool) -> Self {
        self.make_dirs = make_dirs;
        self
    }

    pub fn with_permissions(mut self, permissions: u32) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn with_owner(mut self, owner: Ownership) -> Self {
        self.owner = owner;
        self
    }

    pub fn mode(&self) -> u32 {
        self.permissions.unwrap_or(DEFAULT_FILE_MODE)
    }
}
