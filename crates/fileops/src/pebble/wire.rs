//! JSON shapes of Pebble's REST API.

use chrono::DateTime;
use fileops_common::{ApiError, Error, FileInfo, FileType, Ownership, PathError, PathErrorKind, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every Pebble response is wrapped in one of these.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    /// `sync`, `async` or `error`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "status-code")]
    pub status_code: u16,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub result: Value,
}

impl Envelope {
    /// The `result` of a successful response, or the envelope's error.
    pub fn into_result(self) -> Result<Value> {
        if self.kind != "error" {
            return Ok(self.result);
        }
        let detail: ErrorDetail = serde_json::from_value(self.result).unwrap_or_default();
        Err(ApiError::new(
            self.status_code,
            self.status,
            detail.message,
            detail.kind.map(PathErrorKind::from),
        )
        .into())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: String,
    pub kind: Option<String>,
}

/// Per-path outcome in the result of a files API call.
#[derive(Debug, Clone, Deserialize)]
pub struct PathResult {
    pub path: String,
    pub error: Option<ErrorDetail>,
}

/// Turn the first per-path failure in `result` into a [`PathError`].
pub fn check_path_results(result: Value) -> Result<()> {
    let results: Vec<PathResult> = serde_json::from_value(result)
        .map_err(|e| Error::protocol(format!("invalid path results: {}", e)))?;
    match results.into_iter().find_map(|r| r.error) {
        Some(detail) => Err(PathError::new(
            detail.kind.unwrap_or_else(|| PathErrorKind::GenericFileError.as_str().to_string()),
            detail.message,
        )
        .into()),
        None => Ok(()),
    }
}

/// Permissions go over the wire as three or more octal digits.
pub fn format_permissions(mode: u32) -> String {
    format!("{:03o}", mode)
}

pub fn parse_permissions(value: &str) -> Result<u32> {
    u32::from_str_radix(value, 8)
        .map_err(|e| Error::protocol(format!("invalid permissions {:?}: {}", value, e)))
}

/// A file list entry as Pebble sends it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WireFileInfo {
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub size: Option<u64>,
    pub permissions: String,
    pub last_modified: String,
    pub user_id: Option<u32>,
    pub user: Option<String>,
    pub group_id: Option<u32>,
    pub group: Option<String>,
}

impl TryFrom<WireFileInfo> for FileInfo {
    type Error = Error;

    fn try_from(wire: WireFileInfo) -> Result<Self> {
        let last_modified = DateTime::parse_from_rfc3339(&wire.last_modified).map_err(|e| {
            Error::protocol(format!("invalid last-modified {:?}: {}", wire.last_modified, e))
        })?;
        Ok(FileInfo {
            permissions: parse_permissions(&wire.permissions)?,
            path: wire.path,
            name: wire.name,
            file_type: wire.file_type,
            size: wire.size,
            last_modified,
            user_id: wire.user_id,
            user: wire.user,
            group_id: wire.group_id,
            group: wire.group,
        })
    }
}

/// Ownership fields shared by make-dirs and write requests.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct WireOwner {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl From<&Ownership> for WireOwner {
    fn from(owner: &Ownership) -> Self {
        Self {
            user_id: owner.user_id,
            user: owner.user.clone(),
            group_id: owner.group_id,
            group: owner.group.clone(),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !value
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct MakeDirItem {
    pub path: String,
    #[serde(skip_serializing_if = "is_false")]
    pub make_parents: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
    #[serde(flatten)]
    pub owner: WireOwner,
}

#[derive(Debug, Clone, Serialize)]
pub struct MakeDirsRequest {
    pub action: &'static str,
    pub dirs: Vec<MakeDirItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveItem {
    pub path: String,
    #[serde(skip_serializing_if = "is_false")]
    pub recursive: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveRequest {
    pub action: &'static str,
    pub paths: Vec<RemoveItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct WriteItem {
    pub path: String,
    #[serde(skip_serializing_if = "is_false")]
    pub make_dirs: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
    #[serde(flatten)]
    pub owner: WireOwner,
}

#[derive(Debug, Clone, Serialize)]
pub struct WriteRequest {
    pub action: &'static str,
    pub files: Vec<WriteItem>,
}
