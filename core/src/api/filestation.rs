//! FileStation API calls: info, create-folder, rename, delete.
//!
//! Requests are built with consuming `with_*` methods; list-valued
//! parameters (paths, names) accumulate across repeated calls. The `version`
//! field is marked `skip` because it travels in the `version` query
//! parameter, never as a request parameter.

use serde::{Deserialize, Serialize};

use crate::api::{ErrorDescriber, Request, Response};
use crate::error::{ApiError, ErrorSummary};

/// Error codes shared by every FileStation call, consulted after the call's
/// own table and before the global table.
pub const FILESTATION_ERRORS: ErrorSummary = &[
    (400, "Invalid parameter of file operation"),
    (401, "Unknown error of file operation"),
    (402, "System is too busy"),
    (403, "Invalid user does this file operation"),
    (404, "Invalid group does this file operation"),
    (405, "Invalid user and group does this file operation"),
    (406, "Can't get user/group information from the account server"),
    (407, "Operation not permitted"),
    (408, "No such file or directory"),
    (409, "Non-supported file system"),
    (410, "Failed to connect internet-based file system (e.g., CIFS)"),
    (411, "Read-only file system"),
    (412, "Filename too long in the non-encrypted file system"),
    (413, "Filename too long in the encrypted file system"),
    (414, "File already exists"),
    (415, "Disk quota exceeded"),
    (416, "No space left on device"),
    (417, "Input/output error"),
    (418, "Illegal name or path"),
    (419, "Illegal file name"),
    (420, "Illegal file name on FAT file system"),
    (421, "Device or resource busy"),
    (599, "No such task of the file operation"),
];

const CREATE_FOLDER_ERRORS: ErrorSummary = &[
    (
        1100,
        "Failed to create a folder. More information in <errors> object.",
    ),
    (
        1101,
        "The number of folders to the parent folder would exceed the system limitation.",
    ),
];

const RENAME_ERRORS: ErrorSummary = &[(1200, "Failed to rename it.")];

const DELETE_ERRORS: ErrorSummary = &[(
    900,
    "Failed to delete file(s)/folder(s). More information in <errors> object.",
)];

/// A file or folder entry as DSM reports it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct File {
    pub path: String,
    pub name: String,
    #[serde(rename = "isdir", default)]
    pub is_dir: bool,
}

// ---------------------------------------------------------------------------
// SYNO.FileStation.Info
// ---------------------------------------------------------------------------

/// `SYNO.FileStation.Info` / `get` — no request parameters.
#[derive(Debug, Serialize)]
pub struct InfoRequest {
    #[serde(skip)]
    version: u32,
}

impl InfoRequest {
    pub fn new(version: u32) -> Self {
        Self { version }
    }
}

impl Request for InfoRequest {
    type Response = InfoResponse;

    fn api_name(&self) -> &'static str {
        "SYNO.FileStation.Info"
    }

    fn api_method(&self) -> &'static str {
        "get"
    }

    fn api_version(&self) -> u32 {
        self.version
    }
}

impl ErrorDescriber for InfoRequest {
    fn error_summaries(&self) -> Vec<ErrorSummary> {
        vec![FILESTATION_ERRORS]
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct InfoResponse {
    #[serde(default)]
    pub is_manager: bool,
    #[serde(default)]
    pub support_virtual_protocol: String,
    #[serde(default)]
    pub support_sharing: bool,
    #[serde(default)]
    pub hostname: String,
    #[serde(skip)]
    error: Option<ApiError>,
}

impl Response for InfoResponse {
    fn set_error(&mut self, error: ApiError) {
        self.error = Some(error);
    }

    fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }
}

impl ErrorDescriber for InfoResponse {
    fn error_summaries(&self) -> Vec<ErrorSummary> {
        vec![FILESTATION_ERRORS]
    }
}

// ---------------------------------------------------------------------------
// SYNO.FileStation.CreateFolder
// ---------------------------------------------------------------------------

/// `SYNO.FileStation.CreateFolder` / `create`.
///
/// `folder_path` and `name` are parallel lists: one new folder is created
/// per (parent, name) pair.
#[derive(Debug, Default, Serialize)]
pub struct CreateFolderRequest {
    #[serde(skip)]
    version: u32,
    #[serde(rename = "folder_path")]
    folder_paths: Vec<String>,
    #[serde(rename = "name")]
    names: Vec<String>,
    force_parent: bool,
}

impl CreateFolderRequest {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    pub fn with_folder_path(mut self, path: impl Into<String>) -> Self {
        self.folder_paths.push(path.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    pub fn with_force_parent(mut self, force_parent: bool) -> Self {
        self.force_parent = force_parent;
        self
    }
}

impl Request for CreateFolderRequest {
    type Response = CreateFolderResponse;

    fn api_name(&self) -> &'static str {
        "SYNO.FileStation.CreateFolder"
    }

    fn api_method(&self) -> &'static str {
        "create"
    }

    fn api_version(&self) -> u32 {
        self.version
    }
}

impl ErrorDescriber for CreateFolderRequest {
    fn error_summaries(&self) -> Vec<ErrorSummary> {
        vec![CREATE_FOLDER_ERRORS, FILESTATION_ERRORS]
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateFolderResponse {
    #[serde(default)]
    pub folders: Vec<File>,
    #[serde(skip)]
    error: Option<ApiError>,
}

impl Response for CreateFolderResponse {
    fn set_error(&mut self, error: ApiError) {
        self.error = Some(error);
    }

    fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }
}

impl ErrorDescriber for CreateFolderResponse {
    fn error_summaries(&self) -> Vec<ErrorSummary> {
        vec![CREATE_FOLDER_ERRORS, FILESTATION_ERRORS]
    }
}

// ---------------------------------------------------------------------------
// SYNO.FileStation.Rename
// ---------------------------------------------------------------------------

/// `SYNO.FileStation.Rename` / `rename`.
#[derive(Debug, Default, Serialize)]
pub struct RenameRequest {
    #[serde(skip)]
    version: u32,
    #[serde(rename = "path")]
    paths: Vec<String>,
    #[serde(rename = "name")]
    names: Vec<String>,
}

impl RenameRequest {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }
}

impl Request for RenameRequest {
    type Response = RenameResponse;

    fn api_name(&self) -> &'static str {
        "SYNO.FileStation.Rename"
    }

    fn api_method(&self) -> &'static str {
        "rename"
    }

    fn api_version(&self) -> u32 {
        self.version
    }
}

impl ErrorDescriber for RenameRequest {
    fn error_summaries(&self) -> Vec<ErrorSummary> {
        vec![RENAME_ERRORS, FILESTATION_ERRORS]
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RenameResponse {
    #[serde(default)]
    pub files: Vec<File>,
    #[serde(skip)]
    error: Option<ApiError>,
}

impl Response for RenameResponse {
    fn set_error(&mut self, error: ApiError) {
        self.error = Some(error);
    }

    fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }
}

impl ErrorDescriber for RenameResponse {
    fn error_summaries(&self) -> Vec<ErrorSummary> {
        vec![RENAME_ERRORS, FILESTATION_ERRORS]
    }
}

// ---------------------------------------------------------------------------
// SYNO.FileStation.Delete
// ---------------------------------------------------------------------------

/// `SYNO.FileStation.Delete` / `delete` (the blocking variant).
#[derive(Debug, Default, Serialize)]
pub struct DeleteFolderRequest {
    #[serde(skip)]
    version: u32,
    #[serde(rename = "path")]
    paths: Vec<String>,
    recursive: bool,
}

impl DeleteFolderRequest {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }
}

impl Request for DeleteFolderRequest {
    type Response = DeleteFolderResponse;

    fn api_name(&self) -> &'static str {
        "SYNO.FileStation.Delete"
    }

    fn api_method(&self) -> &'static str {
        "delete"
    }

    fn api_version(&self) -> u32 {
        self.version
    }
}

impl ErrorDescriber for DeleteFolderRequest {
    fn error_summaries(&self) -> Vec<ErrorSummary> {
        vec![DELETE_ERRORS, FILESTATION_ERRORS]
    }
}

/// Delete returns no payload; only the error slot matters.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteFolderResponse {
    #[serde(skip)]
    error: Option<ApiError>,
}

impl Response for DeleteFolderResponse {
    fn set_error(&mut self, error: ApiError) {
        self.error = Some(error);
    }

    fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }
}

impl ErrorDescriber for DeleteFolderResponse {
    fn error_summaries(&self) -> Vec<ErrorSummary> {
        vec![DELETE_ERRORS, FILESTATION_ERRORS]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal;

    #[test]
    fn create_folder_marshals_lists_and_flag() {
        let request = CreateFolderRequest::new(2)
            .with_folder_path("/test-folder")
            .with_name("integration-test")
            .with_force_parent(true);

        let params = marshal::to_params(&request).unwrap();
        assert_eq!(params["folder_path"], r#"["/test-folder"]"#);
        assert_eq!(params["name"], r#"["integration-test"]"#);
        assert_eq!(params["force_parent"], "true");
        assert!(!params.contains_key("version"), "version travels separately");
    }

    #[test]
    fn builders_accumulate_repeated_parameters() {
        let request = RenameRequest::new(2)
            .with_path("/a/old-1")
            .with_path("/a/old-2")
            .with_name("new-1")
            .with_name("new-2");

        let params = marshal::to_params(&request).unwrap();
        assert_eq!(params["path"], r#"["/a/old-1","/a/old-2"]"#);
        assert_eq!(params["name"], r#"["new-1","new-2"]"#);
    }

    #[test]
    fn info_request_has_no_parameters() {
        let params = marshal::to_params(&InfoRequest::new(2)).unwrap();
        assert!(params.is_empty());
    }

    #[test]
    fn delete_request_marshals_recursive_flag() {
        let request = DeleteFolderRequest::new(2)
            .with_path("/test-folder")
            .with_recursive(true);

        let params = marshal::to_params(&request).unwrap();
        assert_eq!(params["path"], r#"["/test-folder"]"#);
        assert_eq!(params["recursive"], "true");
    }

    #[test]
    fn api_identity() {
        let create = CreateFolderRequest::new(2);
        assert_eq!(create.api_name(), "SYNO.FileStation.CreateFolder");
        assert_eq!(create.api_method(), "create");
        assert_eq!(create.api_version(), 2);
        assert_eq!(create.api_path(), crate::api::ENTRY_PATH);
    }

    #[test]
    fn decoded_success_payload_has_no_error() {
        let data = serde_json::json!({
            "folders": [{"path": "/test-folder/new", "name": "new", "isdir": true}]
        });
        let response: CreateFolderResponse = serde_json::from_value(data).unwrap();
        assert!(response.is_success());
        assert!(response.error().is_none());
        assert_eq!(response.folders.len(), 1);
        assert!(response.folders[0].is_dir);
    }

    #[test]
    fn request_tables_are_consulted_before_family_table() {
        use crate::error::describe_error;

        let request = CreateFolderRequest::new(2);
        let summaries = request.error_summaries();
        assert_eq!(
            describe_error(1100, &summaries),
            "Failed to create a folder. More information in <errors> object."
        );
        assert_eq!(describe_error(408, &summaries), "No such file or directory");
    }
}
