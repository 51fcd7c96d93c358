//! # Remote API
//!
//! The client talks to the storage service through the [`ApiGateway`] trait: a JSON-RPC style
//! `call`, a plain `fetch` of ephemeral download URLs and a streaming multipart `post`.
//! [`crate::http::HttpGateway`] is the production implementation; tests plug in an in-memory one.
//!
//! ## Methods consumed
//!
//! | Method          | Params          | Result                                  |
//! |-----------------|-----------------|-----------------------------------------|
//! | `auth.getMe`    | -               | [`UserInfo`]                            |
//! | `files.getById` | `file`          | [`FileList`]                            |
//! | `files.get`     | `disk`,`offset` | [`FileList`]                            |
//! | `files.download`| `file`          | [`DownloadLink`]                        |
//! | `disks.get`     | -               | [`DiskList`]                            |
//!
//! Every request carries the caller's token in `params.token` unless the params already have one.

use crate::error::{KtError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Read;

/// JSON-RPC parameters.
pub type Params = Map<String, Value>;

/// Transport used by the transfer pipelines.
pub trait ApiGateway {
    /// Call `method` with `params`. Transport failures are errors; API level failures are
    /// reported inside the returned [`ApiResponse`].
    fn call(&self, token: &str, method: &str, params: Params) -> Result<ApiResponse>;

    /// Plain GET of `url`, typically an ephemeral download link.
    fn fetch(&self, url: &str) -> Result<FetchedBody>;

    /// POST a multipart form to `url`. The file part is streamed from its reader.
    fn post_multipart(&self, url: &str, form: MultipartForm) -> Result<PostedResponse>;

    /// URL of the upload endpoint.
    fn upload_url(&self) -> String;
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ApiResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
    #[serde(default)]
    pub result: Value,
}

impl ApiResponse {
    pub fn ok(result: Value) -> Self {
        Self {
            id: None,
            error: None,
            result,
        }
    }

    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Self {
            id: None,
            error: Some(ApiErrorBody {
                code,
                message: message.into(),
            }),
            result: Value::Null,
        }
    }

    /// The error payload, if it carries a non-zero code.
    pub fn api_error(&self) -> Option<&ApiErrorBody> {
        self.error.as_ref().filter(|e| e.code != 0)
    }

    /// Fail on a non-zero error code, otherwise return the raw result.
    pub fn into_value(self) -> Result<Value> {
        if let Some(err) = self.api_error() {
            return Err(KtError::Api {
                code: err.code,
                message: err.message.clone(),
            });
        }
        Ok(self.result)
    }

    /// Fail on a non-zero error code, otherwise decode the result.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T> {
        let value = self.into_value()?;
        serde_json::from_value(value).map_err(|e| KtError::InvalidResponse(e.to_string()))
    }
}

/// Body of a plain GET.
pub struct FetchedBody {
    pub status: u16,
    pub reason: String,
    pub body: Box<dyn Read + Send>,
}

/// File part of a multipart upload, sent as `application/octet-stream`.
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub body: Box<dyn Read + Send>,
}

/// Ordered text fields followed by one file part.
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub file: FilePart,
    /// Request `Content-Type`. `None` keeps the multipart boundary type.
    pub content_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PostedResponse {
    pub status: u16,
    pub reason: String,
    pub body: Vec<u8>,
}

impl PostedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `"<code> <reason>"`, the way HTTP libraries print a status line.
    pub fn status_line(&self) -> String {
        if self.reason.is_empty() {
            self.status.to_string()
        } else {
            format!("{} {}", self.status, self.reason)
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct FileRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime: String,
    #[serde(default)]
    pub disk: String,
    #[serde(default)]
    pub folder: String,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub type_desc: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct FileList {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub list: Vec<FileRecord>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct DownloadLink {
    #[serde(default)]
    pub crypto: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct UploadReceipt {
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub ok: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Disk {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub crypto_key: String,
    #[serde(default)]
    pub public_key: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct DiskList {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub list: Vec<Disk>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct UserInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub available_space: i64,
}

/// Call `method` and decode its result.
pub fn request<T: DeserializeOwned>(
    gateway: &dyn ApiGateway,
    token: &str,
    method: &str,
    params: Params,
) -> Result<T> {
    gateway.call(token, method, params)?.into_result()
}

fn file_params(file_id: &str) -> Params {
    let mut params = Params::new();
    params.insert("file".into(), Value::from(file_id));
    params
}

/// Metadata for a single file.
pub fn file_by_id(gateway: &dyn ApiGateway, token: &str, file_id: &str) -> Result<FileRecord> {
    let files: FileList = request(gateway, token, "files.getById", file_params(file_id))?;
    if files.count == 0 {
        return Err(KtError::FileNotFound(file_id.to_string()));
    }
    files
        .list
        .into_iter()
        .next()
        .ok_or_else(|| KtError::FileNotFound(file_id.to_string()))
}

/// Short-lived download link for a file.
pub fn download_link(gateway: &dyn ApiGateway, token: &str, file_id: &str) -> Result<DownloadLink> {
    request(gateway, token, "files.download", file_params(file_id))
}

/// First page of files on `disk`.
pub fn list_files(gateway: &dyn ApiGateway, token: &str, disk: &str) -> Result<FileList> {
    let mut params = Params::new();
    params.insert("disk".into(), Value::from(disk));
    params.insert("offset".into(), Value::from(0));
    request(gateway, token, "files.get", params)
}

/// The disk with id `disk`, or the user's default (first) disk when `disk` is empty.
pub fn user_disk(gateway: &dyn ApiGateway, token: &str, disk: &str) -> Result<Disk> {
    let disks: DiskList = request(gateway, token, "disks.get", Params::new())?;
    let wanted = disk.trim();

    disks
        .list
        .into_iter()
        .find(|d| wanted.is_empty() || d.id == wanted)
        .ok_or_else(|| {
            if wanted.is_empty() {
                KtError::DiskNotFound("default".into())
            } else {
                KtError::DiskNotFound(wanted.to_string())
            }
        })
}

/// Id of the user owning `token`.
pub fn whoami(gateway: &dyn ApiGateway, token: &str) -> Result<String> {
    let user: UserInfo = request(gateway, token, "auth.getMe", Params::new())?;
    if user.id.is_empty() {
        return Err(KtError::InvalidResponse(
            "failed to get user id from response".into(),
        ));
    }
    Ok(user.id)
}

/// Parse `k=v k="v with spaces"` into params. Items that are not exactly one `key=value`
/// pair (no `=`, more than one `=`, empty key) are skipped.
pub fn parse_key_values(input: &str) -> Params {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    items.push(std::mem::take(&mut current));
                }
            }
            None => current.push(c),
        }
    }
    if !current.is_empty() {
        items.push(current);
    }

    let mut params = Params::new();
    for item in items {
        let mut parts = item.split('=');
        if let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) {
            if !key.is_empty() {
                params.insert(key.to_string(), Value::from(value));
            }
        }
    }
    params
}
