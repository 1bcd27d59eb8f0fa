//! Request and response bodies of the public HTTP endpoints.
//!
//! Field names follow the wire format used by the web client
//! (`uploadURL`, `markdownURL`, `fileName`, `fileType`).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Response of `POST /api/use-feature`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UseFeatureResponse {
    pub message: String,
    /// Attempts recorded for the session after this call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

/// Request of `POST /api/get-presigned-url`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 1024, message = "fileName is required (max 1024 characters)"))]
    pub file_name: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "fileType is required (max 255 characters)"))]
    pub file_type: String,
}

/// Response of `POST /api/get-presigned-url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UploadUrlResponse {
    #[serde(rename = "uploadURL")]
    pub upload_url: String,
    pub key: String,
}

/// Request of `POST /api/get-generated-markdown-url`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MarkdownUrlRequest {
    /// Document stem (upload file name without namespace or extension).
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing required field: fileName"))]
    pub file_name: String,
}

/// Response of `POST /api/get-generated-markdown-url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MarkdownUrlResponse {
    #[serde(rename = "markdownURL")]
    pub markdown_url: String,
}

/// Error body returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}
