use serde::{Deserialize, Serialize};

use crate::models::{FileSummary, Site};

// -- Token Claims --

/// Bearer token payload. Binds the caller to one site until `exp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub site_name: String,
    pub exp: usize,
}

// -- Sites --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSiteRequest {
    pub site_name: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSiteResponse {
    pub message: String,
    pub auth_token: String,
}

/// `?password=` query used by the site read and delete routes.
#[derive(Debug, Default, Deserialize)]
pub struct PasswordQuery {
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SiteResponse {
    pub site: Site,
    pub files: Vec<FileSummary>,
    pub auth_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SiteListResponse {
    pub sites: Vec<Site>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// -- Files --

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub id: i64,
    pub file: String,
    pub repo: String,
    pub path: String,
    pub url: String,
}

/// How the `file` field of a [`FileContentResponse`] is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentEncoding {
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "base64")]
    Base64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FileContentResponse {
    pub message: String,
    pub file: String,
    pub encoding: ContentEncoding,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}
