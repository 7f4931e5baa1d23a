//! Relay between sitedrop and the GitHub contents API.
//!
//! Every stored file lives in one repository at `uploads/{site}/{file}`.
//! Uploads go through the authenticated contents endpoint, reads go through
//! the raw-content host.

#[cfg(feature = "test-util")]
pub mod testing;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use reqwest::{Client, StatusCode, Url, header};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const USER_AGENT: &str = concat!("sitedrop/", env!("CARGO_PKG_VERSION"));

/// Top-level directory for all uploaded content in the backing repository.
pub const UPLOAD_ROOT: &str = "uploads";

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid hosting URL {0}")]
    InvalidUrl(String),

    #[error("request to hosting API failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upload rejected by hosting API ({status})")]
    Upload { status: u16, body: String },

    #[error("fetch rejected by hosting API ({status})")]
    Fetch { status: u16, body: String },

    #[error("delete rejected by hosting API ({status})")]
    Delete { status: u16, body: String },
}

impl RelayError {
    /// Upstream status and body, when the hosting API answered at all.
    pub fn upstream(&self) -> Option<(u16, &str)> {
        match self {
            RelayError::Upload { status, body }
            | RelayError::Fetch { status, body }
            | RelayError::Delete { status, body } => Some((*status, body.as_str())),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Contents API base, e.g. `https://api.github.com`.
    pub api_url: String,
    /// Raw content host, e.g. `https://raw.githubusercontent.com`.
    pub raw_url: String,
    /// Browse host used for the stored file URL, e.g. `https://github.com`.
    pub web_url: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub token: String,
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredContent {
    /// File name as stored, with the timestamp suffix.
    pub file_name: String,
    /// Repository path, `uploads/{site}/{file_name}`.
    pub path: String,
    /// Browse URL for the stored content.
    pub html_url: String,
    /// Blob SHA reported by the hosting API; required to delete the content.
    pub sha: String,
}

#[derive(Serialize)]
struct PutContentBody<'a> {
    message: String,
    content: String,
    branch: &'a str,
}

#[derive(Serialize)]
struct DeleteContentBody<'a> {
    message: String,
    sha: &'a str,
    branch: &'a str,
}

#[derive(Deserialize)]
struct PutContentResponse {
    content: ContentMeta,
}

#[derive(Deserialize)]
struct ContentMeta {
    sha: String,
}

pub struct GitHubRelay {
    client: Client,
    config: RelayConfig,
    api_url: Url,
    raw_url: Url,
    web_url: Url,
}

impl GitHubRelay {
    pub fn new(config: RelayConfig) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            api_url: parse_base(&config.api_url)?,
            raw_url: parse_base(&config.raw_url)?,
            web_url: parse_base(&config.web_url)?,
            client,
            config,
        })
    }

    pub fn repo(&self) -> &str {
        &self.config.repo
    }

    /// Upload `bytes` for `site_name`, stamping the name with the current time.
    pub async fn upload(&self, site_name: &str, bytes: &[u8], file_name: &str) -> Result<StoredContent> {
        self.upload_at(site_name, bytes, file_name, chrono::Utc::now().timestamp())
            .await
    }

    /// Upload with an explicit unix timestamp for the name suffix.
    pub async fn upload_at(
        &self,
        site_name: &str,
        bytes: &[u8],
        file_name: &str,
        unix_ts: i64,
    ) -> Result<StoredContent> {
        let file_name = stamped_name(file_name, unix_ts);
        let path = content_path(site_name, &file_name);

        let url = self.contents_url(&path)?;
        let body = PutContentBody {
            message: format!("Upload file: {}", file_name),
            content: B64.encode(bytes),
            branch: &self.config.branch,
        };

        debug!("PUT {} ({} bytes)", path, bytes.len());
        let resp = self
            .client
            .put(url)
            .header(header::AUTHORIZATION, self.auth_header())
            .header(header::ACCEPT, "application/vnd.github+json")
            .json(&body)
            .send()
            .await?;

        if resp.status() != StatusCode::CREATED {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(RelayError::Upload { status, body });
        }

        let created: PutContentResponse = resp.json().await?;
        let html_url = self.browse_url(&path)?;

        info!("Stored {} ({} bytes)", path, bytes.len());
        Ok(StoredContent {
            file_name,
            path,
            html_url,
            sha: created.content.sha,
        })
    }

    /// Read back stored content from the raw-content host.
    pub async fn fetch(&self, site_name: &str, file_name: &str) -> Result<Vec<u8>> {
        let path = content_path(site_name, file_name);
        let mut url = self.raw_url.clone();
        push_segments(&mut url, &[&self.config.owner, &self.config.repo, &self.config.branch])?;
        push_segments(&mut url, &path.split('/').collect::<Vec<_>>())?;

        debug!("GET raw {}", path);
        let resp = self
            .client
            .get(url)
            .header(header::AUTHORIZATION, self.auth_header())
            .send()
            .await?;

        if resp.status() != StatusCode::OK {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(RelayError::Fetch { status, body });
        }

        Ok(resp.bytes().await?.to_vec())
    }

    /// Remove stored content. `sha` must be the blob SHA returned on upload.
    pub async fn delete(&self, path: &str, sha: &str) -> Result<()> {
        let url = self.contents_url(path)?;
        let body = DeleteContentBody {
            message: format!("Delete file: {}", path),
            sha,
            branch: &self.config.branch,
        };

        let resp = self
            .client
            .delete(url)
            .header(header::AUTHORIZATION, self.auth_header())
            .header(header::ACCEPT, "application/vnd.github+json")
            .json(&body)
            .send()
            .await?;

        if resp.status() != StatusCode::OK {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(RelayError::Delete { status, body });
        }

        info!("Deleted {}", path);
        Ok(())
    }

    fn auth_header(&self) -> String {
        format!("token {}", self.config.token)
    }

    fn contents_url(&self, path: &str) -> Result<Url> {
        let mut url = self.api_url.clone();
        push_segments(&mut url, &["repos", &self.config.owner, &self.config.repo, "contents"])?;
        push_segments(&mut url, &path.split('/').collect::<Vec<_>>())?;
        Ok(url)
    }

    fn browse_url(&self, path: &str) -> Result<String> {
        let mut url = self.web_url.clone();
        push_segments(
            &mut url,
            &[&self.config.owner, &self.config.repo, "blob", &self.config.branch],
        )?;
        push_segments(&mut url, &path.split('/').collect::<Vec<_>>())?;
        Ok(url.into())
    }
}

/// `report.txt` uploaded at 1700000000 is stored as `report.txt_1700000000`.
pub fn stamped_name(file_name: &str, unix_ts: i64) -> String {
    format!("{}_{}", file_name, unix_ts)
}

pub fn content_path(site_name: &str, file_name: &str) -> String {
    format!("{}/{}/{}", UPLOAD_ROOT, site_name, file_name)
}

fn parse_base(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|_| RelayError::InvalidUrl(raw.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(RelayError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

/// Append percent-encoded path segments, keeping any path already on the base.
fn push_segments(url: &mut Url, segments: &[&str]) -> Result<()> {
    let raw = url.to_string();
    url.path_segments_mut()
        .map_err(|_| RelayError::InvalidUrl(raw))?
        .pop_if_empty()
        .extend(segments);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relay(api_url: &str) -> GitHubRelay {
        GitHubRelay::new(RelayConfig {
            api_url: api_url.into(),
            raw_url: "https://raw.example.test".into(),
            web_url: "https://web.example.test/".into(),
            owner: "owner".into(),
            repo: "repo".into(),
            branch: "main".into(),
            token: "t0ken".into(),
        })
        .unwrap()
    }

    #[test]
    fn stamped_name_appends_timestamp() {
        assert_eq!(stamped_name("report.txt", 1_700_000_000), "report.txt_1700000000");
        assert_ne!(stamped_name("report.txt", 1), stamped_name("report.txt", 2));
    }

    #[test]
    fn content_path_is_under_upload_root() {
        assert_eq!(content_path("acme", "a_1"), "uploads/acme/a_1");
    }

    #[test]
    fn contents_url_keeps_base_path() {
        let relay = relay("http://127.0.0.1:9000/api");
        let url = relay.contents_url("uploads/acme/a b_1").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9000/api/repos/owner/repo/contents/uploads/acme/a%20b_1"
        );
    }

    #[test]
    fn browse_url_points_at_branch_blob() {
        let relay = relay("https://api.example.test");
        assert_eq!(
            relay.browse_url("uploads/acme/a_1").unwrap(),
            "https://web.example.test/owner/repo/blob/main/uploads/acme/a_1"
        );
    }

    #[test]
    fn rejects_non_base_url() {
        let result = GitHubRelay::new(RelayConfig {
            api_url: "mailto:someone@example.test".into(),
            raw_url: "https://raw.example.test".into(),
            web_url: "https://web.example.test".into(),
            owner: "o".into(),
            repo: "r".into(),
            branch: "main".into(),
            token: "t".into(),
        });
        assert!(matches!(result, Err(RelayError::InvalidUrl(_))));
    }
}
