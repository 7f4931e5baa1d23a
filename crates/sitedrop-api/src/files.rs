use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use tracing::{error, info};

use sitedrop_db::models::NewFile;
use sitedrop_types::api::{Claims, ContentEncoding, FileContentResponse, UploadResponse};

use crate::{AppState, blocking};
use crate::error::{ApiError, ApiResult};

/// Multipart field carrying the upload.
const FILE_FIELD: &str = "file";

/// POST /upload/{site_name} — multipart `file` field, bearer token required.
///
/// The owning site comes from the token; the path segment must agree with it.
/// If the metadata write fails after the content was stored, the content is
/// deleted again so no orphan is left upstream.
pub async fn upload_file(
    State(state): State<AppState>,
    Path(site_name): Path<String>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    if claims.site_name != site_name {
        return Err(ApiError::Unauthorized("Token does not grant access to this site"));
    }

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = clean_file_name(field.file_name().unwrap_or_default())?;
        let bytes = field.bytes().await.map_err(multipart_error)?;
        upload = Some((file_name, bytes));
        break;
    }
    let (file_name, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("Failed to get the file".into()))?;

    let db = state.clone();
    let owner = claims.site_name.clone();
    let site = blocking(move || {
        db.db
            .get_site(&owner)?
            .ok_or(ApiError::NotFound("Site not found"))
    })
    .await?;

    let stored = state
        .relay
        .upload(&site.site_name, &bytes, &file_name)
        .await
        .map_err(|e| ApiError::upstream("Failed to upload file to GitHub", e))?;

    let db = state.clone();
    let owner = site.site_name.clone();
    let (stored_name, file_url, content_sha) =
        (stored.file_name.clone(), stored.html_url.clone(), stored.sha.clone());
    let record = blocking(move || {
        let row = db
            .db
            .insert_file(&NewFile {
                site_name: &owner,
                file_name: &stored_name,
                file_url: &file_url,
                content_sha: &content_sha,
            })
            .context("Failed to record uploaded file")?;
        Ok(row)
    })
    .await;

    let record = match record {
        Ok(record) => record,
        Err(e) => {
            if let Err(cleanup) = state.relay.delete(&stored.path, &stored.sha).await {
                error!("Orphaned {} upstream after failed insert: {}", stored.path, cleanup);
            }
            return Err(e);
        }
    };

    info!(
        "Site {} uploaded {} ({} bytes) as file {}",
        site.site_name,
        stored.file_name,
        bytes.len(),
        record.id
    );

    Ok(Json(UploadResponse {
        message: "File uploaded successfully to GitHub".into(),
        id: record.id,
        file: stored.file_name,
        repo: state.relay.repo().to_string(),
        path: stored.path,
        url: stored.html_url,
    }))
}

/// GET /getfile/{id} — bearer token required, must belong to the owning site.
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<FileContentResponse>> {
    let id: i64 = id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid file ID".into()))?;

    let db = state.clone();
    let file = blocking(move || db.db.get_file(id)?.ok_or(ApiError::NotFound("File not found")))
        .await?;

    if claims.site_name != file.site_name {
        return Err(ApiError::Unauthorized("Unauthorized access to file"));
    }

    let content = state
        .relay
        .fetch(&file.site_name, &file.file_name)
        .await
        .map_err(|e| ApiError::upstream("Failed to fetch file", e))?;

    let (file, encoding) = encode_content(content);
    Ok(Json(FileContentResponse {
        message: "File fetched successfully".into(),
        file,
        encoding,
    }))
}

/// Text stays text; anything that is not valid UTF-8 is returned as base64.
fn encode_content(content: Vec<u8>) -> (String, ContentEncoding) {
    match String::from_utf8(content) {
        Ok(text) => (text, ContentEncoding::Utf8),
        Err(e) => (B64.encode(e.into_bytes()), ContentEncoding::Base64),
    }
}

/// Keep only the final path component of a client-supplied file name.
fn clean_file_name(raw: &str) -> ApiResult<String> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if name.is_empty() || name == "." || name == ".." || name.chars().any(char::is_control) {
        return Err(ApiError::BadRequest("file must have a usable file name".into()));
    }
    Ok(name.to_string())
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::BadRequest(e.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_keeps_last_component() {
        assert_eq!(clean_file_name("report.txt").unwrap(), "report.txt");
        assert_eq!(clean_file_name("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(clean_file_name(r"C:\Users\me\notes.md").unwrap(), "notes.md");
        assert_eq!(clean_file_name(" spaced name.txt ").unwrap(), "spaced name.txt");
    }

    #[test]
    fn unusable_file_names_are_rejected() {
        assert!(clean_file_name("").is_err());
        assert!(clean_file_name("dir/").is_err());
        assert!(clean_file_name("..").is_err());
        assert!(clean_file_name("bad\nname").is_err());
    }

    #[test]
    fn binary_content_is_base64() {
        let (text, encoding) = encode_content(b"hello".to_vec());
        assert_eq!((text.as_str(), encoding), ("hello", ContentEncoding::Utf8));

        let (encoded, encoding) = encode_content(vec![0xff, 0x00, 0xfe]);
        assert_eq!(encoding, ContentEncoding::Base64);
        assert_eq!(B64.decode(encoded).unwrap(), vec![0xff, 0x00, 0xfe]);
    }
}
