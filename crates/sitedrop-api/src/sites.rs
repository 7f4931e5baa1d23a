use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use sitedrop_db::models::{FileSummaryRow, SiteRow};
use sitedrop_relay::content_path;
use sitedrop_types::api::{
    CreateSiteRequest, CreateSiteResponse, MessageResponse, PasswordQuery, SiteListResponse,
    SiteResponse,
};
use sitedrop_types::models::{FileSummary, Site};

use crate::{AppState, blocking};
use crate::error::{ApiError, ApiResult};
use crate::password::{PasswordError, hash_password, verify_password};

const MAX_SITE_NAME_LEN: usize = 64;
const MAX_PASSWORD_LEN: usize = 256;

/// POST /createsite
pub async fn create_site(
    State(state): State<AppState>,
    payload: Result<Json<CreateSiteRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    validate_site_name(&req.site_name)?;
    if req.password.is_empty() || req.password.len() > MAX_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "password must be 1-{} bytes",
            MAX_PASSWORD_LEN
        )));
    }

    let db = state.clone();
    let site = blocking(move || {
        if db.db.get_site(&req.site_name)?.is_some() {
            return Err(ApiError::Conflict("Site name already exists"));
        }

        let password_hash = hash_password(&req.password).map_err(anyhow::Error::from)?;

        // Insert is the authority on uniqueness; the lookup above only saves a hash.
        db.db
            .create_site(&req.site_name, &password_hash)?
            .ok_or(ApiError::Conflict("Site name already exists"))
    })
    .await?;

    let auth_token = state.tokens.issue(&site.site_name).map_err(anyhow::Error::from)?;

    info!("Site {} created", site.site_name);
    Ok((
        StatusCode::CREATED,
        Json(CreateSiteResponse {
            message: "Site created successfully".into(),
            auth_token,
        }),
    ))
}

/// GET /site/{site_name}?password=
pub async fn get_site(
    State(state): State<AppState>,
    Path(site_name): Path<String>,
    Query(query): Query<PasswordQuery>,
) -> ApiResult<Json<SiteResponse>> {
    let site = authenticate_site(&state, site_name, query.password).await?;

    let db = state.clone();
    let name = site.site_name.clone();
    let files = blocking(move || Ok(db.db.list_files_for_site(&name)?))
        .await?
        .iter()
        .map(file_summary)
        .collect::<anyhow::Result<Vec<_>>>()?;

    let auth_token = state.tokens.issue(&site.site_name).map_err(anyhow::Error::from)?;

    Ok(Json(SiteResponse {
        site: site_view(&site)?,
        files,
        auth_token,
    }))
}

/// GET /sites — names and timestamps only.
pub async fn list_sites(State(state): State<AppState>) -> ApiResult<Json<SiteListResponse>> {
    let db = state.clone();
    let sites = blocking(move || Ok(db.db.list_sites()?))
        .await?
        .iter()
        .map(site_view)
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Json(SiteListResponse { sites }))
}

/// DELETE /site/{site_name}?password=
///
/// Removes the site and its file rows, then (best effort) the stored content
/// of every removed row.
pub async fn delete_site(
    State(state): State<AppState>,
    Path(site_name): Path<String>,
    Query(query): Query<PasswordQuery>,
) -> ApiResult<Json<MessageResponse>> {
    let site = authenticate_site(&state, site_name, query.password).await?;

    let db = state.clone();
    let name = site.site_name.clone();
    let files = blocking(move || Ok(db.db.delete_site(&name)?))
        .await?
        .ok_or(ApiError::NotFound("Site not found"))?;

    for file in &files {
        let path = content_path(&file.site_name, &file.file_name);
        if let Err(e) = state.relay.delete(&path, &file.content_sha).await {
            warn!("Could not remove {} from hosting API: {}", path, e);
        }
    }

    info!("Site {} deleted ({} files)", site.site_name, files.len());
    Ok(Json(MessageResponse {
        message: "Site deleted successfully".into(),
    }))
}

/// GET / — liveness greeting.
pub async fn index() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "sitedrop is running".into(),
    })
}

/// Look up a site and check the caller knows its password.
async fn authenticate_site(
    state: &AppState,
    site_name: String,
    password: Option<String>,
) -> ApiResult<SiteRow> {
    let password = password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("password query parameter is required".into()))?;

    let db = state.clone();
    blocking(move || {
        let site = db
            .db
            .get_site(&site_name)?
            .ok_or(ApiError::NotFound("Site not found"))?;

        match verify_password(&site.password, &password) {
            Ok(()) => Ok(site),
            Err(PasswordError::Mismatch) => Err(ApiError::Unauthorized("Wrong password")),
            Err(e) => Err(ApiError::Internal(e.into())),
        }
    })
    .await
}

/// Site names become a path segment on the hosting API.
pub fn validate_site_name(name: &str) -> ApiResult<()> {
    if name.is_empty() || name.len() > MAX_SITE_NAME_LEN {
        return Err(ApiError::BadRequest(format!(
            "site_name must be 1-{} characters",
            MAX_SITE_NAME_LEN
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(ApiError::BadRequest(
            "site_name may only contain letters, digits, '-' and '_'".into(),
        ));
    }
    Ok(())
}

fn site_view(row: &SiteRow) -> anyhow::Result<Site> {
    Ok(Site {
        site_name: row.site_name.clone(),
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}

fn file_summary(row: &FileSummaryRow) -> anyhow::Result<FileSummary> {
    Ok(FileSummary {
        id: row.id,
        site_name: row.site_name.clone(),
        file_name: row.file_name.clone(),
        created_at: parse_timestamp(&row.created_at)?,
    })
}

fn parse_timestamp(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}
