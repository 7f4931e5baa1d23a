use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::AppState;
use crate::error::ApiError;

/// Extract and validate the bearer token from the Authorization header.
///
/// Accepts either the raw token or `Bearer <token>`. On success the
/// [`Claims`](sitedrop_types::api::Claims) are stored as a request extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::Unauthorized("Authorization header missing"))?;

    let token = auth_header.strip_prefix("Bearer ").unwrap_or(auth_header).trim();

    let claims = state
        .tokens
        .validate(token)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token"))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
