pub mod error;
pub mod files;
pub mod middleware;
pub mod password;
pub mod sites;
pub mod token;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
};

use tracing::error;

use sitedrop_db::Database;
use sitedrop_relay::GitHubRelay;

use crate::error::{ApiError, ApiResult};
use crate::middleware::require_auth;
use crate::token::TokenService;

/// 50 MB upload limit for files
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenService,
    pub relay: GitHubRelay,
}

/// All routes, with the token check applied to the file routes only.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(sites::index))
        .route("/health", get(health))
        .route("/createsite", post(sites::create_site))
        .route("/sites", get(sites::list_sites))
        .route(
            "/site/{site_name}",
            get(sites::get_site).delete(sites::delete_site),
        );

    let protected_routes = Router::new()
        .route("/upload/{site_name}", post(files::upload_file))
        .route("/getfile/{id}", get(files::get_file))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Run store or password-hashing work on the blocking pool.
pub(crate) async fn blocking<F, T>(work: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
    })?
}

/// GET /health — liveness check (no auth).
pub async fn health() -> &'static str {
    "ok"
}
