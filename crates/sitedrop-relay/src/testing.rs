//! In-process stand-in for the GitHub contents API and raw host.
//!
//! Serves `PUT`/`DELETE /repos/{owner}/{repo}/contents/{path}` and
//! `GET /raw/{owner}/{repo}/{branch}/{path}` on a loopback port, keeping
//! content in memory.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, put},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use serde_json::{Value, json};

use crate::RelayConfig;

pub const FAKE_OWNER: &str = "owner";
pub const FAKE_REPO: &str = "repo";
pub const FAKE_BRANCH: &str = "main";

struct Blob {
    bytes: Vec<u8>,
    sha: String,
}

struct FakeState {
    token: String,
    contents: Mutex<HashMap<String, Blob>>,
    next_sha: AtomicU64,
    forced_upload_status: Mutex<Option<u16>>,
}

impl FakeState {
    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("token {}", self.token))
    }
}

pub struct FakeHost {
    addr: SocketAddr,
    state: Arc<FakeState>,
}

impl FakeHost {
    /// Bind on an ephemeral loopback port and serve until the runtime stops.
    pub async fn start(token: &str) -> FakeHost {
        let state = Arc::new(FakeState {
            token: token.to_string(),
            contents: Mutex::new(HashMap::new()),
            next_sha: AtomicU64::new(1),
            forced_upload_status: Mutex::new(None),
        });

        let app = Router::new()
            .route(
                "/repos/{owner}/{repo}/contents/{*path}",
                put(put_content).delete(delete_content),
            )
            .route("/raw/{owner}/{repo}/{branch}/{*path}", get(raw_content))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake host");
        let addr = listener.local_addr().expect("fake host addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        FakeHost { addr, state }
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            api_url: format!("http://{}", self.addr),
            raw_url: format!("http://{}/raw", self.addr),
            web_url: "https://github.test".into(),
            owner: FAKE_OWNER.into(),
            repo: FAKE_REPO.into(),
            branch: FAKE_BRANCH.into(),
            token: self.state.token.clone(),
        }
    }

    /// Bytes currently stored at `path`, if any.
    pub fn stored(&self, path: &str) -> Option<Vec<u8>> {
        self.state
            .contents
            .lock()
            .unwrap()
            .get(path)
            .map(|blob| blob.bytes.clone())
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.state.contents.lock().unwrap().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Make every following upload answer with `status` instead of storing.
    pub fn fail_uploads_with(&self, status: u16) {
        *self.state.forced_upload_status.lock().unwrap() = Some(status);
    }
}

async fn put_content(
    State(state): State<Arc<FakeState>>,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !state.authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Bad credentials" }))).into_response();
    }
    if let Some(status) = *state.forced_upload_status.lock().unwrap() {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, Json(json!({ "message": "forced failure" }))).into_response();
    }

    let Some(bytes) = body["content"].as_str().and_then(|c| B64.decode(c).ok()) else {
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "message": "Invalid content" })))
            .into_response();
    };

    let mut contents = state.contents.lock().unwrap();
    if contents.contains_key(&path) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "Invalid request.\n\n\"sha\" wasn't supplied." })),
        )
            .into_response();
    }

    let sha = format!("sha{:04}", state.next_sha.fetch_add(1, Ordering::Relaxed));
    contents.insert(path.clone(), Blob { bytes, sha: sha.clone() });

    (
        StatusCode::CREATED,
        Json(json!({ "content": { "path": path, "sha": sha } })),
    )
        .into_response()
}

async fn delete_content(
    State(state): State<Arc<FakeState>>,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !state.authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Bad credentials" }))).into_response();
    }

    let mut contents = state.contents.lock().unwrap();
    match contents.get(&path) {
        None => (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))).into_response(),
        Some(blob) if Some(blob.sha.as_str()) != body["sha"].as_str() => (
            StatusCode::CONFLICT,
            Json(json!({ "message": "sha does not match" })),
        )
            .into_response(),
        Some(_) => {
            contents.remove(&path);
            (StatusCode::OK, Json(json!({ "content": null }))).into_response()
        }
    }
}

async fn raw_content(
    State(state): State<Arc<FakeState>>,
    Path((_owner, _repo, _branch, path)): Path<(String, String, String, String)>,
    headers: HeaderMap,
) -> Response {
    if !state.authorized(&headers) {
        return (StatusCode::NOT_FOUND, "404: Not Found").into_response();
    }
    match state.contents.lock().unwrap().get(&path) {
        Some(blob) => (StatusCode::OK, blob.bytes.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "404: Not Found").into_response(),
    }
}
