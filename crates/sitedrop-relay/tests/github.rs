//! Relay against the in-process fake hosting API: upload, read back, delete,
//! and the upstream failure paths.

use sitedrop_relay::testing::FakeHost;
use sitedrop_relay::{GitHubRelay, RelayError};

const TOKEN: &str = "ghp_test_token";

async fn setup() -> (FakeHost, GitHubRelay) {
    let host = FakeHost::start(TOKEN).await;
    let relay = GitHubRelay::new(host.relay_config()).unwrap();
    (host, relay)
}

#[tokio::test]
async fn upload_then_fetch_returns_original_bytes() {
    let (host, relay) = setup().await;
    let payload: Vec<u8> = (0..=255u8).collect();

    let stored = relay.upload_at("acme", &payload, "blob.bin", 1_700_000_000).await.unwrap();
    assert_eq!(stored.file_name, "blob.bin_1700000000");
    assert_eq!(stored.path, "uploads/acme/blob.bin_1700000000");
    assert_eq!(
        stored.html_url,
        "https://github.test/owner/repo/blob/main/uploads/acme/blob.bin_1700000000"
    );
    assert_eq!(host.stored(&stored.path).unwrap(), payload);

    let fetched = relay.fetch("acme", &stored.file_name).await.unwrap();
    assert_eq!(fetched, payload);
}

#[tokio::test]
async fn uploads_at_different_instants_get_distinct_names() {
    let (host, relay) = setup().await;

    let first = relay.upload_at("acme", b"one", "report.txt", 1_700_000_000).await.unwrap();
    let second = relay.upload_at("acme", b"two", "report.txt", 1_700_000_001).await.unwrap();

    assert_ne!(first.file_name, second.file_name);
    assert_ne!(first.sha, second.sha);
    assert_eq!(host.paths().len(), 2);
}

#[tokio::test]
async fn same_instant_collision_surfaces_upstream_status() {
    let (_host, relay) = setup().await;

    relay.upload_at("acme", b"one", "report.txt", 42).await.unwrap();
    let err = relay.upload_at("acme", b"two", "report.txt", 42).await.unwrap_err();

    assert!(matches!(err, RelayError::Upload { status: 422, .. }));
}

#[tokio::test]
async fn non_created_upload_is_an_error() {
    let (host, relay) = setup().await;
    host.fail_uploads_with(403);

    let err = relay.upload("acme", b"data", "a.txt").await.unwrap_err();
    let (status, body) = err.upstream().unwrap();
    assert_eq!(status, 403);
    assert!(body.contains("forced failure"));
    assert!(host.paths().is_empty());
}

#[tokio::test]
async fn bad_credentials_are_rejected() {
    let host = FakeHost::start(TOKEN).await;
    let mut config = host.relay_config();
    config.token = "wrong".into();
    let relay = GitHubRelay::new(config).unwrap();

    let err = relay.upload("acme", b"data", "a.txt").await.unwrap_err();
    assert!(matches!(err, RelayError::Upload { status: 401, .. }));
}

#[tokio::test]
async fn fetch_missing_file_reports_status_and_body() {
    let (_host, relay) = setup().await;

    let err = relay.fetch("acme", "nope_1").await.unwrap_err();
    match err {
        RelayError::Fetch { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "404: Not Found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn delete_removes_content() {
    let (host, relay) = setup().await;

    let stored = relay.upload_at("acme", b"bye", "x", 7).await.unwrap();
    relay.delete(&stored.path, &stored.sha).await.unwrap();
    assert!(host.stored(&stored.path).is_none());

    let err = relay.delete(&stored.path, &stored.sha).await.unwrap_err();
    assert!(matches!(err, RelayError::Delete { status: 404, .. }));
}
