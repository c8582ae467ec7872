//! Token refresh protocol against a mocked backend

use crate::common::*;
use crate::assert_ok;
use assert_matches::assert_matches;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use vitalsync::client::{ApiClient, TokenStore};
use vitalsync::shared::{AppConfig, SyncError};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    client: ApiClient,
    tokens: TokenStore,
    expired: Arc<AtomicUsize>,
}

fn harness_with(config: AppConfig) -> Harness {
    let tokens = TokenStore::new(memory_store());
    let client = ApiClient::new(&config, tokens.clone()).unwrap();
    let expired = Arc::new(AtomicUsize::new(0));
    {
        let expired = Arc::clone(&expired);
        let _ = client.on_session_expired(move || {
            expired.fetch_add(1, Ordering::SeqCst);
        });
    }
    Harness { client, tokens, expired }
}

fn harness(server: &MockServer) -> Harness {
    harness_with(test_config(&server.uri()))
}

async fn mount_expired_token(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/student/42"))
        .and(header("authorization", auth_header(token).as_str()))
        .respond_with(error_body(401, "Token expired"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_refresh_then_replay_is_transparent() {
    let server = MockServer::start().await;
    mount_expired_token(&server, "stale").await;
    mount_refresh(&server, "r1", "fresh", "r2").await;
    Mock::given(method("GET"))
        .and(path("/student/42"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(envelope(json!({"id": "42", "name": "Ada"})))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    sign_in(&h.tokens, "stale", "r1").await;

    let profile: Value = assert_ok!(h.client.get("/student/42").await);
    assert_eq!(profile["name"], "Ada");
    assert_eq!(h.tokens.access_token().await.as_deref(), Some("fresh"));
    assert_eq!(h.tokens.refresh_token().await.as_deref(), Some("r2"));
    assert_eq!(h.expired.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_second_401_is_not_retried() {
    let server = MockServer::start().await;
    mount_refresh(&server, "r1", "fresh", "r2").await;
    Mock::given(method("GET"))
        .and(path("/student/42"))
        .respond_with(error_body(401, "Still unauthorized"))
        .expect(2)
        .mount(&server)
        .await;

    let h = harness(&server);
    sign_in(&h.tokens, "stale", "r1").await;

    let err = h.client.get::<Value>("/student/42").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(err.to_string().contains("Still unauthorized"));
    // The refreshed pair is kept; only the replayed request failed
    assert_eq!(h.tokens.access_token().await.as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_missing_refresh_token_clears_session() {
    let server = MockServer::start().await;
    mount_expired_token(&server, "stale").await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(&server);
    sign_in(&h.tokens, "stale", "").await;
    h.tokens.save_user(&json!({"id": "u1"})).await.unwrap();

    let err = h.client.get::<Value>("/student/42").await.unwrap_err();
    assert_matches!(err, SyncError::Http { status: 401, .. });
    assert!(h.tokens.access_token().await.is_none());
    assert!(h.tokens.user::<Value>().await.is_none());
    assert_eq!(h.expired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rejected_refresh_surfaces_refresh_error() {
    let server = MockServer::start().await;
    mount_expired_token(&server, "stale").await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(error_body(403, "Refresh token revoked"))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    sign_in(&h.tokens, "stale", "r1").await;

    let err = h.client.get::<Value>("/student/42").await.unwrap_err();
    assert!(err.is_session_expired());
    assert_eq!(err.status(), Some(403));
    assert!(err.to_string().contains("Refresh token revoked"));
    assert!(h.tokens.access_token().await.is_none());
    assert!(h.tokens.refresh_token().await.is_none());
    assert_eq!(h.expired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unreachable_refresh_keeps_session() {
    let server = MockServer::start().await;
    mount_expired_token(&server, "stale").await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(envelope(json!({})).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let config = AppConfig::builder()
        .server_url(server.uri())
        .request_timeout(Duration::from_secs(1))
        .build()
        .unwrap();
    let h = harness_with(config);
    sign_in(&h.tokens, "stale", "r1").await;

    let err = h.client.get::<Value>("/student/42").await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(h.tokens.refresh_token().await.as_deref(), Some("r1"));
    assert_eq!(h.expired.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_other_errors_pass_through_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/students"))
        .respond_with(error_body(403, "Admins only"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(&server);
    sign_in(&h.tokens, "a1", "r1").await;

    let err = h.client.get::<Value>("/admin/students").await.unwrap_err();
    assert_matches!(err, SyncError::Http { status: 403, ref message } if message == "Admins only");
    assert_eq!(h.tokens.access_token().await.as_deref(), Some("a1"));
}

#[tokio::test]
async fn test_unauthenticated_requests_carry_no_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vitals/s1/latest"))
        .respond_with(move |request: &wiremock::Request| {
            if request.headers.contains_key("authorization") {
                ResponseTemplate::new(400)
            } else {
                envelope(json!({"heartRate": 70, "recordedAt": "2026-03-02T08:00:00Z"}))
            }
        })
        .mount(&server)
        .await;

    let h = harness(&server);
    let latest: Value = assert_ok!(h.client.get("/vitals/s1/latest").await);
    assert_eq!(latest["heartRate"], 70);
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;
    mount_expired_token(&server, "stale").await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({"refreshToken": "r1"})))
        .respond_with(envelope(json!({"accessToken": "fresh", "refreshToken": "r2"})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    // Rotated-out refresh tokens are refused
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(error_body(401, "refresh token reused"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/student/42"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(envelope(json!(1)))
        .expect(2)
        .mount(&server)
        .await;

    let h = harness(&server);
    sign_in(&h.tokens, "stale", "r1").await;

    let (a, b) = tokio::join!(
        h.client.get::<Value>("/student/42"),
        h.client.get::<Value>("/student/42"),
    );
    assert_eq!(assert_ok!(a), json!(1));
    assert_eq!(assert_ok!(b), json!(1));
    assert_eq!(h.tokens.access_token().await.as_deref(), Some("fresh"));
    assert_eq!(h.tokens.refresh_token().await.as_deref(), Some("r2"));
    assert_eq!(h.expired.load(Ordering::SeqCst), 0);
}
