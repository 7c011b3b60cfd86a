//! Integration tests for the authenticated request gateway
//!
//! Each test runs against a wiremock server standing in for the platform
//! API, with a tempdir-backed credential store. The refresh endpoint mocks
//! carry call-count expectations, verified when the mock server drops, so
//! thundering-herd regressions fail loudly.

use std::sync::Arc;

use opsdeck_auth::{CredentialStore, TokenPair};
use opsdeck_gateway::{Error, Gateway, RequestDescriptor, SessionState};
use reqwest::Method;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Matches requests carrying no Authorization header at all.
struct NoAuthHeader;

impl wiremock::Match for NoAuthHeader {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}

async fn gateway_with_pair(
    server: &MockServer,
    dir: &tempfile::TempDir,
    pair: Option<TokenPair>,
) -> Gateway {
    let store = CredentialStore::load(dir.path().join("credentials.json"))
        .await
        .unwrap();
    if let Some(pair) = pair {
        store.store(pair).await.unwrap();
    }
    Gateway::new(server.uri(), Arc::new(store), reqwest::Client::new()).await
}

fn pair(access: &str, refresh: &str) -> TokenPair {
    TokenPair {
        access_token: access.into(),
        refresh_token: refresh.into(),
    }
}

fn profile_json() -> serde_json::Value {
    json!({
        "id": "6f1c0a8e-58b1-4f7a-9a46-cf4d2a2f9d8b",
        "email": "admin@demo.io",
        "name": "Admin",
        "role": "ADMIN",
        "created_at": "2025-01-15T09:30:00Z"
    })
}

#[tokio::test]
async fn login_stores_pair_and_returns_profile() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"email": "admin@demo.io", "password": "changeme"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A1",
            "refresh_token": "R1"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json()))
        .mount(&server)
        .await;

    let gateway = gateway_with_pair(&server, &dir, None).await;
    assert!(!gateway.is_authenticated().await);

    let profile = gateway.login("admin@demo.io", "changeme").await.unwrap();
    assert_eq!(profile.email, "admin@demo.io");

    // Round-trip: the stored pair is exactly the login response
    let stored = gateway.stored_pair().await.unwrap();
    assert_eq!(stored, pair("A1", "R1"));
    assert!(gateway.is_authenticated().await);
    assert_eq!(gateway.cached_user().await.unwrap().name, "Admin");
}

#[tokio::test]
async fn login_rejection_leaves_store_empty() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Incorrect email or password"
        })))
        .mount(&server)
        .await;

    let gateway = gateway_with_pair(&server, &dir, None).await;
    let err = gateway.login("admin@demo.io", "wrong").await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)), "got {err:?}");
    assert!(gateway.stored_pair().await.is_none());
    assert!(!gateway.is_authenticated().await);
}

#[tokio::test]
async fn profile_fetch_failure_leaves_pair_unstored() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A1",
            "refresh_token": "R1"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let gateway = gateway_with_pair(&server, &dir, None).await;
    let err = gateway.login("admin@demo.io", "changeme").await.unwrap_err();
    assert!(matches!(err, Error::AuthService(_)), "got {err:?}");
    // The pair is not stored if either login step fails
    assert!(gateway.stored_pair().await.is_none());
}

#[tokio::test]
async fn authenticated_request_attaches_bearer_token() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_with_pair(&server, &dir, Some(pair("A1", "R1"))).await;
    assert!(gateway.is_authenticated().await);

    let projects: Vec<serde_json::Value> = gateway.get_json("/projects").await.unwrap();
    assert!(projects.is_empty());
}

#[tokio::test]
async fn anonymous_request_has_no_auth_header_and_skips_refresh() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(NoAuthHeader)
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Not authenticated"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let gateway = gateway_with_pair(&server, &dir, None).await;
    let descriptor = RequestDescriptor::new(Method::GET, "/projects");
    let err = gateway.send(&descriptor).await.unwrap_err();
    assert!(matches!(err, Error::SessionExpired), "got {err:?}");
}

#[tokio::test]
async fn expired_token_is_refreshed_and_request_replayed_once() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    // The stale token is rejected, the rotated one accepted
    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Token expired"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "demo"}])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({"refresh_token": "R1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A2",
            "refresh_token": "R2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_with_pair(&server, &dir, Some(pair("A1", "R1"))).await;
    let projects: Vec<serde_json::Value> = gateway.get_json("/projects").await.unwrap();
    assert_eq!(projects[0]["name"], "demo");

    // Subsequent requests use the rotated pair
    assert_eq!(gateway.stored_pair().await.unwrap(), pair("A2", "R2"));
    assert_eq!(gateway.session_state().await, SessionState::Authenticated);
}

#[tokio::test]
async fn concurrent_401s_share_a_single_refresh() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Token expired"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(5)
        .mount(&server)
        .await;

    // The property under test: N concurrent failures, exactly one refresh
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({"refresh_token": "R1"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "A2", "refresh_token": "R2"}))
                .set_delay(std::time::Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let gateway = Arc::new(gateway_with_pair(&server, &dir, Some(pair("A1", "R1"))).await);

    let mut handles = vec![];
    for _ in 0..5 {
        let gateway = gateway.clone();
        handles.push(tokio::spawn(async move {
            let descriptor = RequestDescriptor::new(Method::GET, "/projects");
            gateway.send(&descriptor).await
        }));
    }

    for h in handles {
        let response = h.await.unwrap().unwrap();
        assert_eq!(response.status(), 200);
    }

    assert_eq!(gateway.stored_pair().await.unwrap(), pair("A2", "R2"));
}

#[tokio::test]
async fn refresh_rejection_voids_session_for_all_waiters() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Token expired"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "Invalid refresh token"}))
                .set_delay(std::time::Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let gateway = Arc::new(gateway_with_pair(&server, &dir, Some(pair("A1", "R1"))).await);

    let mut handles = vec![];
    for _ in 0..5 {
        let gateway = gateway.clone();
        handles.push(tokio::spawn(async move {
            let descriptor = RequestDescriptor::new(Method::GET, "/projects");
            gateway.send(&descriptor).await
        }));
    }

    // Every waiter surfaces SessionExpired; none fans out its own refresh
    for h in handles {
        let err = h.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::SessionExpired), "got {err:?}");
    }

    assert!(gateway.stored_pair().await.is_none());
    assert_eq!(gateway.session_state().await, SessionState::Anonymous);
    assert!(gateway.cached_user().await.is_none());
}

#[tokio::test]
async fn replay_response_is_returned_even_when_it_fails() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/projects/missing"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Token expired"
        })))
        .expect(1)
        .mount(&server)
        .await;

    // The replay 404s; that response belongs to the caller, not the gateway
    Mock::given(method("GET"))
        .and(path("/projects/missing"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "detail": "Project not found"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A2",
            "refresh_token": "R2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_with_pair(&server, &dir, Some(pair("A1", "R1"))).await;
    let err = gateway
        .get_json::<serde_json::Value>("/projects/missing")
        .await
        .unwrap_err();
    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Project not found");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_auth_failures_propagate_without_refresh() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/projects"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let gateway = gateway_with_pair(&server, &dir, Some(pair("A1", "R1"))).await;
    let err = gateway
        .get_json::<Vec<serde_json::Value>>("/projects")
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::Api { status: 503, .. }),
        "got {err:?}"
    );
    // Pair untouched
    assert_eq!(gateway.stored_pair().await.unwrap(), pair("A1", "R1"));
}

#[tokio::test]
async fn logout_is_idempotent_and_makes_no_network_call() {
    // No mocks mounted: any request would panic the mock server expectations
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let gateway = gateway_with_pair(&server, &dir, Some(pair("A1", "R1"))).await;
    assert!(gateway.is_authenticated().await);

    gateway.logout().await;
    assert!(!gateway.is_authenticated().await);
    assert!(gateway.stored_pair().await.is_none());

    // Second logout from Anonymous changes nothing
    gateway.logout().await;
    assert!(!gateway.is_authenticated().await);
    assert_eq!(gateway.session_state().await, SessionState::Anonymous);
}

#[tokio::test]
async fn startup_with_stored_pair_is_authenticated() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let gateway = gateway_with_pair(&server, &dir, Some(pair("A1", "R1"))).await;
    assert_eq!(gateway.session_state().await, SessionState::Authenticated);

    // A fresh gateway over the same file sees the same session
    let store = CredentialStore::load(dir.path().join("credentials.json"))
        .await
        .unwrap();
    let restored = Gateway::new(server.uri(), Arc::new(store), reqwest::Client::new()).await;
    assert!(restored.is_authenticated().await);
}

#[tokio::test]
async fn query_parameters_survive_replay() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/audit"))
        .and(wiremock::matchers::query_param("limit", "50"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Token expired"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/audit"))
        .and(wiremock::matchers::query_param("limit", "50"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A2",
            "refresh_token": "R2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_with_pair(&server, &dir, Some(pair("A1", "R1"))).await;
    let entries: Vec<serde_json::Value> = gateway
        .get_json_query("/audit", &[("limit", "50".to_string())])
        .await
        .unwrap();
    assert!(entries.is_empty());
}
