//! Integration tests for the authenticated request pipeline.
//!
//! These tests verify the token refresh policy end to end:
//! - Authorization header attachment
//! - Exactly one refresh and one retry on 401
//! - No refresh loop on a permanently rejected token
//! - Session termination when refresh is impossible
//! - Single-flight refresh under concurrent 401s

use std::time::Duration;

use createathon_core::api::{ApiClient, ApiError};
use createathon_core::auth::{CredentialKey, CredentialStore};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to build a client plus a handle on its shared store
fn client_for(server: &MockServer) -> (ApiClient, CredentialStore) {
    let store = CredentialStore::in_memory();
    let client = ApiClient::new(server.uri(), store.clone()).expect("Failed to build client");
    (client, store)
}

/// Helper to seed a signed-in store
fn seed_tokens(store: &CredentialStore, access: &str, refresh: Option<&str>) {
    store.set(CredentialKey::AccessToken, access);
    if let Some(refresh) = refresh {
        store.set(CredentialKey::RefreshToken, refresh);
    }
}

fn profile_json(username: &str) -> serde_json::Value {
    serde_json::json!({
        "id": 1,
        "username": username,
        "email": format!("{}@example.com", username),
        "total_points": 120,
        "preferred_language": "python"
    })
}

// ============================================================================
// Test 1: Authorization header carries the stored token
// ============================================================================

#[tokio::test]
async fn test_token_attached_to_requests() {
    let mock_server = MockServer::start().await;
    let (client, store) = client_for(&mock_server);
    seed_tokens(&store, "tok-1", None);

    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .and(header("Authorization", "Token tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json("ada")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let profile = client.fetch_profile().await.expect("fetch_profile failed");
    assert_eq!(profile.username, "ada");
}

// ============================================================================
// Test 2: One 401 triggers exactly one refresh and one retry
// ============================================================================

#[tokio::test]
async fn test_single_refresh_and_retry_on_401() {
    let mock_server = MockServer::start().await;
    let (client, store) = client_for(&mock_server);
    seed_tokens(&store, "old-token", Some("ref-1"));

    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .and(header("Authorization", "Token old-token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/users/refresh/"))
        .and(body_json(serde_json::json!({"refresh_token": "ref-1"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": "new-token"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .and(header("Authorization", "Token new-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json("ada")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let profile = client.fetch_profile().await.expect("retried request failed");
    assert_eq!(profile.username, "ada");

    // New token replaces the old one in storage
    assert_eq!(
        store.get(CredentialKey::AccessToken),
        Some("new-token".to_string())
    );
}

// ============================================================================
// Test 3: The refreshed token is used by subsequent requests
// ============================================================================

#[tokio::test]
async fn test_refreshed_token_used_for_subsequent_requests() {
    let mock_server = MockServer::start().await;
    let (client, store) = client_for(&mock_server);
    seed_tokens(&store, "old-token", Some("ref-1"));

    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .and(header("Authorization", "Token old-token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/users/refresh/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": "new-token"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .and(header("Authorization", "Token new-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json("ada")))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/challenges/categories/"))
        .and(header("Authorization", "Token new-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    client.fetch_profile().await.expect("retried request failed");
    let categories = client.fetch_categories().await.expect("follow-up request failed");
    assert!(categories.is_empty());
}

// ============================================================================
// Test 4: A second 401 on the retried request propagates, no loop
// ============================================================================

#[tokio::test]
async fn test_second_401_propagates_without_second_refresh() {
    let mock_server = MockServer::start().await;
    let (client, store) = client_for(&mock_server);
    seed_tokens(&store, "old-token", Some("ref-1"));

    // The server rejects every token, fresh or not
    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/users/refresh/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": "new-token"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client.fetch_profile().await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
}

// ============================================================================
// Test 5: Failed refresh clears both tokens and terminates the session
// ============================================================================

#[tokio::test]
async fn test_refresh_failure_terminates_session() {
    let mock_server = MockServer::start().await;
    let (client, store) = client_for(&mock_server);
    seed_tokens(&store, "old-token", Some("expired-refresh"));

    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/users/refresh/"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({"error": "Refresh token expired"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client.fetch_profile().await;
    assert!(matches!(result, Err(ApiError::SessionExpired)));
    assert_eq!(store.get(CredentialKey::AccessToken), None);
    assert_eq!(store.get(CredentialKey::RefreshToken), None);
}

// ============================================================================
// Test 6: 401 with no refresh token terminates the session
// ============================================================================

#[tokio::test]
async fn test_missing_refresh_token_terminates_session() {
    let mock_server = MockServer::start().await;
    let (client, store) = client_for(&mock_server);
    seed_tokens(&store, "old-token", None);

    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client.fetch_profile().await;
    assert!(matches!(result, Err(ApiError::SessionExpired)));
    assert_eq!(store.get(CredentialKey::AccessToken), None);
}

// ============================================================================
// Test 7: 401 on a token-less request propagates untouched
// ============================================================================

#[tokio::test]
async fn test_unauthenticated_401_propagates() {
    let mock_server = MockServer::start().await;
    let (client, store) = client_for(&mock_server);

    Mock::given(method("POST"))
        .and(path("/api/users/login/"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({"error": "Invalid credentials"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let credentials = createathon_core::models::LoginRequest {
        username: "ada".to_string(),
        password: "wrong".to_string(),
    };
    let result = client.login(&credentials).await;

    // No refresh attempt is made and nothing gets cleared that wasn't
    // there to begin with
    assert!(matches!(result, Err(ApiError::Unauthorized)));
    assert_eq!(store.get(CredentialKey::AccessToken), None);
}

// ============================================================================
// Test 8: Concurrent 401s share a single refresh call
// ============================================================================

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let mock_server = MockServer::start().await;
    let (client, store) = client_for(&mock_server);
    seed_tokens(&store, "old-token", Some("ref-1"));

    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .and(header("Authorization", "Token old-token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/challenges/stats/"))
        .and(header("Authorization", "Token old-token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    // Slow refresh widens the race window; it must still run only once
    Mock::given(method("POST"))
        .and(path("/api/users/refresh/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"token": "new-token"}))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .and(header("Authorization", "Token new-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json("ada")))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/challenges/stats/"))
        .and(header("Authorization", "Token new-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "total_points": 10,
            "completed_challenges": 1,
            "in_progress_challenges": 0,
            "category_progress": []
        })))
        .mount(&mock_server)
        .await;

    let (profile, stats) = tokio::join!(client.fetch_profile(), client.fetch_stats());
    assert_eq!(profile.expect("profile fetch failed").username, "ada");
    assert_eq!(stats.expect("stats fetch failed").total_points, 10);
    assert_eq!(
        store.get(CredentialKey::AccessToken),
        Some("new-token".to_string())
    );
}
