//! AuthorizationService end to end against a mock token endpoint

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use pretty_assertions::assert_eq;
use pulselink_core::{
    AuthorizationStateRepository, ConnectError, Credential, CredentialRepository, CredentialType,
    Provider,
};
use pulselink_gateway::oauth::OAuthFlow;
use pulselink_gateway::services::AuthorizationService;
use pulselink_gateway::GoogleEndpoints;
use pulselink_storage::{Database, SqliteAuthorizationStateRepository, SqliteCredentialRepository};
use serde_json::json;
use tests::db::count_rows;
use tests::fixtures::{expired_access_token, oauth_app, test_encryptor, TEST_CLIENT};
use tokio::sync::Mutex;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    db: Arc<Mutex<Database>>,
    service: AuthorizationService,
    credentials: Arc<dyn CredentialRepository>,
    states: Arc<dyn AuthorizationStateRepository>,
}

fn harness(server: &MockServer) -> Harness {
    let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
    let encryptor = test_encryptor();
    let credentials: Arc<dyn CredentialRepository> =
        Arc::new(SqliteCredentialRepository::new(db.clone(), encryptor.clone()));
    let states: Arc<dyn AuthorizationStateRepository> =
        Arc::new(SqliteAuthorizationStateRepository::new(db.clone(), encryptor));

    let flow = Arc::new(OAuthFlow::new(
        reqwest::Client::new(),
        GoogleEndpoints::with_base(&server.uri()),
        oauth_app(),
    ));
    let service = AuthorizationService::new(
        flow,
        credentials.clone(),
        states.clone(),
        Duration::minutes(10),
    );
    Harness {
        db,
        service,
        credentials,
        states,
    }
}

fn state_from(url: &str) -> String {
    let query: HashMap<String, String> = url::Url::parse(url)
        .unwrap()
        .query_pairs()
        .into_owned()
        .collect();
    query["state"].clone()
}

async fn mount_token(server: &MockServer, body: serde_json::Value, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_authorization_persists_both_tokens() {
    let server = MockServer::start().await;
    mount_token(
        &server,
        json!({
            "access_token": "ya29.access",
            "refresh_token": "1//refresh",
            "expires_in": 3599,
            "token_type": "Bearer",
            "scope": "https://www.googleapis.com/auth/analytics.readonly"
        }),
        1,
    )
    .await;
    let h = harness(&server);

    let started = h.service.start("ga4", TEST_CLIENT).await.unwrap();
    assert_eq!(started.provider, Provider::Ga4);
    let state = state_from(&started.url);

    let completed = h
        .service
        .complete("ga4", Some("4/0code"), Some(&state), None)
        .await
        .unwrap();
    assert_eq!(completed.client_id, TEST_CLIENT);
    assert!(completed.has_refresh_token);

    let access = h
        .credentials
        .get(TEST_CLIENT, Provider::Ga4, CredentialType::AccessToken)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(access.value, "ya29.access");
    let refresh = h
        .credentials
        .get(TEST_CLIENT, Provider::Ga4, CredentialType::RefreshToken)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refresh.value, "1//refresh");
    assert_eq!(count_rows(&h.db, "authorization_states").await, 0);
}

#[tokio::test]
async fn test_replayed_callback_is_rejected_without_second_exchange() {
    let server = MockServer::start().await;
    mount_token(&server, json!({"access_token": "a", "expires_in": 3600}), 1).await;
    let h = harness(&server);

    let state = state_from(&h.service.start("gsc", TEST_CLIENT).await.unwrap().url);
    h.service
        .complete("gsc", Some("code"), Some(&state), None)
        .await
        .unwrap();

    let replay = h
        .service
        .complete("gsc", Some("code"), Some(&state), None)
        .await;
    assert!(matches!(replay, Err(ConnectError::InvalidCallback(_))));
}

#[tokio::test]
async fn test_failed_exchange_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&server)
        .await;
    let h = harness(&server);

    let state = state_from(&h.service.start("gbp", TEST_CLIENT).await.unwrap().url);
    let err = h
        .service
        .complete("gbp", Some("bad-code"), Some(&state), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectError::UpstreamAuthFailure { status: 400, .. }));
    assert_eq!(count_rows(&h.db, "credentials").await, 0);
    // The state is spent; the user restarts the flow
    assert_eq!(count_rows(&h.db, "authorization_states").await, 0);
}

#[tokio::test]
async fn test_callback_on_wrong_provider_route() {
    let server = MockServer::start().await;
    mount_token(&server, json!({"access_token": "a"}), 0).await;
    let h = harness(&server);

    let state = state_from(&h.service.start("ga4", TEST_CLIENT).await.unwrap().url);
    let err = h
        .service
        .complete("gsc", Some("code"), Some(&state), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectError::InvalidCallback(_)));
    assert_eq!(count_rows(&h.db, "credentials").await, 0);
}

#[tokio::test]
async fn test_denied_consent_burns_state() {
    let server = MockServer::start().await;
    mount_token(&server, json!({"access_token": "a"}), 0).await;
    let h = harness(&server);

    let state = state_from(&h.service.start("gsc", TEST_CLIENT).await.unwrap().url);
    let err = h
        .service
        .complete("gsc", None, Some(&state), Some("access_denied"))
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectError::InvalidCallback(_)));
    assert!(h.states.consume(&state).await.unwrap().is_none());
}

#[tokio::test]
async fn test_ensure_fresh_refreshes_expired_token_and_keeps_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.renewed",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&server)
        .await;
    let h = harness(&server);

    h.credentials
        .save_all(&[
            expired_access_token(TEST_CLIENT, Provider::Gsc, "ya29.old"),
            Credential::refresh_token(TEST_CLIENT, Provider::Gsc, "1//keep"),
        ])
        .await
        .unwrap();

    assert!(h.service.ensure_fresh(TEST_CLIENT, Provider::Gsc).await.unwrap());

    let access = h
        .credentials
        .get(TEST_CLIENT, Provider::Gsc, CredentialType::AccessToken)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(access.value, "ya29.renewed");
    assert!(!access.is_expired());
    let refresh = h
        .credentials
        .get(TEST_CLIENT, Provider::Gsc, CredentialType::RefreshToken)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refresh.value, "1//keep");
}

#[tokio::test]
async fn test_refresh_without_refresh_token() {
    let server = MockServer::start().await;
    mount_token(&server, json!({"access_token": "a"}), 0).await;
    let h = harness(&server);

    let err = h
        .service
        .refresh(TEST_CLIENT, Provider::Ga4)
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectError::CredentialNotFound { .. }));
}

#[tokio::test]
async fn test_out_of_range_expiry_persists_nothing() {
    let server = MockServer::start().await;
    mount_token(
        &server,
        json!({"access_token": "a", "refresh_token": "r", "expires_in": i64::MAX}),
        1,
    )
    .await;
    let h = harness(&server);

    let state = state_from(&h.service.start("gbp", TEST_CLIENT).await.unwrap().url);
    let result = h
        .service
        .complete("gbp", Some("code"), Some(&state), None)
        .await;

    assert!(matches!(
        result,
        Err(ConnectError::UpstreamAuthFailure { status: 502, .. })
    ));
    assert_eq!(count_rows(&h.db, "credentials").await, 0);
}
