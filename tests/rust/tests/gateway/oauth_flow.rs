//! OAuth lifecycle over HTTP: start, callback, connections, disconnect

use std::collections::HashMap;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use pulselink_gateway::OAuthAppConfig;
use serde_json::json;
use tests::db::count_rows;
use tests::fixtures::oauth_app;
use tests::gateway::TestGateway;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn query_of(url: &str) -> HashMap<String, String> {
    url::Url::parse(url)
        .unwrap()
        .query_pairs()
        .into_owned()
        .collect()
}

async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.connected",
            "refresh_token": "1//offline",
            "expires_in": 3599,
            "token_type": "Bearer",
            "scope": "https://www.googleapis.com/auth/webmasters.readonly"
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_connect_search_console_end_to_end() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    Mock::given(method("GET"))
        .and(path("/webmasters/v3/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "siteEntry": [{"siteUrl": "https://clinic.example.com/", "permissionLevel": "siteFullUser"}]
        })))
        .mount(&server)
        .await;
    let gw = TestGateway::new(oauth_app(), &server.uri());

    // 1. Start
    let started = gw.get("/oauth-start?provider=gsc&clientId=clinic-7").await;
    assert_eq!(started.status, StatusCode::OK);
    assert_eq!(started.json["ok"], true);
    assert_eq!(started.json["provider"], "gsc");
    let url = started.json["url"].as_str().unwrap();
    let params = query_of(url);
    assert_eq!(
        params["scope"],
        "https://www.googleapis.com/auth/webmasters.readonly"
    );
    assert_eq!(params["redirect_uri"], "https://app.example.com/callback/gsc");
    assert_eq!(params["access_type"], "offline");
    assert_eq!(count_rows(&gw.db, "authorization_states").await, 1);

    // 2. Callback
    let callback = gw
        .get(&format!("/callback/gsc?code=4%2F0code&state={}", params["state"]))
        .await;
    assert_eq!(callback.status, StatusCode::OK);
    assert_eq!(callback.json["connected"], true);
    assert_eq!(callback.json["clientId"], "clinic-7");
    assert_eq!(callback.json["offlineAccess"], true);
    assert_eq!(count_rows(&gw.db, "credentials").await, 2);

    // Replaying the same callback fails
    let replay = gw
        .get(&format!("/callback/gsc?code=4%2F0code&state={}", params["state"]))
        .await;
    assert_eq!(replay.status, StatusCode::BAD_REQUEST);
    assert_eq!(replay.json["code"], "invalid_callback");

    // 3. Connections
    let connections = gw.get("/connections?clientId=clinic-7").await;
    assert_eq!(connections.json["connected"], json!(["gsc"]));
    assert_eq!(connections.json["missing"], json!(["ga4", "gbp"]));

    // 4. Sites
    let sites = gw.get("/gsc/sites?clientId=clinic-7").await;
    assert_eq!(sites.status, StatusCode::OK);
    assert_eq!(sites.json["success"], true);
    assert_eq!(sites.json["source"], "live");
    assert_eq!(sites.json["sites"][0]["siteUrl"], "https://clinic.example.com/");

    // 5. Disconnect
    let disconnected = gw
        .post_json(
            "/oauth-disconnect",
            json!({"clientId": "clinic-7", "provider": "gsc"}),
        )
        .await;
    assert_eq!(disconnected.status, StatusCode::OK);
    assert_eq!(disconnected.json["removed"], 2);

    let connections = gw.get("/connections?clientId=clinic-7").await;
    assert_eq!(connections.json["connected"], json!([]));
}

#[tokio::test]
async fn test_callback_redirects_when_configured() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    let gw = TestGateway::new(
        OAuthAppConfig {
            post_connect_redirect: Some("https://dashboard.example.com/settings".to_string()),
            ..oauth_app()
        },
        &server.uri(),
    );

    let started = gw.get("/oauth-start?provider=gsc&clientId=clinic-7").await;
    let state = query_of(started.json["url"].as_str().unwrap())["state"].clone();

    let callback = gw
        .get(&format!("/callback/gsc?code=abc&state={}", state))
        .await;
    assert!(callback.status.is_redirection());
    assert_eq!(
        callback.header("location"),
        Some("https://dashboard.example.com/settings?provider=gsc&status=connected")
    );
}

#[tokio::test]
async fn test_callback_with_unknown_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let gw = TestGateway::new(oauth_app(), &server.uri());

    let response = gw.get("/callback/ga4?code=abc&state=never-issued").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json["ok"], false);
    assert_eq!(response.json["code"], "invalid_callback");

    let response = gw.get("/callback/ga4?code=abc").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_denied_consent_is_400() {
    let server = MockServer::start().await;
    let gw = TestGateway::new(oauth_app(), &server.uri());

    let started = gw.get("/oauth-start?provider=gbp&clientId=clinic-7").await;
    let state = query_of(started.json["url"].as_str().unwrap())["state"].clone();

    let response = gw
        .get(&format!("/callback/gbp?error=access_denied&state={}", state))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(count_rows(&gw.db, "authorization_states").await, 0);
    assert_eq!(count_rows(&gw.db, "credentials").await, 0);
}

#[tokio::test]
async fn test_failed_exchange_is_502_and_stores_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&server)
        .await;
    let gw = TestGateway::new(oauth_app(), &server.uri());

    let started = gw.get("/oauth-start?provider=ga4&clientId=clinic-7").await;
    let state = query_of(started.json["url"].as_str().unwrap())["state"].clone();

    let response = gw
        .get(&format!("/callback/ga4?code=stale&state={}", state))
        .await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(response.json["code"], "upstream_auth_failure");
    assert_eq!(count_rows(&gw.db, "credentials").await, 0);
}
