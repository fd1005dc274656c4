//! Provider data endpoints: live, not connected and degraded results

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use pulselink_core::{Credential, Provider};
use serde_json::json;
use tests::fixtures::{expired_access_token, live_access_token, oauth_app, TEST_CLIENT};
use tests::gateway::TestGateway;
use tests::logs::LogCapture;
use wiremock::matchers::{any, body_partial_json, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup() -> (MockServer, TestGateway) {
    let server = MockServer::start().await;
    let gw = TestGateway::new(oauth_app(), &server.uri());
    (server, gw)
}

async fn forbid_network(server: &MockServer) {
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_not_connected_returns_fallback_without_network() {
    let (server, gw) = setup().await;
    forbid_network(&server).await;

    let uri = "/providers/ga4/data?clientId=clinic-7&startDate=2026-01-01&endDate=2026-01-07";
    let first = gw.get(uri).await;
    let second = gw.get(uri).await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.json["ok"], true);
    assert_eq!(first.json["provider"], "ga4");
    assert_eq!(first.json["connected"], false);
    assert_eq!(first.json["source"], "fallback");
    assert_eq!(first.json["data"]["kind"], "analytics");
    assert_eq!(first.json["data"]["rows"].as_array().unwrap().len(), 7);
    // Fallback data is deterministic for the same request
    assert_eq!(first.json, second.json);
}

#[tokio::test]
async fn test_live_analytics_report() {
    let (server, gw) = setup().await;
    gw.credentials
        .save(&live_access_token(TEST_CLIENT, Provider::Ga4, "ya29.ga4"))
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/v1beta/properties/123456:runReport"))
        .and(header("authorization", "Bearer ya29.ga4"))
        .and(body_partial_json(json!({
            "dateRanges": [{"startDate": "2026-01-01", "endDate": "2026-01-02"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rows": [
                {
                    "dimensionValues": [{"value": "20260102"}],
                    "metricValues": [{"value": "30"}, {"value": "20"}, {"value": "2"}]
                },
                {
                    "dimensionValues": [{"value": "20260101"}],
                    "metricValues": [{"value": "10"}, {"value": "8"}, {"value": "1"}]
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = gw
        .get("/providers/ga4/data?clientId=clinic-7&propertyId=properties/123456&startDate=2026-01-01&endDate=2026-01-02")
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["connected"], true);
    assert_eq!(response.json["source"], "live");
    let data = &response.json["data"];
    assert_eq!(data["propertyId"], "123456");
    assert_eq!(data["rows"][0]["date"], "2026-01-01");
    assert_eq!(
        data["totals"],
        json!({"sessions": 40, "activeUsers": 28, "conversions": 3})
    );
}

#[tokio::test]
async fn test_live_search_console_with_performance() {
    let (server, gw) = setup().await;
    gw.credentials
        .save(&live_access_token(TEST_CLIENT, Provider::Gsc, "ya29.gsc"))
        .await
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/webmasters/v3/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "siteEntry": [
                {"siteUrl": "sc-domain:example.com", "permissionLevel": "siteOwner"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/webmasters/v3/sites/.+/searchAnalytics/query$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rows": [
                {"keys": ["2026-01-01"], "clicks": 5, "impressions": 100, "ctr": 0.05, "position": 4.0},
                {"keys": ["2026-01-02"], "clicks": 15, "impressions": 300, "ctr": 0.05, "position": 8.0}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = gw
        .get("/providers/gsc/data?clientId=clinic-7&siteUrl=sc-domain:example.com&startDate=2026-01-01&endDate=2026-01-02")
        .await;

    assert_eq!(response.json["source"], "live");
    let data = &response.json["data"];
    assert_eq!(data["kind"], "search_console");
    assert_eq!(data["sites"][0]["siteUrl"], "sc-domain:example.com");
    assert_eq!(data["performance"]["clicks"], 20);
    assert_eq!(data["performance"]["impressions"], 400);
    assert_eq!(data["performance"]["ctr"], 0.05);
    assert_eq!(data["performance"]["position"], 7.0);
}

#[tokio::test]
async fn test_live_business_profile() {
    let (server, gw) = setup().await;
    gw.credentials
        .save(&live_access_token(TEST_CLIENT, Provider::Gbp, "ya29.gbp"))
        .await
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accounts": [
                {"name": "accounts/42", "accountName": "Smile Dental", "type": "LOCATION_GROUP"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/accounts/42/locations"))
        .and(query_param("pageSize", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "locations": [{
                "name": "locations/7",
                "title": "Smile Dental Downtown",
                "storefrontAddress": {
                    "addressLines": ["1 Main St"],
                    "locality": "Springfield",
                    "administrativeArea": "IL",
                    "postalCode": "62701"
                },
                "phoneNumbers": {"primaryPhone": "(217) 555-0100"},
                "websiteUri": "https://smile.example.com"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = gw.get("/providers/gbp/data?clientId=clinic-7").await;

    assert_eq!(response.json["source"], "live");
    let data = &response.json["data"];
    assert_eq!(data["kind"], "business_profile");
    assert_eq!(data["accounts"][0]["name"], "accounts/42");
    assert_eq!(data["locations"][0]["title"], "Smile Dental Downtown");
    assert_eq!(data["locations"][0]["phone"], "(217) 555-0100");
}

#[tokio::test]
async fn test_upstream_error_degrades_to_fallback() {
    let (server, gw) = setup().await;
    gw.credentials
        .save(&live_access_token(TEST_CLIENT, Provider::Gbp, "ya29.gbp"))
        .await
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/v1/accounts"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .expect(1)
        .mount(&server)
        .await;

    let response = gw.get("/providers/gbp/data?clientId=clinic-7").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["connected"], true);
    assert_eq!(response.json["source"], "fallback");
    assert_eq!(response.json["data"]["kind"], "business_profile");
}

#[tokio::test]
async fn test_upstream_failure_is_logged_not_returned() {
    let (server, gw) = setup().await;
    gw.credentials
        .save(&live_access_token(TEST_CLIENT, Provider::Gsc, "ya29.gsc-secret"))
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path_regex(r"^/webmasters/v3/sites/.+/searchAnalytics/query$"))
        .respond_with(ResponseTemplate::new(503).set_body_string("quota backend exploded"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/webmasters/v3/sites"))
        .respond_with(ResponseTemplate::new(503).set_body_string("quota backend exploded"))
        .mount(&server)
        .await;

    let capture = LogCapture::default();
    let response = {
        let _guard = capture.install();
        gw.get("/providers/gsc/data?clientId=clinic-7&siteUrl=https%3A%2F%2Fclinic.example")
            .await
    };

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["connected"], true);
    assert_eq!(response.json["source"], "fallback");
    let payload = response.json.to_string();
    assert!(!payload.contains("quota backend exploded"));
    assert!(!payload.contains("HTTP 503"));

    let logs = capture.contents();
    assert!(logs.contains("[Facade] Live fetch failed"), "logs: {}", logs);
    assert!(logs.contains("HTTP 503"));
    assert!(!logs.contains("ya29.gsc-secret"));
}

#[tokio::test]
async fn test_expired_token_without_refresh_degrades_without_network() {
    let (server, gw) = setup().await;
    forbid_network(&server).await;
    gw.credentials
        .save(&expired_access_token(TEST_CLIENT, Provider::Gsc, "ya29.old"))
        .await
        .unwrap();

    let response = gw.get("/providers/gsc/data?clientId=clinic-7").await;

    assert_eq!(response.json["connected"], true);
    assert_eq!(response.json["source"], "fallback");
}

#[tokio::test]
async fn test_expired_token_is_refreshed_before_fetch() {
    let (server, gw) = setup().await;
    gw.credentials
        .save_all(&[
            expired_access_token(TEST_CLIENT, Provider::Gsc, "ya29.old"),
            Credential::refresh_token(TEST_CLIENT, Provider::Gsc, "1//refresh"),
        ])
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.new",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/webmasters/v3/sites"))
        .and(header("authorization", "Bearer ya29.new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"siteEntry": []})))
        .expect(1)
        .mount(&server)
        .await;

    let response = gw.get("/providers/gsc/data?clientId=clinic-7").await;
    assert_eq!(response.json["source"], "live");
}

#[tokio::test]
async fn test_connected_analytics_requires_property_id() {
    let (server, gw) = setup().await;
    forbid_network(&server).await;
    gw.credentials
        .save(&live_access_token(TEST_CLIENT, Provider::Ga4, "ya29.ga4"))
        .await
        .unwrap();

    let response = gw.get("/providers/ga4/data?clientId=clinic-7").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json["code"], "invalid_request");
}

#[tokio::test]
async fn test_invalid_dates_are_rejected() {
    let (_server, gw) = setup().await;

    let response = gw
        .get("/providers/gsc/data?clientId=clinic-7&startDate=01-02-2026")
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = gw
        .get("/providers/gsc/data?clientId=clinic-7&startDate=2026-02-01&endDate=2026-01-01")
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_provider_data_is_400() {
    let (_server, gw) = setup().await;
    let response = gw.get("/providers/twitter/data?clientId=clinic-7").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json["code"], "unsupported_provider");
}
