//! Token check integration tests
//!
//! Tests for POST /token/check.

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::create_test_server;
use crate::mocks::{MockSparkServer, USER_INFO_PATH};

#[tokio::test]
async fn test_token_check_live() {
    let spark = MockSparkServer::start().await;
    spark.mock_user_info_live().await;
    let server = create_test_server(&spark.uri());

    let response = server
        .post("/token/check")
        .json(&json!({ "token": "live-session" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body, json!({ "live": true }));

    let calls = spark.requests_to(USER_INFO_PATH).await;
    assert_eq!(calls.len(), 1);
    let cookie = calls[0]
        .headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.contains("ssoSessionId=live-session"));
}

#[tokio::test]
async fn test_token_check_expired() {
    let spark = MockSparkServer::start().await;
    spark.mock_user_info_expired().await;
    let server = create_test_server(&spark.uri());

    let response = server
        .post("/token/check")
        .json(&json!({ "token": "stale-session" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["live"], false);
}

#[tokio::test]
async fn test_token_check_upstream_failure_is_not_live() {
    // No mocks mounted: the mock server answers 404 with an empty body
    let spark = MockSparkServer::start().await;
    let server = create_test_server(&spark.uri());

    let response = server
        .post("/token/check")
        .json(&json!({ "token": "any" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["live"], false);
}

#[tokio::test]
async fn test_token_check_rejects_empty_token() {
    let spark = MockSparkServer::start().await;
    let server = create_test_server(&spark.uri());

    let response = server
        .post("/token/check")
        .json(&json!({ "token": "  " }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(spark.received_requests().await.is_empty());
}
