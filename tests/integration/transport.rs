//! Upstream transport integration tests
//!
//! Content-encoded Spark responses and event streams that stop writing.

use std::time::Duration;

use axum::http::{header, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::Value;
use spark_bridge::{config::RetryPolicy, SparkApi, SparkClient, SparkCredential};

use crate::common::{
    bearer, constants::TEST_SESSION_TOKEN, create_test_server_with_config, sse_chunks,
    sse_payloads, test_config, test_data,
};
use crate::mocks::{gzip_spark, stalled_spark, RawUpstream, SparkEvents, CREATE_CHAT_PATH, TEST_CHAT_ID};

const GUARD: Duration = Duration::from_secs(10);

#[tokio::test]
async fn test_upstream_compresses_for_browser_headers() {
    let upstream = RawUpstream::start(gzip_spark(String::new())).await;

    // Client that leaves the body encoded, to confirm the fixture compresses
    let raw_client = reqwest::Client::builder().no_gzip().build().unwrap();
    let response = raw_client
        .post(format!("{}{}", upstream.uri(), CREATE_CHAT_PATH))
        .header(header::ACCEPT_ENCODING, "gzip, deflate, br, zstd")
        .send()
        .await
        .unwrap();

    assert_eq!(
        response.headers().get(header::CONTENT_ENCODING).unwrap(),
        "gzip"
    );
}

#[tokio::test]
async fn test_gzip_envelope_is_decoded() {
    let upstream = RawUpstream::start(gzip_spark(String::new())).await;
    let client = SparkClient::new(
        reqwest::Client::new(),
        &test_config(&upstream.uri()),
        SparkCredential::new(TEST_SESSION_TOKEN),
    );

    let chat_id = client.create_conversation(None).await.unwrap();

    assert_eq!(chat_id, TEST_CHAT_ID.to_string());
}

#[tokio::test]
async fn test_gzip_event_stream_is_decoded() {
    let events = SparkEvents::answer(&["Hel", "lo"], "cht1");
    let upstream = RawUpstream::start(gzip_spark(events)).await;
    let server = create_test_server_with_config(test_config(&upstream.uri()));

    let response = server
        .post("/v1/chat/completions")
        .add_header(header::AUTHORIZATION, bearer(TEST_SESSION_TOKEN))
        .json(&test_data::chat_request("Hi"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["choices"][0]["message"]["content"], "Hello");
    assert_eq!(body["id"], format!("{}:cht1", TEST_CHAT_ID));
}

fn stalling_config(uri: &str) -> spark_bridge::Config {
    let mut config = test_config(uri);
    config.timeouts.chat = Duration::from_secs(1);
    config.retry = RetryPolicy {
        max_retries: 0,
        delay: Duration::from_millis(10),
    };
    config
}

#[tokio::test]
async fn test_stalled_stream_times_out_aggregated() {
    let upstream = RawUpstream::start(stalled_spark(SparkEvents::text("partial"))).await;
    let server = create_test_server_with_config(stalling_config(&upstream.uri()));

    let response = tokio::time::timeout(GUARD, async {
        server
            .post("/v1/chat/completions")
            .add_header(header::AUTHORIZATION, bearer(TEST_SESSION_TOKEN))
            .json(&test_data::chat_request("Hi"))
            .await
    })
    .await
    .expect("stalled upstream kept the request pending");

    assert_eq!(response.status_code(), StatusCode::GATEWAY_TIMEOUT);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "timeout");
}

#[tokio::test]
async fn test_stalled_stream_still_sends_done() {
    let upstream = RawUpstream::start(stalled_spark(SparkEvents::text("partial"))).await;
    let server = create_test_server_with_config(stalling_config(&upstream.uri()));

    let response = tokio::time::timeout(GUARD, async {
        server
            .post("/v1/chat/completions")
            .add_header(header::AUTHORIZATION, bearer(TEST_SESSION_TOKEN))
            .json(&test_data::streaming_chat_request("Hi"))
            .await
    })
    .await
    .expect("stalled upstream kept the stream open");

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.text();
    let contents: Vec<String> = sse_chunks(&body)
        .iter()
        .filter_map(|c| c["choices"][0]["delta"]["content"].as_str().map(str::to_string))
        .collect();
    assert_eq!(contents, vec!["".to_string(), "partial".to_string()]);
    assert_eq!(sse_payloads(&body).last().map(String::as_str), Some("[DONE]"));
}
