//! Common test utilities for Spark Bridge
//!
//! Shared fixtures and helpers used by the integration tests: a config that
//! points the bridge at a mock Spark server, a test router and request
//! payload builders.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum_test::TestServer;
use serde_json::Value;
use spark_bridge::{
    config::{RetryPolicy, Timeouts},
    routes::create_router,
    AppState, Config,
};

/// Test configuration constants
pub mod constants {
    /// Session token presented by test clients
    pub const TEST_SESSION_TOKEN: &str = "test-sso-session-id";
    /// Ceiling for referenced files in tests
    pub const TEST_MAX_FILE_SIZE: u64 = 1024;
    /// Retry delay in tests
    pub const TEST_RETRY_DELAY_MS: u64 = 10;
}

/// Bridge configuration pointing at `spark_url`
pub fn test_config(spark_url: &str) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        spark_base_url: spark_url.to_string(),
        retry: RetryPolicy {
            max_retries: 3,
            delay: Duration::from_millis(constants::TEST_RETRY_DELAY_MS),
        },
        timeouts: Timeouts {
            session: Duration::from_secs(5),
            transfer: Duration::from_secs(5),
            chat: Duration::from_secs(5),
        },
        max_file_size: constants::TEST_MAX_FILE_SIZE,
    }
}

/// Test server running the full bridge router against `spark_url`
pub fn create_test_server(spark_url: &str) -> TestServer {
    create_test_server_with_config(test_config(spark_url))
}

/// Test server running the full bridge router with `config`
pub fn create_test_server_with_config(config: Config) -> TestServer {
    let state = Arc::new(AppState::new(config).expect("Failed to build app state"));
    TestServer::new(create_router(state)).expect("Failed to create test server")
}

/// Authorization header value for `tokens`
pub fn bearer(tokens: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", tokens)).expect("valid header value")
}

/// Parse an SSE response body into its `data:` payloads
pub fn sse_payloads(body: &str) -> Vec<String> {
    body.split("\n\n")
        .filter_map(|event| event.trim().strip_prefix("data: "))
        .map(str::to_string)
        .collect()
}

/// Parse the JSON chunks of an SSE response body, skipping `[DONE]`
pub fn sse_chunks(body: &str) -> Vec<Value> {
    sse_payloads(body)
        .iter()
        .filter(|payload| payload.as_str() != "[DONE]")
        .map(|payload| serde_json::from_str(payload).expect("chunk is valid JSON"))
        .collect()
}

/// Sample request data for tests
pub mod test_data {
    use serde_json::{json, Value};

    /// Single-message chat request
    pub fn chat_request(content: &str) -> Value {
        json!({
            "model": "SparkDesk-v3.5",
            "messages": [
                { "role": "user", "content": content }
            ]
        })
    }

    /// Single-message streaming chat request
    pub fn streaming_chat_request(content: &str) -> Value {
        let mut request = chat_request(content);
        request["stream"] = json!(true);
        request
    }

    /// Multi-turn chat request
    pub fn multi_turn_request() -> Value {
        json!({
            "model": "SparkDesk-v3.5",
            "messages": [
                { "role": "system", "content": "You are terse." },
                { "role": "user", "content": "What is 2+2?" },
                { "role": "assistant", "content": "4" },
                { "role": "user", "content": "And 3+3?" }
            ]
        })
    }

    /// Chat request whose last message references `url`
    pub fn chat_request_with_file(text: &str, part_type: &str, url: &str) -> Value {
        let part = match part_type {
            "image_url" => json!({ "type": "image_url", "image_url": { "url": url } }),
            _ => json!({ "type": "file", "file_url": { "url": url } }),
        };
        json!({
            "model": "SparkDesk-v3.5",
            "messages": [
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": text },
                        part
                    ]
                }
            ]
        })
    }

    /// Image generation request
    pub fn image_request(prompt: &str) -> Value {
        json!({ "model": "SparkDesk-v3.5", "prompt": prompt })
    }
}
