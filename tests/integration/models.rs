//! Models endpoint integration tests
//!
//! Tests for GET /v1/models.

use axum::http::StatusCode;
use serde_json::Value;
use spark_bridge::routes::models::MODEL_IDS;

use crate::common::create_test_server;

#[tokio::test]
async fn test_list_models_format() {
    let server = create_test_server("http://127.0.0.1:9");

    let response = server.get("/v1/models").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["object"], "list");

    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), MODEL_IDS.len());
    for (model, id) in data.iter().zip(MODEL_IDS) {
        assert_eq!(model["id"], *id);
        assert_eq!(model["object"], "model");
        assert_eq!(model["owned_by"], "spark-bridge");
    }
}

#[tokio::test]
async fn test_list_models_includes_vision_model() {
    let server = create_test_server("http://127.0.0.1:9");

    let body: Value = server.get("/v1/models").await.json();
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|m| m["id"].as_str())
        .collect();
    assert!(ids.contains(&"SparkDesk-v1-vision"));
}
