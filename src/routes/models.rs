//! `GET /v1/models`
//!
//! Lists the model names clients may send. Any name is accepted upstream;
//! a name of three or more digits selects an assistant instead.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

/// Advertised model ids
pub const MODEL_IDS: &[&str] = &[
    "SparkDesk-v1.1",
    "SparkDesk-v2.1",
    "SparkDesk-v3.1",
    "SparkDesk-v3.5",
    "SparkDesk-v1",
    "SparkDesk-v1-vision",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub object: String,
    pub owned_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub object: String,
    pub data: Vec<Model>,
}

pub async fn list_models() -> (StatusCode, Json<ModelsResponse>) {
    let data = MODEL_IDS
        .iter()
        .map(|id| Model {
            id: id.to_string(),
            object: "model".to_string(),
            owned_by: "spark-bridge".to_string(),
        })
        .collect();

    (
        StatusCode::OK,
        Json(ModelsResponse {
            object: "list".to_string(),
            data,
        }),
    )
}
