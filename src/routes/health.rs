//! Probe endpoints: `/health`, `/health/ready`, `/health/live`
//!
//! The bridge holds no upstream connection between requests, so readiness
//! only checks that the configured Spark base URL is usable.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    fn code(self) -> StatusCode {
        match self {
            Self::Healthy => StatusCode::OK,
            Self::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Body of `GET /health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub timestamp: String,
    /// Spark base URL requests are forwarded to
    pub upstream: String,
    pub retry: RetrySummary,
}

#[derive(Debug, Serialize)]
pub struct RetrySummary {
    pub max_retries: u32,
    pub delay_ms: u64,
}

/// Body of the probe endpoints
#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

fn upstream_status(state: &AppState) -> Result<(), String> {
    let url = reqwest::Url::parse(&state.config.spark_base_url)
        .map_err(|e| format!("upstream url: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("upstream url: unsupported scheme {other}")),
    }
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let status = match upstream_status(&state) {
        Ok(()) => HealthStatus::Healthy,
        Err(_) => HealthStatus::Unhealthy,
    };
    let retry = &state.config.retry;

    let body = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        upstream: state.config.spark_base_url.clone(),
        retry: RetrySummary {
            max_retries: retry.max_retries,
            delay_ms: retry.delay.as_millis() as u64,
        },
    };
    (status.code(), Json(body))
}

/// 503 until the upstream base URL is usable
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ProbeResponse>) {
    let body = match upstream_status(&state) {
        Ok(()) => ProbeResponse {
            status: HealthStatus::Healthy,
            reason: None,
        },
        Err(reason) => ProbeResponse {
            status: HealthStatus::Unhealthy,
            reason: Some(reason),
        },
    };
    (body.status.code(), Json(body))
}

pub async fn liveness_check() -> Json<ProbeResponse> {
    Json(ProbeResponse {
        status: HealthStatus::Healthy,
        reason: None,
    })
}
