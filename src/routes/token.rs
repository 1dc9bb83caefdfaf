//! Session token liveness check

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::{AppError, AppResult},
    spark::{SparkApi, SparkCredential},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct TokenCheckRequest {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TokenCheckResponse {
    pub live: bool,
}

/// Report whether a session token still maps to a logged-in user
///
/// Upstream failures count as "not live" rather than errors.
pub async fn check_token(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TokenCheckRequest>,
) -> AppResult<(StatusCode, Json<TokenCheckResponse>)> {
    let token = request.token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest("token must not be empty".to_string()));
    }

    let credential = SparkCredential::new(token);
    let fingerprint = credential.fingerprint();
    let live = match state.spark_client(credential).user_info().await {
        Ok(live) => live,
        Err(e) => {
            debug!(account = %fingerprint, error = %e, "Token check failed");
            false
        }
    };

    info!(account = %fingerprint, live, "Token checked");
    Ok((StatusCode::OK, Json(TokenCheckResponse { live })))
}
