//! Authentication middleware
//!
//! The bearer token is not ours to validate: it carries one or more Spark
//! session tokens, comma-separated. One is picked per request and handed to
//! the handlers as a [`SparkCredential`].

use axum::{extract::Request, http::header, middleware::Next, response::Response};
use tracing::{debug, instrument, warn};

use crate::{error::AppError, spark::SparkCredential};

/// Extract the bearer token from an Authorization header value
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// Authentication middleware
///
/// 1. Extracts the bearer token from the Authorization header
/// 2. Picks one session token at random from the comma-separated list
/// 3. Adds the resulting [`SparkCredential`] to request extensions
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn auth_middleware(mut request: Request, next: Next) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let tokens = extract_bearer_token(auth_header).ok_or(AppError::InvalidToken)?;

    let credential = SparkCredential::pick(tokens).ok_or_else(|| {
        warn!("Authorization header carries no session token");
        AppError::InvalidToken
    })?;

    debug!(account = %credential.fingerprint(), "Session token selected");

    request.extensions_mut().insert(credential);

    Ok(next.run(request).await)
}
