//! HTTP surface of the bridge

pub mod chat;
pub mod health;
pub mod images;
pub mod metrics;
pub mod models;
pub mod token;

use std::sync::Arc;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{middleware::auth::auth_middleware, AppState};

/// Endpoints that act on a Spark account and so need a session token
fn account_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/chat/completions", post(chat::chat_completions))
        .route("/v1/images/generations", post(images::generate_images))
        .route_layer(from_fn(auth_middleware))
}

/// `/token/check` reads the token from its body, not from the header.
fn open_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/models", get(models::list_models))
        .route("/token/check", post(token::check_token))
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/live", get(health::liveness_check))
        .route("/metrics", get(metrics::prometheus_metrics))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    account_routes()
        .merge(open_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
