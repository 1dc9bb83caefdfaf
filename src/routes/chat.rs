//! `POST /v1/chat/completions`
//!
//! `stream: true` answers with SSE chunks once the Spark event stream is
//! open; otherwise the events are folded into one completion object.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{warn, Instrument};

use crate::{
    chat::ChatCompletionRequest,
    error::{AppError, AppResult},
    logging::RequestContext,
    routes::metrics::record_request,
    spark::SparkCredential,
    AppState,
};

const ENDPOINT: &str = "/v1/chat/completions";

/// Take the credential picked by the auth middleware
pub(crate) fn credential_from(request: &Request) -> AppResult<SparkCredential> {
    request
        .extensions()
        .get::<SparkCredential>()
        .cloned()
        .ok_or_else(|| {
            warn!("SparkCredential not found in request extensions");
            AppError::Unauthorized
        })
}

/// Read and parse a JSON request body, reporting failures as bad requests
pub(crate) async fn json_body<T: serde::de::DeserializeOwned>(request: Request) -> AppResult<T> {
    let body = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read request body: {}", e)))?;

    serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))
}

pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, AppError> {
    let credential = credential_from(&request)?;
    let chat_request: ChatCompletionRequest = json_body(request).await?;

    if chat_request.messages.is_empty() {
        return Err(AppError::BadRequest("messages must not be empty".to_string()));
    }

    let ctx = RequestContext::new(ENDPOINT)
        .with_model(chat_request.model.clone())
        .with_streaming(chat_request.stream)
        .with_account(credential.fingerprint());
    ctx.log_request_start(chat_request.messages.len());

    let orchestrator = state.orchestrator(credential);

    if chat_request.stream {
        let stream = orchestrator
            .complete_stream(&chat_request)
            .instrument(ctx.create_span())
            .await
            .inspect_err(|e| {
                ctx.log_error(e);
                record_request(ENDPOINT, "error", ctx.elapsed_secs());
            })?;

        ctx.log_stream_started();
        record_request(ENDPOINT, "streaming", ctx.elapsed_secs());

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::CONNECTION, "keep-alive")
            .header("X-Accel-Buffering", "no")
            .body(Body::from_stream(stream))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build response: {}", e)))
    } else {
        let completion = orchestrator
            .complete(&chat_request)
            .instrument(ctx.create_span())
            .await
            .inspect_err(|e| {
                ctx.log_error(e);
                record_request(ENDPOINT, "error", ctx.elapsed_secs());
            })?;

        ctx.log_request_complete();
        record_request(ENDPOINT, "success", ctx.elapsed_secs());

        Ok((StatusCode::OK, Json(completion)).into_response())
    }
}
