//! Image generation endpoint

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    Json,
};
use tracing::Instrument;

use crate::{
    chat::{response::unix_timestamp, ImageData, ImageGenerationRequest, ImageGenerationResponse},
    error::{AppError, AppResult},
    logging::RequestContext,
    routes::{
        chat::{credential_from, json_body},
        metrics::record_request,
    },
    AppState,
};

const ENDPOINT: &str = "/v1/images/generations";

/// Generate images from a prompt
pub async fn generate_images(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> AppResult<(StatusCode, Json<ImageGenerationResponse>)> {
    let credential = credential_from(&request)?;
    let image_request: ImageGenerationRequest = json_body(request).await?;

    if image_request.prompt.trim().is_empty() {
        return Err(AppError::BadRequest("prompt must not be empty".to_string()));
    }

    let ctx = RequestContext::new(ENDPOINT)
        .with_model(image_request.model.clone())
        .with_account(credential.fingerprint());
    ctx.log_request_start(1);

    let urls = state
        .orchestrator(credential)
        .generate_images(&image_request.model, &image_request.prompt)
        .instrument(ctx.create_span())
        .await
        .inspect_err(|e| {
            ctx.log_error(e);
            record_request(ENDPOINT, "error", ctx.elapsed_secs());
        })?;

    ctx.log_request_complete();
    record_request(ENDPOINT, "success", ctx.elapsed_secs());

    Ok((
        StatusCode::OK,
        Json(ImageGenerationResponse {
            created: unix_timestamp(),
            data: urls.into_iter().map(|url| ImageData { url }).collect(),
        }),
    ))
}
