//! Bridge error taxonomy
//!
//! Shared by the upstream client, the conversation engine and the handlers.
//! Every variant renders as an OpenAI-style `{"error": {...}}` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing bearer session token")]
    Unauthorized,

    #[error("Malformed bearer session token")]
    InvalidToken,

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Upstream answered with a non-zero envelope code
    #[error("Spark request failed: [{code}] {message}")]
    UpstreamRequestFailed { code: i64, message: String },

    /// Referenced file is unreachable or its probe returned 4xx/5xx
    #[error("File URL invalid: {0}")]
    FileUrlInvalid(String),

    /// Referenced file exceeds the configured ceiling
    #[error("File too large: {0}")]
    FileTooLarge(String),

    #[error("Image generation failed: no images were returned")]
    ImageGenerationFailed,

    /// Upstream payload could not be interpreted
    #[error("Unexpected Spark payload: {0}")]
    UpstreamError(String),

    #[error("Upstream timed out: {0}")]
    Timeout(String),

    /// Malformed event body; the decoder logs these and keeps the stream alive
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Spark transport failure: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Malformed JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Bridge failure: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable label, used as the `code` field and in metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::InvalidToken => "invalid_token",
            Self::BadRequest(_) => "bad_request",
            Self::UpstreamRequestFailed { .. } => "upstream_request_failed",
            Self::FileUrlInvalid(_) => "file_url_invalid",
            Self::FileTooLarge(_) => "file_too_large",
            Self::ImageGenerationFailed => "image_generation_failed",
            Self::UpstreamError(_) => "upstream_error",
            Self::Timeout(_) => "timeout",
            Self::Decode(_) => "decode_error",
            Self::HttpError(_) => "transport_error",
            Self::JsonError(_) => "invalid_json",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_)
            | Self::FileUrlInvalid(_)
            | Self::FileTooLarge(_)
            | Self::JsonError(_) => StatusCode::BAD_REQUEST,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamRequestFailed { .. }
            | Self::ImageGenerationFailed
            | Self::UpstreamError(_)
            | Self::Decode(_)
            | Self::HttpError(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// OpenAI `type` field
    fn category(&self) -> &'static str {
        match self.status() {
            StatusCode::UNAUTHORIZED => "authentication_error",
            StatusCode::BAD_REQUEST => "invalid_request_error",
            StatusCode::INTERNAL_SERVER_ERROR => "server_error",
            _ => "upstream_error",
        }
    }

    /// Text shown to the client. Transport and internal details stay in logs.
    fn public_message(&self) -> String {
        match self {
            Self::HttpError(_) => "Spark service unreachable".to_string(),
            Self::JsonError(_) => "Request body is not valid JSON".to_string(),
            Self::Internal(_) => "Bridge failure".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: &'static str,
    pub code: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                message: self.public_message(),
                error_type: self.category(),
                code: self.kind(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
