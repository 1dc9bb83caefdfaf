//! Tracing setup and per-exchange log context
//!
//! Every line logged for one bridged exchange carries the same short
//! `trace_id`. The session token never appears; `account` holds its
//! fingerprint.

use std::env;
use std::time::Instant;

use tracing::{error, info, info_span, Span};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::error::AppError;

const DEFAULT_FILTER: &str = "spark_bridge=info,tower_http=info";

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the filter; `SPARK_BRIDGE_LOG_FORMAT=json` switches
/// to one JSON object per line.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let json = env::var("SPARK_BRIDGE_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if json {
        builder.json().with_current_span(true).init();
    } else {
        builder.with_thread_ids(true).init();
    }
}

/// Identity and timing of one client exchange
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub trace_id: String,
    pub start_time: Instant,
    /// Route path, e.g. `/v1/chat/completions`
    pub endpoint: String,
    pub model: Option<String>,
    pub streaming: bool,
    pub account: Option<String>,
}

impl RequestContext {
    pub fn new(endpoint: &str) -> Self {
        let mut trace_id = Uuid::new_v4().simple().to_string();
        trace_id.truncate(8);
        Self {
            trace_id,
            start_time: Instant::now(),
            endpoint: endpoint.to_owned(),
            model: None,
            streaming: false,
            account: None,
        }
    }

    pub fn with_model(self, model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            ..self
        }
    }

    pub fn with_streaming(self, streaming: bool) -> Self {
        Self { streaming, ..self }
    }

    pub fn with_account(self, fingerprint: impl Into<String>) -> Self {
        Self {
            account: Some(fingerprint.into()),
            ..self
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.start_time.elapsed().as_millis()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    fn model_name(&self) -> &str {
        self.model.as_deref().unwrap_or("-")
    }

    pub fn log_request_start(&self, messages: usize) {
        info!(
            trace_id = %self.trace_id,
            endpoint = %self.endpoint,
            model = self.model_name(),
            stream = self.streaming,
            account = self.account.as_deref().unwrap_or("-"),
            messages,
            "bridging request"
        );
    }

    pub fn log_request_complete(&self) {
        info!(
            trace_id = %self.trace_id,
            model = self.model_name(),
            elapsed_ms = self.elapsed_ms() as u64,
            "answer delivered"
        );
    }

    /// The upstream event stream is open and chunks are flowing.
    pub fn log_stream_started(&self) {
        info!(
            trace_id = %self.trace_id,
            model = self.model_name(),
            elapsed_ms = self.elapsed_ms() as u64,
            "event stream opened"
        );
    }

    pub fn log_error(&self, err: &AppError) {
        error!(
            trace_id = %self.trace_id,
            endpoint = %self.endpoint,
            model = self.model_name(),
            stream = self.streaming,
            account = self.account.as_deref().unwrap_or("-"),
            kind = err.kind(),
            elapsed_ms = self.elapsed_ms() as u64,
            error = %err,
            "exchange failed"
        );
    }

    pub fn create_span(&self) -> Span {
        info_span!(
            "exchange",
            trace_id = %self.trace_id,
            model = self.model_name(),
            stream = self.streaming,
        )
    }
}
