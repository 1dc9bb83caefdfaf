//! `/metrics` in Prometheus text format, plus the recording helpers the
//! handlers and the conversation engine call.

use axum::{http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::warn;

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the recorder and describe the bridge metrics.
///
/// Later calls reuse the first handle. If another recorder already owns the
/// process, a detached handle is kept and a warning logged.
pub fn init_metrics() {
    PROMETHEUS_HANDLE.get_or_init(|| {
        let handle = PrometheusBuilder::new().install_recorder();
        match handle {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "Prometheus recorder not installed; using a detached handle");
                PrometheusBuilder::new().build_recorder().handle()
            }
        }
    });

    register_metrics();
}

fn register_metrics() {
    metrics::describe_counter!(
        "spark_bridge_requests_total",
        "Bridged requests by endpoint and outcome"
    );
    metrics::describe_histogram!(
        "spark_bridge_request_duration_seconds",
        "Time from request receipt to answer or stream open"
    );
    metrics::describe_counter!(
        "spark_bridge_upstream_retries_total",
        "Upstream exchanges re-attempted after a failure"
    );
    metrics::describe_counter!(
        "spark_bridge_uploads_total",
        "Referenced files uploaded, by handle kind"
    );
}

pub async fn prometheus_metrics() -> impl IntoResponse {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics not initialized".to_string(),
        ),
    }
}

/// Record a served request
pub fn record_request(endpoint: &str, status: &str, duration_secs: f64) {
    metrics::counter!(
        "spark_bridge_requests_total",
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("spark_bridge_request_duration_seconds", "endpoint" => endpoint.to_string())
        .record(duration_secs);
}

/// Record a retried upstream exchange
pub fn record_retry(operation: &str) {
    metrics::counter!("spark_bridge_upstream_retries_total", "operation" => operation.to_string())
        .increment(1);
}

/// Record an uploaded file
pub fn record_upload(kind: &str) {
    metrics::counter!("spark_bridge_uploads_total", "kind" => kind.to_string()).increment(1);
}
