//! Hand-built upstream for transport behavior wiremock cannot express:
//! content-encoded responses and bodies that stop mid-stream.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    body::{Body, Bytes},
    http::header,
    response::Response,
    routing::post,
    Json, Router,
};
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use tower_http::compression::{predicate::SizeAbove, CompressionLayer};

use super::spark::{BASELINE_CHAT_PATH, CREATE_CHAT_PATH, DELETE_CHAT_PATH, TEST_CHAT_ID};

/// Upstream served by a real axum listener on an ephemeral port
pub struct RawUpstream {
    addr: SocketAddr,
}

impl RawUpstream {
    pub async fn start(router: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind raw upstream");
        let addr = listener.local_addr().expect("Raw upstream has no address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Self { addr }
    }

    pub fn uri(&self) -> String {
        format!("http://{}", self.addr)
    }
}

async fn created_chat() -> Json<Value> {
    Json(json!({ "code": 0, "desc": "ok", "data": { "id": TEST_CHAT_ID } }))
}

async fn deleted_chat() -> Json<Value> {
    Json(json!({ "code": 0, "desc": "ok", "data": null }))
}

fn event_stream(body: Body) -> Response {
    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(body)
        .expect("Failed to build event stream response")
}

/// Conversation and chat routes; every response is gzip-encoded when the
/// caller accepts it, event streams included.
pub fn gzip_spark(events: String) -> Router {
    Router::new()
        .route(CREATE_CHAT_PATH, post(created_chat))
        .route(DELETE_CHAT_PATH, post(deleted_chat))
        .route(
            BASELINE_CHAT_PATH,
            post(move || {
                let events = events.clone();
                async move { event_stream(Body::from(events)) }
            }),
        )
        .layer(
            CompressionLayer::new()
                .gzip(true)
                .compress_when(SizeAbove::new(0)),
        )
}

/// Chat route that sends `first` and then never writes again
pub fn stalled_spark(first: String) -> Router {
    Router::new()
        .route(CREATE_CHAT_PATH, post(created_chat))
        .route(DELETE_CHAT_PATH, post(deleted_chat))
        .route(
            BASELINE_CHAT_PATH,
            post(move || {
                let first = first.clone();
                async move {
                    let body = stream::once(async move { Ok::<_, Infallible>(Bytes::from(first)) })
                        .chain(stream::pending());
                    event_stream(Body::from_stream(body))
                }
            }),
        )
}
