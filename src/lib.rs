//! OpenAI-compatible front for the Spark web chat service.
//!
//! Each request is replayed against the Spark web flow: open a
//! conversation, push referenced files to object storage, post the
//! composed prompt, then decode the event stream into chat completion
//! objects or chunks.

pub mod chat;
pub mod config;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod spark;
pub mod streaming;

use std::sync::Arc;
use std::time::Instant;

pub use crate::chat::CompletionOrchestrator;
pub use crate::config::Config;
pub use crate::spark::{SparkApi, SparkClient, SparkCredential};

/// Process-wide state handed to every handler.
///
/// Nothing here is tied to an account; credentials arrive per request and
/// are bound into a fresh [`SparkClient`].
pub struct AppState {
    pub config: Config,
    pub http_client: reqwest::Client,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        // Timeouts differ per upstream call and are applied per request.
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("spark-bridge/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(32)
            .build()?;

        Ok(Self {
            config,
            http_client,
            start_time: Instant::now(),
        })
    }

    pub fn spark_client(&self, credential: SparkCredential) -> SparkClient {
        SparkClient::new(self.http_client.clone(), &self.config, credential)
    }

    /// Per-request engine acting on behalf of `credential`
    pub fn orchestrator(&self, credential: SparkCredential) -> CompletionOrchestrator {
        let api: Arc<dyn SparkApi> = Arc::new(self.spark_client(credential));
        CompletionOrchestrator::from_config(api, &self.config)
    }
}
