//! spark-bridge server binary

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use spark_bridge::{config::Config, logging, routes, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init_tracing();

    let config = Config::from_env().context("invalid bridge configuration")?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("bad listen address {}:{}", config.host, config.port))?;

    routes::metrics::init_metrics();
    let app = routes::create_router(Arc::new(AppState::new(config.clone())?));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    info!(
        %addr,
        upstream = %config.spark_base_url,
        max_retries = config.retry.max_retries,
        retry_delay_ms = config.retry.delay.as_millis() as u64,
        max_file_size = config.max_file_size,
        "spark-bridge listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    info!("spark-bridge stopped");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => warn!("interrupt received, draining"),
                    _ = term.recv() => warn!("SIGTERM received, draining"),
                }
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl+C only");
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, draining");
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, draining");
        }
    }
}
