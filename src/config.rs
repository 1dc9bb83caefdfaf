//! Configuration management for Spark Bridge
//!
//! Configuration is loaded from environment variables. Retry and timeout
//! tuning is grouped into [`RetryPolicy`] and [`Timeouts`] so callers can pass
//! short timers in tests.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Default upstream base URL
pub const DEFAULT_SPARK_BASE_URL: &str = "https://xinghuo.xfyun.cn";

/// Default ceiling for referenced files (100 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Bounded, fixed-delay retry policy for a whole completion exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of re-attempts after the first failure
    pub max_retries: u32,
    /// Fixed delay between attempts (no jitter, no growth)
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// Per-call timeouts, tiered by operation weight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Lightweight session calls (create/delete conversation, HEAD probes)
    pub session: Duration,
    /// File download, upload signing, object push, save-file
    pub transfer: Duration,
    /// Chat POST including the whole event stream
    pub chat: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            session: Duration::from_secs(15),
            transfer: Duration::from_secs(60),
            chat: Duration::from_secs(120),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Spark web service base URL
    pub spark_base_url: String,

    /// Retry policy for completion and image requests
    pub retry: RetryPolicy,
    /// Upstream call timeouts
    pub timeouts: Timeouts,

    /// Largest referenced file accepted for upload, in bytes
    pub max_file_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            spark_base_url: DEFAULT_SPARK_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
            timeouts: Timeouts::default(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            host: env::var("SPARK_BRIDGE_HOST").unwrap_or(defaults.host),
            port: parse_var("SPARK_BRIDGE_PORT", defaults.port)?,

            spark_base_url: env::var("SPARK_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.spark_base_url),

            retry: RetryPolicy {
                max_retries: parse_var("SPARK_MAX_RETRIES", defaults.retry.max_retries)?,
                delay: Duration::from_millis(parse_var(
                    "SPARK_RETRY_DELAY_MS",
                    defaults.retry.delay.as_millis() as u64,
                )?),
            },
            timeouts: Timeouts {
                session: Duration::from_secs(parse_var(
                    "SPARK_SESSION_TIMEOUT_SECS",
                    defaults.timeouts.session.as_secs(),
                )?),
                transfer: Duration::from_secs(parse_var(
                    "SPARK_TRANSFER_TIMEOUT_SECS",
                    defaults.timeouts.transfer.as_secs(),
                )?),
                chat: Duration::from_secs(parse_var(
                    "SPARK_CHAT_TIMEOUT_SECS",
                    defaults.timeouts.chat.as_secs(),
                )?),
            },

            max_file_size: parse_var("SPARK_MAX_FILE_SIZE", defaults.max_file_size)?,
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", name)),
        Err(_) => Ok(default),
    }
}
