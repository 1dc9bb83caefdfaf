//! Upstream result envelope
//!
//! Spark answers most JSON calls with `{code, desc|message, data}`, where
//! `code == 0` carries the payload in `data`. Some endpoints return the payload
//! bare, without any envelope. Both shapes are folded into one tagged value
//! here so the rest of the crate never probes fields directly.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AppError, AppResult};

/// Parsed upstream envelope
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// `code == 0`, payload taken from `data`
    Success(Value),
    /// Any other numeric code
    Failure { code: i64, message: String },
    /// No numeric `code`; the body itself is the payload
    Bare(Value),
    /// Empty or null body
    Empty,
}

impl Envelope {
    /// Classify a decoded response body
    pub fn parse(body: Value) -> Self {
        if body.is_null() {
            return Envelope::Empty;
        }

        let code = body.get("code").and_then(numeric_code);
        match code {
            None => Envelope::Bare(body),
            Some(0) => Envelope::Success(body.get("data").cloned().unwrap_or(Value::Null)),
            Some(code) => {
                let message = ["desc", "message"]
                    .iter()
                    .filter_map(|field| body.get(*field).and_then(Value::as_str))
                    .find(|text| !text.is_empty())
                    .unwrap_or("unknown error")
                    .to_string();
                Envelope::Failure { code, message }
            }
        }
    }

    /// Classify a raw response body; blank bodies become [`Envelope::Empty`]
    pub fn parse_bytes(body: &[u8]) -> AppResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Envelope::Empty);
        }
        let value: Value = serde_json::from_slice(body).map_err(|e| {
            AppError::UpstreamError(format!("Failed to parse Spark response: {}", e))
        })?;
        Ok(Self::parse(value))
    }

    /// Payload of a successful envelope; failures become typed errors
    pub fn into_payload(self) -> AppResult<Value> {
        match self {
            Envelope::Success(data) | Envelope::Bare(data) => Ok(data),
            Envelope::Empty => Ok(Value::Null),
            Envelope::Failure { code, message } => {
                Err(AppError::UpstreamRequestFailed { code, message })
            }
        }
    }

    /// Payload deserialized into a typed structure
    pub fn into_typed<T: DeserializeOwned>(self) -> AppResult<T> {
        let payload = self.into_payload()?;
        serde_json::from_value(payload).map_err(|e| {
            AppError::UpstreamError(format!("Unexpected Spark payload shape: {}", e))
        })
    }
}

fn numeric_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}
