//! Outbound response types
//!
//! Chat completion object, streaming chunk and image generation result, in
//! the OpenAI wire shape.

use serde::{Deserialize, Serialize};

use super::types::Role;

/// Usage block
///
/// The upstream reports no token counts, so every response carries the same
/// fixed placeholder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn placeholder() -> Self {
        Self {
            prompt_tokens: 1,
            completion_tokens: 1,
            total_tokens: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChoiceMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    pub index: u32,
    pub message: ChoiceMessage,
    pub finish_reason: Option<String>,
}

/// Aggregated answer, `object: "chat.completion"`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionResponse {
    /// `<session id>` or `<session id>:<continuation id>`
    pub id: String,
    pub model: String,
    pub object: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
    pub created: u64,
}

impl ChatCompletionResponse {
    /// Content of the single choice
    pub fn content(&self) -> &str {
        self.choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Delta {
    /// Set on the role announcement only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamChoice {
    pub index: u32,
    pub delta: Delta,
    /// Serialized as `null` until the final chunk
    pub finish_reason: Option<String>,
}

/// One `data:` frame of a streamed answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamChunk {
    pub id: String,
    pub model: String,
    /// Always "chat.completion.chunk"
    pub object: String,
    pub choices: Vec<StreamChoice>,
    /// Only in the final chunk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    pub created: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageData {
    pub url: String,
}

/// Body of `POST /v1/images/generations`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageGenerationResponse {
    pub created: u64,
    pub data: Vec<ImageData>,
}

/// Current unix timestamp in seconds
pub fn unix_timestamp() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
