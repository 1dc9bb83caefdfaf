//! Inbound chat request types
//!
//! OpenAI-style chat completion request, narrowed to what the Spark web
//! service can honor: roles, text and file/image references, the stream flag
//! and an optional continuation reference.

use serde::{Deserialize, Serialize};

/// Default model name when the client sends none
pub const DEFAULT_MODEL: &str = "spark";

/// Role of a message participant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    #[default]
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// URL wrapper used by both `image_url` and `file_url` parts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileUrl {
    /// HTTP(S) URL or `data:` URL with inline base64 content
    pub url: String,
}

/// A part of multimodal content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        #[serde(default)]
        text: String,
    },
    ImageUrl {
        image_url: FileUrl,
    },
    File {
        file_url: FileUrl,
    },
    /// Any part type the upstream has no use for
    #[serde(other)]
    Unsupported,
}

impl ContentPart {
    /// URL of a file or image reference
    pub fn reference_url(&self) -> Option<&str> {
        match self {
            ContentPart::ImageUrl { image_url } => Some(image_url.url.as_str()),
            ContentPart::File { file_url } => Some(file_url.url.as_str()),
            _ => None,
        }
    }
}

/// Message content - either plain text or multimodal parts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Default for Content {
    fn default() -> Self {
        Content::Text(String::new())
    }
}

/// A chat message with role and content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub content: Content,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::Text(text.into()),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Content::Text(text.into()),
        }
    }

    /// File and image reference URLs, in part order
    pub fn reference_urls(&self) -> Vec<&str> {
        match &self.content {
            Content::Text(_) => Vec::new(),
            Content::Parts(parts) => parts.iter().filter_map(ContentPart::reference_url).collect(),
        }
    }

    /// Whether the message carries a file or image reference
    pub fn has_references(&self) -> bool {
        !self.reference_urls().is_empty()
    }
}

/// Chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default = "default_model")]
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub stream: bool,
    /// `<session id>:<continuation id>` reference of a thread to resume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

/// Image generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageGenerationRequest {
    #[serde(default = "default_model")]
    pub model: String,
    pub prompt: String,
}
