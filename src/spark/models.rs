//! Spark web API payloads

use serde::{Deserialize, Serialize};

/// Chat endpoint variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatEndpoint {
    /// Regular chat endpoint; image links travel in the `fileUrl` form field
    Baseline,
    /// Long-context endpoint; documents are attached to the conversation
    LongContext,
}

impl ChatEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            ChatEndpoint::Baseline => "/iflygpt-chat/u/chat_message/chat",
            ChatEndpoint::LongContext => "/iflygpt-longcontext/u/chat_message/web/chat",
        }
    }
}

/// Payload of the create-chat-list call
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<String>,
}

/// Created conversation; the id is numeric upstream but kept as text here
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedChat {
    pub id: serde_json::Value,
}

impl CreatedChat {
    pub fn id_string(&self) -> Option<String> {
        match &self.id {
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

/// Payload of the del-chat-list call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteChatRequest {
    pub chat_list_id: String,
}

/// Signed object-storage grant returned by the sign call
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UploadGrant {
    pub authorization: String,
    pub date: String,
    pub host: String,
    pub url: String,
}

/// Object-storage push result
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedObject {
    pub link: String,
}

/// Registration of an uploaded document against a conversation
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaveFileRequest {
    pub business_type: u8,
    pub chat_id: String,
    pub file_business_key: String,
    pub file_name: String,
    pub file_size: u64,
    pub file_url: String,
}

/// Result of a HEAD probe against a referenced file
#[derive(Debug, Clone, PartialEq)]
pub struct FileProbe {
    pub status: u16,
    pub reason: String,
    pub content_length: Option<u64>,
}

/// Form posted to a chat endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct ChatForm {
    pub chat_id: String,
    pub text: String,
    pub bot_id: Option<String>,
    /// Continuation id of a resumed thread
    pub sid: Option<String>,
    /// Comma-joined image links
    pub file_url: Option<String>,
}
