//! Upstream transport abstraction
//!
//! Defines the calls the chat engine needs from the Spark web service. The
//! production implementation is [`super::SparkClient`]; tests substitute an
//! in-memory fake.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::error::AppResult;

use super::models::{ChatEndpoint, ChatForm, FileProbe, SaveFileRequest, UploadGrant};

/// Raw upstream byte stream
pub type ByteStream = Pin<Box<dyn Stream<Item = AppResult<Bytes>> + Send>>;

/// Calls against the Spark web service and referenced file hosts
///
/// Implementations inspect HTTP status codes themselves and report failures as
/// typed [`crate::error::AppError`] values. None of these calls retry; retrying
/// belongs to the completion orchestrator.
#[async_trait]
pub trait SparkApi: Send + Sync {
    /// Create a conversation, optionally scoped to an assistant id
    async fn create_conversation(&self, bot_id: Option<&str>) -> AppResult<String>;

    /// Delete a conversation
    async fn remove_conversation(&self, chat_id: &str) -> AppResult<()>;

    /// HEAD probe of a referenced file
    async fn probe_file(&self, url: &str) -> AppResult<FileProbe>;

    /// Download a referenced file into memory, refusing anything over `max_size`
    async fn download_file(&self, url: &str, max_size: u64) -> AppResult<Bytes>;

    /// Obtain an object-storage upload grant
    async fn sign_upload(&self, file_name: &str, mime_type: &str) -> AppResult<UploadGrant>;

    /// Push bytes to the signed endpoint and return the stored object link
    async fn put_object(&self, grant: &UploadGrant, data: Bytes) -> AppResult<String>;

    /// Attach an uploaded document to a conversation
    async fn save_file(&self, request: &SaveFileRequest) -> AppResult<()>;

    /// Post a chat message and return the live event stream
    async fn open_chat(&self, endpoint: ChatEndpoint, form: &ChatForm) -> AppResult<ByteStream>;

    /// Whether the session token still maps to a logged-in user
    async fn user_info(&self) -> AppResult<bool>;
}
