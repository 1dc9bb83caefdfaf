//! Mock Spark web service for testing
//!
//! Provides wiremock-based mocks for the Spark endpoints the bridge calls:
//! - POST /iflygpt/u/chat-list/v1/create-chat-list - Create conversation
//! - POST /iflygpt/u/chat-list/v1/del-chat-list - Delete conversation
//! - POST /iflygpt/oss/sign - Upload grant
//! - POST /oss/upload - Object push (signed URL served by the same mock)
//! - POST /iflygpt-longcontext/chat/enhance/saveFile - Attach document
//! - POST /iflygpt-chat/u/chat_message/chat - Baseline chat stream
//! - POST /iflygpt-longcontext/u/chat_message/web/chat - Long-context chat stream
//! - GET /iflygpt/userInfo - Token liveness
//!
//! It also serves referenced files under `/files/`.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};
use wiremock::{
    matchers::{body_string_contains, method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const CREATE_CHAT_PATH: &str = "/iflygpt/u/chat-list/v1/create-chat-list";
pub const DELETE_CHAT_PATH: &str = "/iflygpt/u/chat-list/v1/del-chat-list";
pub const SIGN_PATH: &str = "/iflygpt/oss/sign";
pub const UPLOAD_PATH: &str = "/oss/upload";
pub const SAVE_FILE_PATH: &str = "/iflygpt-longcontext/chat/enhance/saveFile";
pub const BASELINE_CHAT_PATH: &str = "/iflygpt-chat/u/chat_message/chat";
pub const LONG_CONTEXT_CHAT_PATH: &str = "/iflygpt-longcontext/u/chat_message/web/chat";
pub const USER_INFO_PATH: &str = "/iflygpt/userInfo";

/// Conversation id returned by the create mock
pub const TEST_CHAT_ID: u64 = 123456789012;

/// Link returned for every pushed object
pub const TEST_OBJECT_LINK: &str = "https://oss.example.com/object/photo.png";

/// Builders for upstream event streams
pub struct SparkEvents;

impl SparkEvents {
    /// One base64 content event
    pub fn text(text: &str) -> String {
        format!("data:{}\n\n", STANDARD.encode(text))
    }

    /// Multi-image content event
    pub fn images(urls: &[&str]) -> String {
        let payload = json!({ "multi_image_url": urls }).to_string();
        Self::text(&payload)
    }

    /// Control tag event
    pub fn control(tag: &str) -> String {
        format!("data:<{}>\n\n", tag)
    }

    /// Bracketed error event
    pub fn error(text: &str) -> String {
        format!("data:[{}]\n\n", text)
    }

    /// End-of-turn event
    pub fn end(continuation_id: &str) -> String {
        format!("data:{}<sid>\n\n", continuation_id)
    }

    /// A complete answer made of `fragments`
    pub fn answer(fragments: &[&str], continuation_id: &str) -> String {
        let mut events: String = fragments.iter().map(|f| Self::text(f)).collect();
        events.push_str(&Self::control("end"));
        events.push_str(&Self::end(continuation_id));
        events
    }
}

/// Mock Spark server wrapper
pub struct MockSparkServer {
    server: MockServer,
}

impl MockSparkServer {
    /// Start a new mock Spark server
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        Self { server }
    }

    /// Get the mock server URI
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// URL of a referenced file served by this mock
    pub fn file_url(&self, name: &str) -> String {
        format!("{}/files/{}", self.uri(), name)
    }

    /// Get all received requests
    pub async fn received_requests(&self) -> Vec<wiremock::Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Requests received on one path
    pub async fn requests_to(&self, request_path: &str) -> Vec<wiremock::Request> {
        self.received_requests()
            .await
            .into_iter()
            .filter(|r| r.url.path() == request_path)
            .collect()
    }

    /// Wait until at least `count` requests reached `request_path`
    ///
    /// Conversations are removed in the background, after the response has
    /// been returned. Gives up after two seconds and returns what arrived.
    pub async fn wait_for_requests(
        &self,
        request_path: &str,
        count: usize,
    ) -> Vec<wiremock::Request> {
        for _ in 0..100 {
            let requests = self.requests_to(request_path).await;
            if requests.len() >= count {
                return requests;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.requests_to(request_path).await
    }

    fn envelope(data: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "desc": "ok",
            "data": data
        }))
    }

    fn event_stream(events: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/event-stream")
            .set_body_string(events.to_string())
    }

    // =========================================================================
    // Conversations
    // =========================================================================

    /// Mock successful conversation creation and deletion
    pub async fn mock_conversations(&self) {
        Mock::given(method("POST"))
            .and(path(CREATE_CHAT_PATH))
            .respond_with(Self::envelope(json!({ "id": TEST_CHAT_ID })))
            .mount(&self.server)
            .await;

        Mock::given(method("POST"))
            .and(path(DELETE_CHAT_PATH))
            .respond_with(Self::envelope(Value::Null))
            .mount(&self.server)
            .await;
    }

    /// Mock conversation creation failing with a non-zero envelope code
    pub async fn mock_create_conversation_failure(&self, code: i64, desc: &str) {
        Mock::given(method("POST"))
            .and(path(CREATE_CHAT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": code,
                "desc": desc
            })))
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // Chat streams
    // =========================================================================

    /// Mock the baseline chat endpoint answering with `events`
    pub async fn mock_chat(&self, events: &str) {
        Mock::given(method("POST"))
            .and(path(BASELINE_CHAT_PATH))
            .respond_with(Self::event_stream(events))
            .mount(&self.server)
            .await;
    }

    /// Mock the long-context chat endpoint answering with `events`
    pub async fn mock_long_context_chat(&self, events: &str) {
        Mock::given(method("POST"))
            .and(path(LONG_CONTEXT_CHAT_PATH))
            .respond_with(Self::event_stream(events))
            .mount(&self.server)
            .await;
    }

    /// Mock the baseline chat endpoint rejecting the first `times` calls
    ///
    /// Mount before [`Self::mock_chat`]; later calls fall through to it.
    pub async fn mock_chat_failures(&self, times: u64) {
        Mock::given(method("POST"))
            .and(path(BASELINE_CHAT_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "code": 80000,
                "desc": "system busy"
            })))
            .up_to_n_times(times)
            .mount(&self.server)
            .await;
    }

    /// Mock the baseline chat endpoint answering with `events` only when the
    /// form contains `needle`
    pub async fn mock_chat_containing(&self, needle: &str, events: &str) {
        Mock::given(method("POST"))
            .and(path(BASELINE_CHAT_PATH))
            .and(body_string_contains(needle))
            .respond_with(Self::event_stream(events))
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // Uploads
    // =========================================================================

    /// Mock the sign, push and save-file calls
    pub async fn mock_uploads(&self) {
        Mock::given(method("POST"))
            .and(path(SIGN_PATH))
            .respond_with(Self::envelope(json!({
                "authorization": "hmac username=\"test\"",
                "date": "Thu, 01 Jan 2026 00:00:00 GMT",
                "host": "oss.example.com",
                "url": format!("{}{}?bucket=test", self.uri(), UPLOAD_PATH)
            })))
            .mount(&self.server)
            .await;

        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .respond_with(Self::envelope(json!({ "link": TEST_OBJECT_LINK })))
            .mount(&self.server)
            .await;

        Mock::given(method("POST"))
            .and(path(SAVE_FILE_PATH))
            .respond_with(Self::envelope(Value::Null))
            .mount(&self.server)
            .await;
    }

    /// Serve a referenced file (HEAD and GET)
    pub async fn mock_file(&self, name: &str, content: Vec<u8>) {
        let file_path = format!("/files/{}", name);

        Mock::given(method("HEAD"))
            .and(path(file_path.as_str()))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.server)
            .await;

        Mock::given(method("GET"))
            .and(path(file_path.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(content))
            .mount(&self.server)
            .await;
    }

    /// Serve a referenced file whose probe fails with `status`
    pub async fn mock_missing_file(&self, name: &str, status: u16) {
        Mock::given(method("HEAD"))
            .and(path(format!("/files/{}", name)))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // Token liveness
    // =========================================================================

    /// Mock the user-info call for a logged-in session
    pub async fn mock_user_info_live(&self) {
        Mock::given(method("GET"))
            .and(path(USER_INFO_PATH))
            .respond_with(Self::envelope(json!({
                "userInfo": { "uid": 42, "nickname": "tester" }
            })))
            .mount(&self.server)
            .await;
    }

    /// Mock the user-info call for an expired session
    pub async fn mock_user_info_expired(&self) {
        Mock::given(method("GET"))
            .and(path(USER_INFO_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 11200,
                "desc": "not logged in"
            })))
            .mount(&self.server)
            .await;
    }
}
