//! Response forwarder
//!
//! Streaming mode: re-emits decoded tokens as OpenAI-compatible SSE chunks as
//! soon as they arrive.

use std::convert::Infallible;
use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::{debug, error, warn};

use super::{
    decoder::{DecodedToken, TokenStream},
    response::{unix_timestamp, Delta, StreamChoice, StreamChunk, Usage},
    session::ConversationSession,
    types::Role,
};

/// Outbound SSE body
pub type SseStream = Pin<Box<dyn Stream<Item = Result<Bytes, Infallible>> + Send>>;

/// Format a stream chunk as an SSE data event: `data: {json}\n\n`
pub fn format_sse_chunk(chunk: &StreamChunk) -> Bytes {
    match serde_json::to_string(chunk) {
        Ok(json) => Bytes::from(format!("data: {}\n\n", json)),
        Err(e) => {
            error!(error = %e, "Failed to serialize stream chunk");
            Bytes::new()
        }
    }
}

/// The stream termination marker: `data: [DONE]\n\n`
pub fn format_sse_done() -> Bytes {
    Bytes::from_static(b"data: [DONE]\n\n")
}

/// Metadata shared by every chunk of one stream
#[derive(Debug, Clone)]
struct StreamMetadata {
    session: ConversationSession,
    model: String,
    created: u64,
}

impl StreamMetadata {
    fn chunk(
        &self,
        id: String,
        delta: Delta,
        finish_reason: Option<String>,
        usage: Option<Usage>,
    ) -> StreamChunk {
        StreamChunk {
            id,
            model: self.model.clone(),
            object: "chat.completion.chunk".to_string(),
            choices: vec![StreamChoice {
                index: 0,
                delta,
                finish_reason,
            }],
            usage,
            created: self.created,
        }
    }

    fn role_chunk(&self) -> StreamChunk {
        self.chunk(
            self.session.session_id.clone(),
            Delta {
                role: Some(Role::Assistant),
                content: Some(String::new()),
            },
            None,
            None,
        )
    }

    fn content_chunk(&self, content: String) -> StreamChunk {
        self.chunk(
            self.session.session_id.clone(),
            Delta {
                role: None,
                content: Some(content),
            },
            None,
            None,
        )
    }

    fn final_chunk(&self, id: String, content: Option<String>) -> StreamChunk {
        self.chunk(
            id,
            Delta {
                role: None,
                content,
            },
            Some("stop".to_string()),
            Some(Usage::placeholder()),
        )
    }
}

/// Runs the completion callback exactly once, also when the client disconnects
struct CompletionGuard<F: FnOnce()> {
    callback: Option<F>,
}

impl<F: FnOnce()> CompletionGuard<F> {
    fn new(callback: F) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    fn fire(&mut self) {
        if let Some(callback) = self.callback.take() {
            callback();
        }
    }
}

impl<F: FnOnce()> Drop for CompletionGuard<F> {
    fn drop(&mut self) {
        self.fire();
    }
}

/// Forward a token stream as SSE chunks
///
/// The first chunk announces the assistant role. `End` or error text closes
/// the turn with a final chunk; a transport error or early close skips it.
/// Every path ends with exactly one `[DONE]` marker, then `on_complete` runs.
pub fn forward<F>(
    session: ConversationSession,
    model: impl Into<String>,
    mut tokens: TokenStream,
    on_complete: F,
) -> SseStream
where
    F: FnOnce() + Send + 'static,
{
    let metadata = StreamMetadata {
        session,
        model: model.into(),
        created: unix_timestamp(),
    };

    Box::pin(async_stream::stream! {
        let mut guard = CompletionGuard::new(on_complete);
        let mut chunks = 0usize;

        yield Ok::<Bytes, Infallible>(format_sse_chunk(&metadata.role_chunk()));

        while let Some(token) = tokens.next().await {
            match token {
                Ok(DecodedToken::End(continuation_id)) => {
                    let id = metadata.session.completion_id(continuation_id.as_deref());
                    yield Ok(format_sse_chunk(&metadata.final_chunk(id, None)));
                    break;
                }
                Ok(DecodedToken::ErrorText(text)) => {
                    let id = metadata.session.session_id.clone();
                    yield Ok(format_sse_chunk(&metadata.final_chunk(id, Some(text))));
                    break;
                }
                Ok(token) => {
                    if let Some(content) = token.content() {
                        chunks += 1;
                        yield Ok(format_sse_chunk(&metadata.content_chunk(content)));
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Upstream stream failed; terminating response");
                    break;
                }
            }
        }

        yield Ok(format_sse_done());
        debug!(chunks, session_id = %metadata.session.session_id, "Stream forwarded");
        guard.fire();
    })
}
