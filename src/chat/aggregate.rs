//! Response aggregator
//!
//! Blocking mode: folds the decoded token stream into one completion object.

use futures::StreamExt;
use tracing::debug;

use crate::error::AppResult;

use super::{
    decoder::{DecodedToken, TokenStream},
    response::{unix_timestamp, ChatCompletionResponse, Choice, ChoiceMessage, Usage},
    session::ConversationSession,
    types::Role,
};

/// Accumulates tokens into a completion
#[derive(Debug)]
pub struct ResponseAggregator {
    session: ConversationSession,
    model: String,
    created: u64,
    content: String,
    continuation_id: Option<String>,
    finished: bool,
}

impl ResponseAggregator {
    pub fn new(session: ConversationSession, model: impl Into<String>) -> Self {
        Self {
            session,
            model: model.into(),
            created: unix_timestamp(),
            content: String::new(),
            continuation_id: None,
            finished: false,
        }
    }

    /// Apply one token; returns `true` once the turn has ended
    ///
    /// Error text is kept as inline content and does not end the turn.
    pub fn push(&mut self, token: DecodedToken) -> bool {
        if self.finished {
            return true;
        }
        match token {
            DecodedToken::End(continuation_id) => {
                self.continuation_id = continuation_id;
                self.finished = true;
            }
            other => {
                if let Some(text) = other.content() {
                    self.content.push_str(&text);
                }
            }
        }
        self.finished
    }

    /// Build the completion from whatever has accumulated
    pub fn finish(self) -> ChatCompletionResponse {
        ChatCompletionResponse {
            id: self
                .session
                .completion_id(self.continuation_id.as_deref()),
            model: self.model,
            object: "chat.completion".to_string(),
            choices: vec![Choice {
                index: 0,
                message: ChoiceMessage {
                    role: Role::Assistant,
                    content: self.content,
                },
                finish_reason: Some("stop".to_string()),
            }],
            usage: Usage::placeholder(),
            created: self.created,
        }
    }
}

/// Consume a token stream into a completion
///
/// Transport errors propagate; a close without an end marker still resolves.
pub async fn aggregate(
    session: ConversationSession,
    model: &str,
    mut tokens: TokenStream,
) -> AppResult<ChatCompletionResponse> {
    let mut aggregator = ResponseAggregator::new(session, model);
    while let Some(token) = tokens.next().await {
        if aggregator.push(token?) {
            break;
        }
    }
    let response = aggregator.finish();
    debug!(id = %response.id, len = response.content().len(), "Completion aggregated");
    Ok(response)
}
