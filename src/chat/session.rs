//! Conversation session life cycle
//!
//! Every logical request runs inside one upstream conversation. The session
//! is either created fresh or resumed from a `<session id>:<continuation id>`
//! reference returned by an earlier exchange.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::{error::AppResult, spark::SparkApi};

static RESUME_REFERENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{9,}):(.+)$").unwrap());

static BOT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{3,}$").unwrap());

/// Assistant id encoded in the model name, if any
pub fn bot_id(model: &str) -> Option<&str> {
    BOT_ID.is_match(model).then_some(model)
}

/// An upstream conversation owned by one in-flight request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSession {
    pub session_id: String,
    pub continuation_id: Option<String>,
    resumed: bool,
}

impl ConversationSession {
    /// Fresh session returned by the create-conversation call
    pub fn fresh(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            continuation_id: None,
            resumed: false,
        }
    }

    /// Parse a resume reference; anything not shaped like one yields `None`
    pub fn from_reference(reference: &str) -> Option<Self> {
        let captures = RESUME_REFERENCE.captures(reference.trim())?;
        Some(Self {
            session_id: captures[1].to_string(),
            continuation_id: Some(captures[2].to_string()),
            resumed: true,
        })
    }

    /// Whether the upstream already holds this thread's context
    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    /// Completion id: the session id, suffixed with the continuation id when known
    pub fn completion_id(&self, continuation_id: Option<&str>) -> String {
        match continuation_id {
            Some(cid) => format!("{}:{}", self.session_id, cid),
            None => self.session_id.clone(),
        }
    }
}

/// Creates and tears down upstream conversations
#[derive(Clone)]
pub struct SessionManager {
    api: Arc<dyn SparkApi>,
}

impl SessionManager {
    pub fn new(api: Arc<dyn SparkApi>) -> Self {
        Self { api }
    }

    /// Resume `existing` when it is a valid reference, otherwise create a conversation
    ///
    /// Creation failures propagate unchanged.
    #[instrument(skip(self))]
    pub async fn acquire(
        &self,
        existing: Option<&str>,
        bot_id: Option<&str>,
    ) -> AppResult<ConversationSession> {
        if let Some(session) = existing.and_then(ConversationSession::from_reference) {
            debug!(session_id = %session.session_id, "Resuming conversation");
            return Ok(session);
        }
        if let Some(reference) = existing {
            warn!(reference = %reference, "Ignoring malformed conversation reference");
        }

        let session_id = self.api.create_conversation(bot_id).await?;
        info!(session_id = %session_id, bot_id = ?bot_id, "Conversation created");
        Ok(ConversationSession::fresh(session_id))
    }

    /// Best-effort remote deletion; failures are logged and swallowed
    pub async fn release(&self, session: &ConversationSession) {
        match self.api.remove_conversation(&session.session_id).await {
            Ok(()) => debug!(session_id = %session.session_id, "Conversation released"),
            Err(e) => warn!(
                session_id = %session.session_id,
                error = %e,
                "Failed to release conversation"
            ),
        }
    }

    /// Release on a detached task, independent of the response path
    ///
    /// May be called from a drop path, so a missing runtime is tolerated.
    pub fn release_in_background(&self, session: ConversationSession) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(session_id = %session.session_id, "No runtime to release conversation");
            return;
        };
        let manager = self.clone();
        runtime.spawn(async move {
            manager.release(&session).await;
        });
    }
}
