//! Completion orchestrator
//!
//! Sequences one exchange with the upstream:
//!
//! ```text
//! Init -> SessionReady -> Uploading -> Composed -> Streaming -> Aggregating | Forwarding -> Done
//! ```
//!
//! The whole sequence is one unit of work under a bounded, fixed-delay retry.
//! Each attempt starts from `Init` with a fresh conversation; the session of a
//! failed attempt is abandoned unless that attempt was the last one.

use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, error, info, warn};

use crate::{
    config::{Config, RetryPolicy},
    error::{AppError, AppResult},
    routes::metrics::record_retry,
    spark::SparkApi,
};

use super::{
    aggregate::aggregate,
    compose::compose,
    decoder::{decode_stream, DecodedToken, TokenStream},
    forward::{forward, SseStream},
    response::ChatCompletionResponse,
    session::{bot_id, ConversationSession, SessionManager},
    types::{ChatCompletionRequest, Message},
    upload::FileUploader,
};

/// Cue prepended to image prompts that lack one
pub const DRAW_CUE: &str = "请画：";

/// Orchestrator states, logged as an exchange progresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    SessionReady,
    Uploading,
    Composed,
    Streaming,
    Aggregating,
    Forwarding,
    Done,
}

/// Drives complete exchanges against the upstream
pub struct CompletionOrchestrator {
    api: Arc<dyn SparkApi>,
    sessions: SessionManager,
    uploader: FileUploader,
    retry: RetryPolicy,
}

impl CompletionOrchestrator {
    pub fn new(api: Arc<dyn SparkApi>, retry: RetryPolicy, max_file_size: u64) -> Self {
        Self {
            sessions: SessionManager::new(api.clone()),
            uploader: FileUploader::new(api.clone(), max_file_size),
            api,
            retry,
        }
    }

    pub fn from_config(api: Arc<dyn SparkApi>, config: &Config) -> Self {
        Self::new(api, config.retry, config.max_file_size)
    }

    /// Blocking completion
    pub async fn complete(&self, request: &ChatCompletionRequest) -> AppResult<ChatCompletionResponse> {
        self.with_retry("completion", |attempt| self.attempt_completion(request, attempt))
            .await
    }

    /// Streaming completion
    ///
    /// Retries cover everything up to the opening of the upstream stream. Once
    /// forwarding has begun, failures end the stream cleanly instead.
    pub async fn complete_stream(&self, request: &ChatCompletionRequest) -> AppResult<SseStream> {
        let (session, tokens) = self
            .with_retry("completion_stream", |attempt| self.open(request, attempt))
            .await?;

        stage(Stage::Forwarding, &session);
        let sessions = self.sessions.clone();
        let release = (!session.is_resumed()).then(|| session.clone());
        let on_complete = move || {
            if let Some(session) = release {
                sessions.release_in_background(session);
            }
        };

        Ok(forward(session, request.model.clone(), tokens, on_complete))
    }

    /// Generate images for a prompt; returns distinct image links
    pub async fn generate_images(&self, model: &str, prompt: &str) -> AppResult<Vec<String>> {
        self.with_retry("image_generation", |attempt| {
            self.attempt_images(model, prompt, attempt)
        })
        .await
    }

    async fn attempt_completion(
        &self,
        request: &ChatCompletionRequest,
        attempt: u32,
    ) -> AppResult<ChatCompletionResponse> {
        let (session, tokens) = self.open(request, attempt).await?;

        stage(Stage::Aggregating, &session);
        let result = aggregate(session.clone(), &request.model, tokens).await;
        let terminal = result.is_ok() || self.is_last(attempt);
        if terminal && !session.is_resumed() {
            self.sessions.release_in_background(session.clone());
        }

        stage(Stage::Done, &session);
        result
    }

    /// Init through Streaming: resolve the session, upload, compose, open the chat stream
    async fn open(
        &self,
        request: &ChatCompletionRequest,
        attempt: u32,
    ) -> AppResult<(ConversationSession, TokenStream)> {
        debug!(stage = ?Stage::Init, attempt, model = %request.model, "Completion stage");
        let bot = bot_id(&request.model);
        let session = self
            .sessions
            .acquire(request.conversation_id.as_deref(), bot)
            .await?;
        stage(Stage::SessionReady, &session);

        match self.open_in_session(&session, &request.messages, bot).await {
            Ok(tokens) => Ok((session, tokens)),
            Err(e) => {
                if self.is_last(attempt) && !session.is_resumed() {
                    self.sessions.release_in_background(session);
                }
                Err(e)
            }
        }
    }

    async fn open_in_session(
        &self,
        session: &ConversationSession,
        messages: &[Message],
        bot: Option<&str>,
    ) -> AppResult<TokenStream> {
        // Only the last message is scanned for attachments.
        let urls = messages
            .last()
            .map(Message::reference_urls)
            .unwrap_or_default();
        stage(Stage::Uploading, session);
        let handles = self.uploader.upload_all(session, &urls).await?;

        let (endpoint, form) = compose(session, messages, &handles, bot);
        debug!(
            stage = ?Stage::Composed,
            session_id = %session.session_id,
            endpoint = ?endpoint,
            images = form.file_url.is_some(),
            "Completion stage"
        );

        let upstream = self.api.open_chat(endpoint, &form).await?;
        stage(Stage::Streaming, session);
        Ok(decode_stream(upstream))
    }

    async fn attempt_images(&self, model: &str, prompt: &str, attempt: u32) -> AppResult<Vec<String>> {
        let bot = bot_id(model);
        let session = self.sessions.acquire(None, bot).await?;
        stage(Stage::SessionReady, &session);

        let result = self.collect_images(&session, prompt, bot).await;
        if result.is_ok() || self.is_last(attempt) {
            self.sessions.release_in_background(session.clone());
        }

        let urls = result?;
        if urls.is_empty() {
            warn!(session_id = %session.session_id, "No images were generated");
            return Err(AppError::ImageGenerationFailed);
        }
        info!(count = urls.len(), "Images generated");
        Ok(urls)
    }

    async fn collect_images(
        &self,
        session: &ConversationSession,
        prompt: &str,
        bot: Option<&str>,
    ) -> AppResult<Vec<String>> {
        let prompt = if prompt.contains('画') {
            prompt.to_string()
        } else {
            format!("{}{}", DRAW_CUE, prompt)
        };
        let messages = [Message::user(prompt)];
        let (endpoint, form) = compose(session, &messages, &[], bot);

        let mut tokens = decode_stream(self.api.open_chat(endpoint, &form).await?);
        stage(Stage::Streaming, session);

        let mut urls: Vec<String> = Vec::new();
        while let Some(token) = tokens.next().await {
            if let DecodedToken::ImageMarkdown(url) = token? {
                if !urls.contains(&url) {
                    urls.push(url);
                }
            }
        }
        Ok(urls)
    }

    fn is_last(&self, attempt: u32) -> bool {
        attempt >= self.retry.max_retries
    }

    /// Run `operation` until it succeeds or the retry budget is spent
    ///
    /// Waits the fixed delay between attempts and surfaces the last failure.
    async fn with_retry<T, F, Fut>(&self, operation: &str, mut run: F) -> AppResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match run(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.retry.max_retries => {
                    error!(operation, attempt, error = %e, "Upstream exchange failed");
                    warn!(
                        operation,
                        delay_ms = self.retry.delay.as_millis() as u64,
                        "Retrying exchange"
                    );
                    record_retry(operation);
                    tokio::time::sleep(self.retry.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(operation, attempt, error = %e, "Upstream exchange failed; giving up");
                    return Err(e);
                }
            }
        }
    }
}

fn stage(stage: Stage, session: &ConversationSession) {
    debug!(stage = ?stage, session_id = %session.session_id, "Completion stage");
}
