//! Upstream SSE decoder
//!
//! Turns the raw chat event stream into semantic tokens. Each event body is
//! one of:
//! - `<continuation id><sid>`: end of the turn
//! - `[...]`: error text, passed through raw
//! - `<...>`: control tag, ignored
//! - anything else: a base64 content frame
//!
//! Content frames mentioning `multi_image_url` carry generated image links;
//! frames mentioning `allTool` are tool metadata and are dropped.

use std::pin::Pin;

use base64::{
    alphabet,
    engine::{general_purpose::GeneralPurpose, DecodePaddingMode, GeneralPurposeConfig},
    Engine,
};
use futures::{Stream, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::{
    error::{AppError, AppResult},
    spark::ByteStream,
    streaming::SseEventBuffer,
};

const END_TAG: &str = "<sid>";
const MULTI_IMAGE_MARKER: &str = "multi_image_url";
const TOOL_MARKER: &str = "allTool";

const FRAME_ENCODING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

static ERROR_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[.+\]$").unwrap());
static CONTROL_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<.+>$").unwrap());
static QUOTED_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r#""(https?://[^"\s]+)""#).unwrap());

/// Semantic unit of the upstream stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedToken {
    /// Plain text fragment
    Text(String),
    /// Generated image link
    ImageMarkdown(String),
    /// End of the turn with its continuation id; `None` when synthesized at close
    End(Option<String>),
    /// Raw bracketed error text
    ErrorText(String),
}

impl DecodedToken {
    /// Text contributed to the completion content
    pub fn content(&self) -> Option<String> {
        match self {
            DecodedToken::Text(text) | DecodedToken::ErrorText(text) => Some(text.clone()),
            DecodedToken::ImageMarkdown(url) => Some(image_markdown(url)),
            DecodedToken::End(_) => None,
        }
    }
}

/// Markdown rendering of a generated image
pub fn image_markdown(url: &str) -> String {
    format!("![image]({})", url)
}

/// Event body classes, dispatched before any decoding
#[derive(Debug, PartialEq)]
enum Frame<'a> {
    End(&'a str),
    ErrorText(&'a str),
    Control,
    Content(&'a str),
}

impl<'a> Frame<'a> {
    fn classify(body: &'a str) -> Self {
        if let Some(continuation) = body.strip_suffix(END_TAG) {
            Frame::End(continuation.trim())
        } else if ERROR_TEXT.is_match(body) {
            Frame::ErrorText(body)
        } else if CONTROL_TAG.is_match(body) {
            Frame::Control
        } else {
            Frame::Content(body)
        }
    }
}

/// Decode one complete event body into tokens
pub fn decode_event(body: &str) -> Vec<DecodedToken> {
    match Frame::classify(body) {
        Frame::End(continuation) => {
            let continuation = (!continuation.is_empty()).then(|| continuation.to_string());
            vec![DecodedToken::End(continuation)]
        }
        Frame::ErrorText(text) => vec![DecodedToken::ErrorText(text.to_string())],
        Frame::Control => Vec::new(),
        Frame::Content(encoded) => match decode_content(encoded) {
            Ok(text) => content_tokens(text),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable content frame");
                Vec::new()
            }
        },
    }
}

fn decode_content(encoded: &str) -> AppResult<String> {
    let bytes = FRAME_ENCODING
        .decode(encoded.trim())
        .map_err(|e| AppError::Decode(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn content_tokens(text: String) -> Vec<DecodedToken> {
    if text.contains(MULTI_IMAGE_MARKER) {
        return image_urls(&text)
            .into_iter()
            .map(DecodedToken::ImageMarkdown)
            .collect();
    }
    if text.contains(TOOL_MARKER) {
        debug!("Dropping tool metadata frame");
        return Vec::new();
    }
    if text.is_empty() {
        return Vec::new();
    }
    vec![DecodedToken::Text(text)]
}

/// Quoted absolute URLs in a content frame, in order of appearance
pub fn image_urls(text: &str) -> Vec<String> {
    QUOTED_URL
        .captures_iter(text)
        .map(|captures| captures[1].to_string())
        .collect()
}

/// Incremental decoder over raw upstream bytes
///
/// Emits exactly one `End` token: the upstream one, or a synthesized one
/// at close. Everything after `End` is ignored.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: SseEventBuffer,
    ended: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of raw bytes
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<DecodedToken> {
        let events = self.buffer.feed(bytes);
        self.decode_events(events)
    }

    /// Flush at stream close
    pub fn finish(&mut self) -> Vec<DecodedToken> {
        if self.buffer.has_incomplete() {
            debug!("Flushing an event without its blank-line terminator");
        }
        let trailing = self.buffer.finish().into_iter().collect();
        let mut tokens = self.decode_events(trailing);
        if !self.ended {
            debug!("Stream closed without an end marker");
            self.ended = true;
            tokens.push(DecodedToken::End(None));
        }
        tokens
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    fn decode_events(&mut self, events: Vec<String>) -> Vec<DecodedToken> {
        let mut tokens = Vec::new();
        for event in events {
            if self.ended {
                break;
            }
            for token in decode_event(&event) {
                if matches!(token, DecodedToken::End(_)) {
                    self.ended = true;
                    tokens.push(token);
                    break;
                }
                tokens.push(token);
            }
        }
        tokens
    }
}

/// Token stream produced from an upstream byte stream
pub type TokenStream = Pin<Box<dyn Stream<Item = AppResult<DecodedToken>> + Send>>;

/// Decode a live upstream byte stream
///
/// Transport errors are yielded once and end the stream. A clean close
/// always ends with an `End` token.
pub fn decode_stream(mut upstream: ByteStream) -> TokenStream {
    Box::pin(async_stream::stream! {
        let mut decoder = SseDecoder::new();

        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(bytes) => {
                    for token in decoder.feed(&bytes) {
                        yield Ok(token);
                    }
                    if decoder.is_ended() {
                        return;
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        for token in decoder.finish() {
            yield Ok(token);
        }
    })
}
