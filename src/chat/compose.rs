//! Request composer
//!
//! The upstream accepts one text field per chat call, so the whole message
//! history is collapsed into a single prompt.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::spark::{ChatEndpoint, ChatForm};

use super::{
    session::ConversationSession,
    types::{Content, ContentPart, Message},
    upload::FileHandle,
};

/// System line spliced before a last message that carries attachments
pub const ATTENTION_PROMPT: &str = "关注用户最新发送文件和消息";

static MARKDOWN_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[.+?\]\(.+?\)").unwrap());

/// Collapse the message history into one prompt
///
/// A resumed thread, or a history of fewer than two messages, is passed
/// through as bare text lines. A fresh multi-turn history is serialized as
/// `role:text` lines ending with an `assistant:` cue.
pub fn compose_text(messages: &[Message], resumed: bool) -> String {
    if resumed || messages.len() < 2 {
        let text = pass_through(messages);
        debug!(len = text.len(), "Passing messages through");
        text
    } else {
        let text = merge(messages);
        debug!(len = text.len(), "Merged message history");
        text
    }
}

fn pass_through(messages: &[Message]) -> String {
    let mut text = String::new();
    for message in messages {
        match &message.content {
            Content::Text(content) => {
                text.push_str(content);
                text.push('\n');
            }
            Content::Parts(parts) => {
                for part in parts {
                    if let ContentPart::Text { text: part_text } = part {
                        text.push_str(part_text);
                        text.push('\n');
                    }
                }
            }
        }
    }
    text
}

fn merge(messages: &[Message]) -> String {
    let attention = Message::system(ATTENTION_PROMPT);
    let mut ordered: Vec<&Message> = messages.iter().collect();
    if let Some(last) = messages.last() {
        if last.has_references() {
            ordered.insert(ordered.len() - 1, &attention);
        }
    }

    let mut text = String::new();
    for message in ordered {
        let role = message.role.as_str();
        match &message.content {
            Content::Text(content) => push_line(&mut text, role, content),
            Content::Parts(parts) => {
                for part in parts {
                    if let ContentPart::Text { text: part_text } = part {
                        push_line(&mut text, role, part_text);
                    }
                }
            }
        }
    }
    text.push_str("assistant:");

    MARKDOWN_IMAGE.replace_all(&text, "").into_owned()
}

fn push_line(text: &mut String, role: &str, content: &str) {
    text.push_str(role);
    text.push(':');
    text.push_str(content);
    text.push('\n');
}

/// Chat endpoint required by the upload outcome
///
/// Any session-attached document needs the long-context endpoint; image
/// links and plain text use the baseline endpoint.
pub fn select_endpoint(handles: &[FileHandle]) -> ChatEndpoint {
    if handles.contains(&FileHandle::SessionAttached) {
        ChatEndpoint::LongContext
    } else {
        ChatEndpoint::Baseline
    }
}

/// Comma-joined image links, if any
pub fn image_links(handles: &[FileHandle]) -> Option<String> {
    let links: Vec<&str> = handles.iter().filter_map(FileHandle::image_link).collect();
    (!links.is_empty()).then(|| links.join(","))
}

/// Build the chat call for one attempt
pub fn compose(
    session: &ConversationSession,
    messages: &[Message],
    handles: &[FileHandle],
    bot_id: Option<&str>,
) -> (ChatEndpoint, ChatForm) {
    let form = ChatForm {
        chat_id: session.session_id.clone(),
        text: compose_text(messages, session.is_resumed()),
        bot_id: bot_id.map(str::to_string),
        sid: session
            .continuation_id
            .clone()
            .filter(|_| session.is_resumed()),
        file_url: image_links(handles),
    };
    (select_endpoint(handles), form)
}
