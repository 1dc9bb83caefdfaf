//! Chat engine
//!
//! Session life cycle, file uploads, prompt composition, upstream stream
//! decoding and the two output modes, tied together by the orchestrator.

pub mod aggregate;
pub mod compose;
pub mod decoder;
pub mod forward;
pub mod orchestrator;
pub mod response;
pub mod session;
pub mod types;
pub mod upload;

pub use decoder::{DecodedToken, SseDecoder};
pub use orchestrator::{CompletionOrchestrator, Stage};
pub use response::{ChatCompletionResponse, ImageData, ImageGenerationResponse, StreamChunk, Usage};
pub use session::{ConversationSession, SessionManager};
pub use types::{ChatCompletionRequest, Content, ContentPart, ImageGenerationRequest, Message, Role};
pub use upload::{FileHandle, FileUploader};
