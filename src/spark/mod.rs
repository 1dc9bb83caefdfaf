//! Spark web service integration
//!
//! Transport abstraction, the reqwest-backed client, credential formatting and
//! the upstream result envelope.

pub mod api;
pub mod client;
pub mod credential;
pub mod envelope;
pub mod models;

pub use api::{ByteStream, SparkApi};
pub use client::SparkClient;
pub use credential::SparkCredential;
pub use envelope::Envelope;
pub use models::{ChatEndpoint, ChatForm, FileProbe, SaveFileRequest, UploadGrant};
